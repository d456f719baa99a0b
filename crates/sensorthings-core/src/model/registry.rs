use crate::{
    error::{Error, ErrorKind, ErrorOrigin},
    model::{EntityType, Profile, RelationModel, profile},
};
use sensorthings_config::ExtensionConfig;
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// ModelError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ModelError {
    #[error("unknown entity type '{name}'")]
    UnknownEntityType { name: String },
}

impl From<ModelError> for Error {
    fn from(err: ModelError) -> Self {
        Self::new(ErrorKind::UnknownEntityType, ErrorOrigin::Model, err.to_string())
    }
}

///
/// Navigation
/// A relation resolved against the registry, with its registered target.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Navigation {
    pub relation: &'static RelationModel,
    pub target: EntityType,
}

///
/// ModelRegistry
///
/// Capability records of the enabled profiles. Cheap to clone.
///

#[derive(Clone, Debug)]
pub struct ModelRegistry {
    profiles: Arc<[Profile]>,
    models: Arc<[EntityType]>,
}

impl ModelRegistry {
    /// Registry holding the core SensorThings kinds only.
    #[must_use]
    pub fn core() -> Self {
        Self::for_profiles(&[Profile::Core])
    }

    /// Registry holding the core kinds and the STAplus extension.
    #[must_use]
    pub fn with_plus() -> Self {
        Self::for_profiles(&[Profile::Core, Profile::Plus])
    }

    #[must_use]
    pub fn from_config(config: &ExtensionConfig) -> Self {
        if config.plus {
            Self::with_plus()
        } else {
            Self::core()
        }
    }

    /// Build a registry from a profile list; `Core` is always included.
    #[must_use]
    pub fn for_profiles(profiles: &[Profile]) -> Self {
        let mut enabled = vec![Profile::Core];
        enabled.extend(profiles.iter().copied());
        enabled.sort_unstable();
        enabled.dedup();

        let models = enabled
            .iter()
            .flat_map(|profile| profile::models(*profile).iter().copied())
            .collect::<Vec<_>>();

        Self {
            profiles: enabled.into(),
            models: models.into(),
        }
    }

    #[must_use]
    pub fn has_profile(&self, profile: Profile) -> bool {
        self.profiles.contains(&profile)
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.models.iter().copied()
    }

    /// Look up a kind by its collection keyword (`Things`).
    #[must_use]
    pub fn by_collection(&self, keyword: &str) -> Option<EntityType> {
        self.iter().find(|model| model.collection == keyword)
    }

    /// Look up a kind by its singular entity name (`Thing`).
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<EntityType> {
        self.iter().find(|model| model.entity_name == name)
    }

    pub fn resolve_collection(&self, keyword: &str) -> Result<EntityType, ModelError> {
        self.by_collection(keyword)
            .ok_or_else(|| ModelError::UnknownEntityType {
                name: keyword.to_string(),
            })
    }

    pub fn resolve_name(&self, name: &str) -> Result<EntityType, ModelError> {
        self.by_name(name).ok_or_else(|| ModelError::UnknownEntityType {
            name: name.to_string(),
        })
    }

    /// Resolve a navigation property; relations into unregistered kinds are
    /// treated as absent.
    #[must_use]
    pub fn navigation(&self, source: EntityType, name: &str) -> Option<Navigation> {
        let relation = source.relation(name)?;
        let target = self.by_name(relation.target)?;

        Some(Navigation { relation, target })
    }

    /// All navigation properties of `source` whose targets are registered.
    pub fn navigations(&self, source: EntityType) -> impl Iterator<Item = Navigation> + '_ {
        source.relations.iter().filter_map(move |relation| {
            self.by_name(relation.target)
                .map(|target| Navigation { relation, target })
        })
    }

    /// True when `name` is a property or a registered navigation property.
    #[must_use]
    pub fn is_addressable(&self, source: EntityType, name: &str) -> bool {
        source.has_field(name) || self.navigation(source, name).is_some()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::core()
    }
}
