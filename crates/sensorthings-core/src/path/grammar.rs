use crate::{
    entity::EntityId,
    error::{Error, ErrorKind, ErrorOrigin},
    model::{Cardinality, ModelRegistry},
    path::{
        PathSegment, PathType, ResourcePath,
        lexer::{Token, TokenKind, tokenize},
    },
    query::QueryOptionsParser,
};
use thiserror::Error as ThisError;

///
/// PathError
///
/// `Syntax` means the text matches no production; `Semantics` means it does,
/// but names a hop the model does not allow.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PathError {
    #[error("invalid path syntax in '{path}' at offset {offset}: {message}")]
    Syntax {
        path: String,
        offset: usize,
        message: String,
    },

    #[error("invalid path '{path}' at segment '{segment}': {message}")]
    Semantics {
        path: String,
        segment: String,
        message: String,
    },

    #[error("unknown entity type '{name}' in path '{path}'")]
    UnknownEntityType { path: String, name: String },
}

impl PathError {
    pub(crate) fn syntax(path: &str, offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            path: path.to_string(),
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn semantics(path: &str, segment: &str, message: impl Into<String>) -> Self {
        Self::Semantics {
            path: path.to_string(),
            segment: segment.to_string(),
            message: message.into(),
        }
    }

    fn unknown_type(path: &str, name: &str) -> Self {
        Self::UnknownEntityType {
            path: path.to_string(),
            name: name.to_string(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::InvalidPathSyntax,
            Self::Semantics { .. } => ErrorKind::InvalidPathSemantics,
            Self::UnknownEntityType { .. } => ErrorKind::UnknownEntityType,
        }
    }
}

impl From<PathError> for Error {
    fn from(err: PathError) -> Self {
        Self::new(err.kind(), ErrorOrigin::Path, err.to_string())
    }
}

///
/// Hop
/// One slash-separated unit of a tokenized path.
///

#[derive(Clone, Copy, Debug)]
enum Hop<'a> {
    Named {
        name: &'a str,
        key: Option<&'a str>,
        offset: usize,
    },
    Value {
        offset: usize,
    },
    Ref {
        offset: usize,
    },
}

///
/// Chain
/// Partially resolved path, extended one hop at a time.
///

struct Chain {
    segments: Vec<PathSegment>,
    path_type: PathType,
    collection: bool,
}

impl Chain {
    fn into_path(self) -> ResourcePath {
        ResourcePath::new(self.segments, self.path_type, self.collection)
    }
}

///
/// PathGrammar
///

#[derive(Clone, Copy, Debug)]
pub struct PathGrammar<'a> {
    registry: &'a ModelRegistry,
}

impl<'a> PathGrammar<'a> {
    #[must_use]
    pub const fn new(registry: &'a ModelRegistry) -> Self {
        Self { registry }
    }

    /// Parse a resource path. A single leading `/` is ignored; ids must
    /// already be percent-decoded. A collection path may end in
    /// `$select=f1,f2`.
    pub fn parse(&self, path: &str) -> Result<ResourcePath, PathError> {
        let (text, suffix) = Self::split_query(path);
        let tokens = tokenize(text)?;
        let hops = group(text, &tokens)?;
        let resolved = self.resolve(text, &hops)?.into_path();

        match suffix {
            Some(suffix) => self.attach_select(path, text.len(), suffix, resolved),
            None => Ok(resolved),
        }
    }

    /// Split a topic into its path and trailing query text. Both `?$select=..`
    /// and the inline `$select=..` form are recognized; key contents are skipped.
    #[must_use]
    pub fn split_query(raw: &str) -> (&str, Option<&str>) {
        let bytes = raw.as_bytes();
        let mut in_key = false;

        for (i, byte) in bytes.iter().enumerate() {
            match byte {
                b'(' => in_key = true,
                b')' => in_key = false,
                b'?' if !in_key => return (&raw[..i], Some(&raw[i + 1..])),
                b'$' if !in_key && raw[i..].starts_with("$select=") => {
                    return (&raw[..i], Some(&raw[i..]));
                }
                _ => {}
            }
        }

        (raw, None)
    }

    fn attach_select(
        &self,
        path: &str,
        offset: usize,
        suffix: &str,
        resolved: ResourcePath,
    ) -> Result<ResourcePath, PathError> {
        if resolved.path_type() != PathType::Collection {
            return Err(PathError::syntax(
                path,
                offset,
                "$select may only follow a collection",
            ));
        }
        if path[offset..].starts_with('?') {
            return Err(PathError::syntax(
                path,
                offset,
                "query options are not part of the path",
            ));
        }
        let is_select_only = suffix
            .strip_prefix("$select=")
            .is_some_and(|fields| !fields.contains('&'));
        if !is_select_only {
            return Err(PathError::syntax(
                path,
                offset,
                "only $select may follow a collection",
            ));
        }

        let select = QueryOptionsParser::new(0)
            .parse(suffix)
            .map_err(|err| PathError::syntax(path, offset, err.to_string()))?;
        select
            .validate(resolved.entity_type(), self.registry)
            .map_err(|err| PathError::semantics(path, "$select", err.to_string()))?;

        Ok(resolved.with_select(select))
    }

    // Right-recursive: resolve everything before the last hop, then apply it.
    fn resolve(&self, path: &str, hops: &[Hop<'_>]) -> Result<Chain, PathError> {
        let Some((last, parents)) = hops.split_last() else {
            return Err(PathError::syntax(path, 0, "empty path"));
        };

        if parents.is_empty() {
            return self.root(path, *last);
        }

        let parent = self.resolve(path, parents)?;
        self.step(path, parent, *last)
    }

    fn root(&self, path: &str, hop: Hop<'_>) -> Result<Chain, PathError> {
        let Hop::Named { name, key, offset } = hop else {
            return Err(PathError::syntax(
                path,
                hop_offset(hop),
                "path must start with an entity set",
            ));
        };

        let Some(entity_type) = self.registry.by_collection(name) else {
            if let Some(model) = self.registry.by_name(name) {
                return Err(PathError::syntax(
                    path,
                    offset,
                    format!(
                        "'{name}' is only valid after a navigation hop, use '{}'",
                        model.collection
                    ),
                ));
            }

            return Err(PathError::unknown_type(path, name));
        };

        let id = key.map(|key| decode_key(path, offset, key)).transpose()?;
        let path_type = if id.is_some() {
            PathType::Entity
        } else {
            PathType::Collection
        };

        Ok(Chain {
            collection: id.is_none(),
            segments: vec![PathSegment::new(name, entity_type, id)],
            path_type,
        })
    }

    fn step(&self, path: &str, mut chain: Chain, hop: Hop<'_>) -> Result<Chain, PathError> {
        if matches!(chain.path_type, PathType::Value | PathType::Reference) {
            return Err(PathError::syntax(
                path,
                hop_offset(hop),
                "nothing may follow $value or $ref",
            ));
        }

        let (name, key, offset) = match hop {
            Hop::Value { offset } => {
                if chain.path_type != PathType::Property {
                    return Err(PathError::syntax(path, offset, "$value must follow a property"));
                }
                chain.path_type = PathType::Value;
                return Ok(chain);
            }
            Hop::Ref { offset } => {
                if chain.path_type == PathType::Property {
                    return Err(PathError::syntax(
                        path,
                        offset,
                        "$ref must follow an entity or a collection",
                    ));
                }
                chain.path_type = PathType::Reference;
                return Ok(chain);
            }
            Hop::Named { name, key, offset } => (name, key, offset),
        };

        match chain.path_type {
            PathType::Property => {
                return Err(PathError::syntax(
                    path,
                    offset,
                    "a property may only be followed by $value",
                ));
            }
            PathType::Collection => {
                let leaf = chain.segments.last().map_or("", |s| s.entity_set());
                return Err(PathError::syntax(
                    path,
                    offset,
                    format!("'{leaf}' must carry an id before navigating to '{name}'"),
                ));
            }
            _ => {}
        }

        let Some(leaf) = chain.segments.pop() else {
            return Err(PathError::syntax(path, offset, "empty path"));
        };
        let source = leaf.entity_type();

        if let Some(nav) = self.registry.navigation(source, name) {
            if leaf.id().is_none() {
                return Err(PathError::semantics(
                    path,
                    name,
                    format!(
                        "cannot navigate through '{}' without an id",
                        leaf.entity_set()
                    ),
                ));
            }

            let id = key.map(|key| decode_key(path, offset, key)).transpose()?;
            let (path_type, collection) = match (nav.relation.cardinality, &id) {
                (Cardinality::Many, None) => (PathType::Collection, true),
                (Cardinality::Many, Some(_)) | (Cardinality::One, None) => {
                    (PathType::Entity, false)
                }
                (Cardinality::One, Some(_)) => {
                    return Err(PathError::semantics(
                        path,
                        name,
                        format!("to-one navigation property '{name}' takes no id"),
                    ));
                }
            };

            chain.segments.push(leaf);
            chain
                .segments
                .push(PathSegment::new(name, nav.target, id));
            chain.path_type = path_type;
            chain.collection = collection;

            return Ok(chain);
        }

        if source.has_field(name) {
            if key.is_some() {
                return Err(PathError::syntax(
                    path,
                    offset,
                    format!("property '{name}' cannot take an id key"),
                ));
            }

            chain.segments.push(leaf.with_property(name));
            chain.path_type = PathType::Property;

            return Ok(chain);
        }

        if let Some(relation) = source.relation(name) {
            return Err(PathError::unknown_type(path, relation.target));
        }

        Err(PathError::semantics(
            path,
            name,
            format!("'{name}' is neither a property nor a navigation property of {source}"),
        ))
    }
}

const fn hop_offset(hop: Hop<'_>) -> usize {
    match hop {
        Hop::Named { offset, .. } | Hop::Value { offset } | Hop::Ref { offset } => offset,
    }
}

fn decode_key(path: &str, offset: usize, key: &str) -> Result<EntityId, PathError> {
    EntityId::from_key(key)
        .ok_or_else(|| PathError::syntax(path, offset, format!("malformed id key '({key})'")))
}

// Group tokens into hops: `Ident [Key]` or `$option`, separated by single slashes.
fn group<'a>(path: &str, tokens: &[Token<'a>]) -> Result<Vec<Hop<'a>>, PathError> {
    let mut hops = Vec::new();
    let mut iter = tokens.iter().peekable();

    if let Some(Token {
        kind: TokenKind::Slash,
        ..
    }) = iter.peek()
    {
        iter.next();
    }

    loop {
        let Some(token) = iter.next() else {
            return Err(PathError::syntax(path, path.len(), "expected a segment"));
        };

        let hop = match token.kind {
            TokenKind::Ident(name) => {
                let key = match iter.peek() {
                    Some(Token {
                        kind: TokenKind::Key(key),
                        ..
                    }) => {
                        let key = *key;
                        iter.next();
                        Some(key)
                    }
                    _ => None,
                };

                Hop::Named {
                    name,
                    key,
                    offset: token.offset,
                }
            }
            TokenKind::Option("$value") => Hop::Value {
                offset: token.offset,
            },
            TokenKind::Option("$ref") => Hop::Ref {
                offset: token.offset,
            },
            TokenKind::Option(option) => {
                return Err(PathError::syntax(
                    path,
                    token.offset,
                    format!("unsupported path option '{option}'"),
                ));
            }
            TokenKind::Key(_) => {
                return Err(PathError::syntax(
                    path,
                    token.offset,
                    "id key must follow an entity set name",
                ));
            }
            TokenKind::Slash => {
                return Err(PathError::syntax(path, token.offset, "empty segment"));
            }
        };
        hops.push(hop);

        match iter.next() {
            None => return Ok(hops),
            Some(Token {
                kind: TokenKind::Slash,
                ..
            }) => {}
            Some(token) => {
                return Err(PathError::syntax(path, token.offset, "expected '/'"));
            }
        }
    }
}
