use crate::{
    model::{EntityType, ModelRegistry},
    query::QueryOptionError,
};
use derive_more::{Deref, Display};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

///
/// FilterToken
/// `$filter` expression, carried verbatim for the persistence layer.
///

#[derive(Clone, Debug, Deref, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FilterToken(String);

impl FilterToken {
    pub fn new(expression: impl Into<String>) -> Self {
        Self(expression.into())
    }
}

///
/// OrderByToken
/// `$orderby` clause, carried verbatim for the persistence layer.
///

#[derive(Clone, Debug, Deref, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct OrderByToken(String);

impl OrderByToken {
    pub fn new(clause: impl Into<String>) -> Self {
        Self(clause.into())
    }
}

///
/// QueryOptions
///
/// Structured `$select`/`$expand` tree plus the pass-through options.
/// An empty select means "all fields". Values are never mutated in place;
/// every builder call yields a new value.
///

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct QueryOptions {
    select: BTreeSet<String>,
    expand: BTreeMap<String, Self>,
    filter: Option<FilterToken>,
    order_by: Option<OrderByToken>,
    top: Option<u64>,
    skip: Option<u64>,
    count: Option<bool>,
}

impl QueryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that only restrict the selected fields.
    pub fn select_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new().with_select(fields)
    }

    #[must_use]
    pub fn with_select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(fields.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_expand(mut self, relation: impl Into<String>, nested: Self) -> Self {
        self.expand.insert(relation.into(), nested);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: FilterToken) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_order_by(mut self, order_by: OrderByToken) -> Self {
        self.order_by = Some(order_by);
        self
    }

    #[must_use]
    pub const fn with_top(mut self, top: u64) -> Self {
        self.top = Some(top);
        self
    }

    #[must_use]
    pub const fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    #[must_use]
    pub const fn with_count(mut self, count: bool) -> Self {
        self.count = Some(count);
        self
    }

    //
    // Accessors
    //

    #[must_use]
    pub const fn select(&self) -> &BTreeSet<String> {
        &self.select
    }

    #[must_use]
    pub const fn expand(&self) -> &BTreeMap<String, Self> {
        &self.expand
    }

    #[must_use]
    pub const fn filter(&self) -> Option<&FilterToken> {
        self.filter.as_ref()
    }

    #[must_use]
    pub const fn order_by(&self) -> Option<&OrderByToken> {
        self.order_by.as_ref()
    }

    #[must_use]
    pub const fn top(&self) -> Option<u64> {
        self.top
    }

    #[must_use]
    pub const fn skip(&self) -> Option<u64> {
        self.skip
    }

    #[must_use]
    pub const fn count(&self) -> Option<bool> {
        self.count
    }

    //
    // Semantics
    //

    /// True when `name` survives `$select` (always, when select is empty).
    #[must_use]
    pub fn selects(&self, name: &str) -> bool {
        self.select.is_empty() || self.select.contains(name)
    }

    /// Nested options for a relation that is both selected and expanded.
    #[must_use]
    pub fn expansion(&self, relation: &str) -> Option<&Self> {
        if !self.selects(relation) {
            return None;
        }

        self.expand.get(relation)
    }

    /// Deepest `$expand` nesting level; zero when nothing is expanded.
    #[must_use]
    pub fn expand_depth(&self) -> usize {
        self.expand
            .values()
            .map(|nested| nested.expand_depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Copy holding only the `$select` restriction.
    #[must_use]
    pub fn select_only(&self) -> Self {
        Self::select_fields(self.select.iter().cloned())
    }

    /// Union of two option trees for the same entity set. An unrestricted
    /// select on either side wins; scalar options prefer `self`.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let select = if self.select.is_empty() || other.select.is_empty() {
            BTreeSet::new()
        } else {
            self.select.union(&other.select).cloned().collect()
        };

        let mut expand = self.expand.clone();
        for (relation, nested) in &other.expand {
            let merged = match expand.get(relation) {
                Some(existing) => existing.merged(nested),
                None => nested.clone(),
            };
            expand.insert(relation.clone(), merged);
        }

        Self {
            select,
            expand,
            filter: self.filter.clone().or_else(|| other.filter.clone()),
            order_by: self.order_by.clone().or_else(|| other.order_by.clone()),
            top: self.top.or(other.top),
            skip: self.skip.or(other.skip),
            count: self.count.or(other.count),
        }
    }

    /// Check select and expand names against the model, recursively.
    pub fn validate(
        &self,
        entity_type: EntityType,
        registry: &ModelRegistry,
    ) -> Result<(), QueryOptionError> {
        for name in &self.select {
            if !registry.is_addressable(entity_type, name) {
                return Err(QueryOptionError::UnknownSelect {
                    entity: entity_type.entity_name,
                    name: name.clone(),
                });
            }
        }

        for (relation, nested) in &self.expand {
            let Some(nav) = registry.navigation(entity_type, relation) else {
                return Err(QueryOptionError::UnknownExpand {
                    entity: entity_type.entity_name,
                    name: relation.clone(),
                });
            };
            nested.validate(nav.target, registry)?;
        }

        Ok(())
    }
}

impl QueryOptions {
    // Options nested inside an `$expand` item are separated by `;`.
    fn write_list(&self, f: &mut fmt::Formatter<'_>, separator: char) -> fmt::Result {
        let mut first = true;
        let mut item = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            if !first {
                write!(f, "{separator}")?;
            }
            first = false;
            Ok(())
        };

        if !self.select.is_empty() {
            item(f)?;
            let select = self.select.iter().map(String::as_str).collect::<Vec<_>>();
            write!(f, "$select={}", select.join(","))?;
        }
        if !self.expand.is_empty() {
            item(f)?;
            f.write_str("$expand=")?;
            for (i, (relation, nested)) in self.expand.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                f.write_str(relation)?;
                if *nested != Self::default() {
                    f.write_str("(")?;
                    nested.write_list(f, ';')?;
                    f.write_str(")")?;
                }
            }
        }
        if let Some(filter) = &self.filter {
            item(f)?;
            write!(f, "$filter={filter}")?;
        }
        if let Some(order_by) = &self.order_by {
            item(f)?;
            write!(f, "$orderby={order_by}")?;
        }
        if let Some(top) = self.top {
            item(f)?;
            write!(f, "$top={top}")?;
        }
        if let Some(skip) = self.skip {
            item(f)?;
            write!(f, "$skip={skip}")?;
        }
        if let Some(count) = self.count {
            item(f)?;
            write!(f, "$count={count}")?;
        }

        Ok(())
    }
}

/// Renders a percent-decoded query string, without the leading `?`.
impl fmt::Display for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_list(f, '&')
    }
}
