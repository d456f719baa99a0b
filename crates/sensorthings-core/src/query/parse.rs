use crate::{
    error::{Error, ErrorKind, ErrorOrigin},
    query::{FilterToken, OrderByToken, QueryOptions},
};
use sensorthings_config::DEFAULT_MAX_EXPAND_DEPTH;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error as ThisError;

///
/// QueryOptionError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QueryOptionError {
    #[error("invalid value for {option}: {message}")]
    InvalidValue { option: String, message: String },

    #[error("query option {option} given more than once")]
    Duplicate { option: String },

    #[error("$expand nesting depth {depth} exceeds the maximum of {max}")]
    ExpandTooDeep { depth: usize, max: usize },

    #[error("'{name}' in $select is not a property of {entity}")]
    UnknownSelect { entity: &'static str, name: String },

    #[error("'{name}' in $expand is not a navigation property of {entity}")]
    UnknownExpand { entity: &'static str, name: String },
}

impl QueryOptionError {
    fn invalid(option: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            option: option.to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidQueryOption
    }
}

impl From<QueryOptionError> for Error {
    fn from(err: QueryOptionError) -> Self {
        Self::new(err.kind(), ErrorOrigin::Query, err.to_string())
    }
}

/// Parse a query string with the default `$expand` depth limit.
pub fn parse_query_options(raw: &str) -> Result<QueryOptions, QueryOptionError> {
    QueryOptionsParser::default().parse(raw)
}

///
/// QueryOptionsParser
///
/// Parses percent-decoded query strings. Top-level options are separated by
/// `&`, options nested inside an `$expand` item by `;`. Unknown option keys
/// are ignored.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct QueryOptionsParser {
    max_expand_depth: usize,
}

impl QueryOptionsParser {
    #[must_use]
    pub const fn new(max_expand_depth: usize) -> Self {
        Self { max_expand_depth }
    }

    #[must_use]
    pub const fn max_expand_depth(&self) -> usize {
        self.max_expand_depth
    }

    pub fn parse(&self, raw: &str) -> Result<QueryOptions, QueryOptionError> {
        let raw = raw.strip_prefix('?').unwrap_or(raw);

        self.parse_list(raw, b'&', 0)
    }

    fn parse_list(
        &self,
        raw: &str,
        separator: u8,
        level: usize,
    ) -> Result<QueryOptions, QueryOptionError> {
        let mut seen = BTreeSet::new();
        let mut options = QueryOptions::new();

        for item in split_top_level(raw, separator)? {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }

            let (key, value) = item.split_once('=').unwrap_or((item, ""));
            let key = key.trim();
            if !KNOWN_OPTIONS.contains(&key) {
                continue;
            }
            if !seen.insert(key) {
                return Err(QueryOptionError::Duplicate {
                    option: key.to_string(),
                });
            }

            let value = value.trim();
            options = match key {
                "$select" => options.with_select(parse_select(value)?),
                "$expand" => self.parse_expand(options, value, level)?,
                "$filter" => options.with_filter(FilterToken::new(non_empty(key, value)?)),
                "$orderby" => options.with_order_by(OrderByToken::new(non_empty(key, value)?)),
                "$top" => options.with_top(parse_integer(key, value)?),
                "$skip" => options.with_skip(parse_integer(key, value)?),
                "$count" => options.with_count(parse_bool(key, value)?),
                _ => options,
            };
        }

        Ok(options)
    }

    // Items look like `Rel`, `Rel(opts)` or `Rel/Inner(opts)`; a slash path
    // nests one expansion per hop and the options apply to the last hop.
    fn parse_expand(
        &self,
        mut options: QueryOptions,
        value: &str,
        level: usize,
    ) -> Result<QueryOptions, QueryOptionError> {
        let value = non_empty("$expand", value)?;
        let mut expand = BTreeMap::<String, QueryOptions>::new();

        for item in split_top_level(value, b',')? {
            let item = item.trim();
            let (path, nested) = match item.find('(') {
                Some(open) => {
                    let Some(inner) = item[open + 1..].strip_suffix(')') else {
                        return Err(QueryOptionError::invalid(
                            "$expand",
                            format!("unbalanced parentheses in '{item}'"),
                        ));
                    };
                    (&item[..open], Some(inner))
                }
                None => (item, None),
            };

            let hops = path.split('/').map(str::trim).collect::<Vec<_>>();
            for hop in &hops {
                if !is_name(hop) {
                    return Err(QueryOptionError::invalid(
                        "$expand",
                        format!("'{hop}' is not a navigation property name"),
                    ));
                }
            }

            let depth = level + hops.len();
            if depth > self.max_expand_depth {
                return Err(QueryOptionError::ExpandTooDeep {
                    depth,
                    max: self.max_expand_depth,
                });
            }

            let mut current = match nested {
                Some(inner) => self.parse_list(inner, b';', depth)?,
                None => QueryOptions::new(),
            };
            let Some((first, rest)) = hops.split_first() else {
                continue;
            };
            for hop in rest.iter().rev() {
                current = QueryOptions::new().with_expand(*hop, current);
            }

            let merged = match expand.get(*first) {
                Some(existing) => existing.merged(&current),
                None => current,
            };
            expand.insert((*first).to_string(), merged);
        }

        for (relation, nested) in expand {
            options = options.with_expand(relation, nested);
        }

        Ok(options)
    }
}

impl Default for QueryOptionsParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXPAND_DEPTH)
    }
}

const KNOWN_OPTIONS: [&str; 7] = [
    "$select", "$expand", "$filter", "$orderby", "$top", "$skip", "$count",
];

fn is_name(text: &str) -> bool {
    let mut bytes = text.bytes();

    bytes
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn non_empty<'a>(option: &str, value: &'a str) -> Result<&'a str, QueryOptionError> {
    if value.is_empty() {
        return Err(QueryOptionError::invalid(option, "value must not be empty"));
    }

    Ok(value)
}

fn parse_select(value: &str) -> Result<Vec<String>, QueryOptionError> {
    non_empty("$select", value)?
        .split(',')
        .map(str::trim)
        .map(|name| {
            if is_name(name) {
                Ok(name.to_string())
            } else {
                Err(QueryOptionError::invalid(
                    "$select",
                    format!("'{name}' is not a property name"),
                ))
            }
        })
        .collect()
}

fn parse_integer(option: &str, value: &str) -> Result<u64, QueryOptionError> {
    value.parse::<u64>().map_err(|_| {
        QueryOptionError::invalid(option, format!("'{value}' is not a non-negative integer"))
    })
}

fn parse_bool(option: &str, value: &str) -> Result<bool, QueryOptionError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(QueryOptionError::invalid(
            option,
            format!("'{value}' is not 'true' or 'false'"),
        )),
    }
}

// Split on `separator` outside parentheses and single-quoted literals.
fn split_top_level(raw: &str, separator: u8) -> Result<Vec<&str>, QueryOptionError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;

    for (i, byte) in raw.bytes().enumerate() {
        match byte {
            b'\'' => quoted = !quoted,
            b'(' if !quoted => depth += 1,
            b')' if !quoted => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    QueryOptionError::invalid("query", format!("unbalanced ')' at offset {i}"))
                })?;
            }
            b if b == separator && !quoted && depth == 0 => {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 || quoted {
        return Err(QueryOptionError::invalid(
            "query",
            "unbalanced parentheses or quotes",
        ));
    }
    parts.push(&raw[start..]);

    Ok(parts)
}
