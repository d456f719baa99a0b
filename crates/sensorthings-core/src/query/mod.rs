//! Query options (`$select`, `$expand`, and the opaque pass-through options)
//! and the projector that applies them to an entity graph.
//!
//! The projector is transport-neutral: HTTP responses and MQTT payloads are
//! both built from a [`ProjectedView`], only the serialization sink differs.

mod options;
mod parse;
mod project;


pub use options::{FilterToken, OrderByToken, QueryOptions};
pub use parse::{QueryOptionError, QueryOptionsParser, parse_query_options};
pub use project::{Expanded, NavigationLink, ProjectedView, Projector};
