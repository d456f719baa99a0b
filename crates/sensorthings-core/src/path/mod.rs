//! Resource-path grammar.
//!
//! A path such as `Things(1)/Datastreams(2)/Observations` is tokenized, split
//! into hops, and resolved right to left: each hop is checked against the
//! resolved chain of its parent, so segments come out ordered root to leaf.
//! The same grammar serves HTTP paths and MQTT topics.

mod grammar;
mod lexer;
mod resource;

#[cfg(test)]
mod tests;

pub use grammar::{PathError, PathGrammar};
pub use resource::{PathSegment, PathType, ResourcePath};
