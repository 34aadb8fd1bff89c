//! Core domain types for Callboard.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer of the
//! application: property paths into the state graph, the parsed-document
//! model produced by the external tokenizer, and the derived facts snapshot.

mod document;
mod facts;
mod path;

pub use document::{DocToken, LineKind, ParsedDocument, TitleEntry, TitlePage};
pub use facts::{BasicStats, CharacterRecord, FactsSnapshot, LocationRecord};
pub use path::{PathParseError, PropertyPath};
