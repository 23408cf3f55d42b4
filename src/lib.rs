//! dynidx - dynamic search-and-index engine.
//!
//! Records carry runtime-declared fields; indices filter them with typed
//! criteria (including fuzzy matching), sort, page and report telemetry.

pub mod app;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod query;
pub mod telemetry;
pub mod test_utils;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use index::{IndexInstance, IndexRegistry};
pub use model::{FieldDataType, FieldDefinition, FieldValue, IndexConfiguration, Record};
pub use query::{SearchCriterion, SearchRequest, SearchResult, SortCriterion};
