//! Data model: field declarations, dynamic values, index configuration.

pub mod field;
pub mod index_config;
pub mod value;

pub use field::{FieldDataType, FieldDefinition, FieldSchema, FieldValidation};
pub use index_config::{IndexConfiguration, IndexStatus};
pub use value::{FieldValue, Record, parse_date};
