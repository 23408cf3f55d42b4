//! Index configuration and lifecycle status.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

use super::field::{FieldDefinition, FieldSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndexStatus {
    #[default]
    Building,
    Active,
    Disabled,
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Building => "Building",
            Self::Active => "Active",
            Self::Disabled => "Disabled",
        };
        f.write_str(name)
    }
}

/// Configuration owned by one index instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfiguration {
    pub index_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub index_type: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub status: IndexStatus,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default)]
    pub fields: FieldSchema,
    #[serde(default)]
    pub custom_settings: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IndexConfiguration {
    /// New configuration with a generated id, in `Building` status.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            index_id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            index_type: "general".to_string(),
            priority: 0,
            status: IndexStatus::Building,
            is_enabled: true,
            max_items: None,
            fields: FieldSchema::default(),
            custom_settings: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_id(mut self, index_id: impl Into<String>) -> Self {
        self.index_id = index_id.into();
        self
    }

    #[must_use]
    pub fn with_type(mut self, index_type: impl Into<String>) -> Self {
        self.index_type = index_type.into();
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub const fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Append a field definition.
    pub fn with_field(mut self, field: FieldDefinition) -> Result<Self> {
        self.fields.push(field)?;
        Ok(self)
    }

    /// Append several field definitions.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDefinition>) -> Result<Self> {
        for field in fields {
            self.fields.push(field)?;
        }
        Ok(self)
    }

    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom_settings.insert(key.into(), value);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.index_id.trim().is_empty() {
            return Err(EngineError::Validation("index id is required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(EngineError::Validation("index name is required".into()));
        }
        if self.max_items == Some(0) {
            return Err(EngineError::Validation(format!(
                "index {}: max items must be positive",
                self.name
            )));
        }
        self.fields.validate()
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
