//! Field model: the runtime declaration of a record's indexable fields.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

use super::value::{FieldValue, Record};

/// Declared data type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldDataType {
    Text,
    Number,
    Date,
    Boolean,
    Select,
    MultiSelect,
    NumericRange,
    DateRange,
}

impl FieldDataType {
    /// Types whose values have a meaningful string form for text criteria.
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::Text | Self::Select | Self::MultiSelect)
    }

    #[must_use]
    pub const fn is_range(self) -> bool {
        matches!(self, Self::NumericRange | Self::DateRange)
    }

    /// Types whose values can be ordered against a scalar bound.
    #[must_use]
    pub const fn is_ordered(self) -> bool {
        !matches!(self, Self::MultiSelect)
    }

    /// Types that get an equality postings list.
    #[must_use]
    pub const fn supports_postings(self) -> bool {
        !self.is_range()
    }

    /// Type of a single element: the member of a multi-select, the endpoint
    /// of a range, or the type itself.
    #[must_use]
    pub const fn element_type(self) -> Self {
        match self {
            Self::MultiSelect => Self::Select,
            Self::NumericRange => Self::Number,
            Self::DateRange => Self::Date,
            other => other,
        }
    }
}

impl fmt::Display for FieldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "Text",
            Self::Number => "Number",
            Self::Date => "Date",
            Self::Boolean => "Boolean",
            Self::Select => "Select",
            Self::MultiSelect => "MultiSelect",
            Self::NumericRange => "NumericRange",
            Self::DateRange => "DateRange",
        };
        f.write_str(name)
    }
}

/// Bounds applied to a field's value.
///
/// `min`/`max` bound numbers, text length (in characters), list length, and
/// both endpoints of a numeric range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub field_name: String,
    pub display_name: String,
    pub data_type: FieldDataType,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default = "default_true")]
    pub is_searchable: bool,
    #[serde(default)]
    pub is_sortable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    #[serde(default)]
    pub validation: FieldValidation,
}

const fn default_true() -> bool {
    true
}

impl FieldDefinition {
    #[must_use]
    pub fn new(field_name: impl Into<String>, data_type: FieldDataType) -> Self {
        let field_name = field_name.into();
        Self {
            display_name: field_name.clone(),
            field_name,
            data_type,
            is_required: false,
            is_searchable: true,
            is_sortable: false,
            allowed_values: None,
            validation: FieldValidation::default(),
        }
    }

    #[must_use]
    pub fn text(field_name: impl Into<String>) -> Self {
        Self::new(field_name, FieldDataType::Text)
    }

    #[must_use]
    pub fn number(field_name: impl Into<String>) -> Self {
        Self::new(field_name, FieldDataType::Number)
    }

    #[must_use]
    pub fn date(field_name: impl Into<String>) -> Self {
        Self::new(field_name, FieldDataType::Date)
    }

    #[must_use]
    pub fn boolean(field_name: impl Into<String>) -> Self {
        Self::new(field_name, FieldDataType::Boolean)
    }

    #[must_use]
    pub fn select<S: Into<String>>(
        field_name: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(field_name, FieldDataType::Select).allowed_values(values)
    }

    #[must_use]
    pub fn multi_select<S: Into<String>>(
        field_name: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(field_name, FieldDataType::MultiSelect).allowed_values(values)
    }

    #[must_use]
    pub fn numeric_range(field_name: impl Into<String>) -> Self {
        Self::new(field_name, FieldDataType::NumericRange)
    }

    #[must_use]
    pub fn date_range(field_name: impl Into<String>) -> Self {
        Self::new(field_name, FieldDataType::DateRange)
    }

    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    #[must_use]
    pub const fn sortable(mut self) -> Self {
        self.is_sortable = true;
        self
    }

    #[must_use]
    pub const fn not_searchable(mut self) -> Self {
        self.is_searchable = false;
        self
    }

    #[must_use]
    pub fn allowed_values<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub const fn min(mut self, min: f64) -> Self {
        self.validation.min = Some(min);
        self
    }

    #[must_use]
    pub const fn max(mut self, max: f64) -> Self {
        self.validation.max = Some(max);
        self
    }

    #[must_use]
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.validation.error_message = Some(message.into());
        self
    }

    /// Check that the definition itself is coherent.
    pub fn validate_definition(&self) -> Result<()> {
        if self.field_name.trim().is_empty() {
            return Err(EngineError::Validation("field name is required".into()));
        }
        if let (Some(min), Some(max)) = (self.validation.min, self.validation.max) {
            if min > max {
                return Err(EngineError::Validation(format!(
                    "field {}: validation min {min} exceeds max {max}",
                    self.field_name
                )));
            }
        }
        if let Some(values) = &self.allowed_values {
            if values.is_empty() {
                return Err(EngineError::Validation(format!(
                    "field {}: allowed values list is empty",
                    self.field_name
                )));
            }
        }
        Ok(())
    }

    /// Validate one value for this field, returning it coerced to the
    /// declared data type.
    pub fn validate_value(&self, value: &FieldValue) -> Result<FieldValue> {
        if value.is_null() {
            if self.is_required {
                return Err(self.fail(format!("field {} is required", self.field_name)));
            }
            return Ok(FieldValue::Null);
        }

        let coerced = value.coerce_to(self.data_type).ok_or_else(|| {
            EngineError::type_mismatch(&self.field_name, self.data_type, value.type_name())
        })?;

        if !coerced.is_finite() {
            return Err(self.fail(format!(
                "field {}: numbers must be finite",
                self.field_name
            )));
        }

        self.check_allowed(&coerced)?;
        self.check_bounds(&coerced)?;
        Ok(coerced)
    }

    fn check_allowed(&self, value: &FieldValue) -> Result<()> {
        let Some(allowed) = &self.allowed_values else {
            return Ok(());
        };
        let is_allowed = |text: &str| {
            let folded = text.to_lowercase();
            allowed
                .iter()
                .any(|candidate| candidate.to_lowercase() == folded)
        };

        let rejected = match value {
            FieldValue::Text(text) => (!is_allowed(text)).then(|| text.clone()),
            FieldValue::List(items) => items
                .iter()
                .filter_map(FieldValue::as_text)
                .find(|text| !is_allowed(text))
                .map(str::to_string),
            _ => None,
        };

        match rejected {
            Some(text) => Err(self.fail(format!(
                "field {}: value {text:?} is not one of {}",
                self.field_name,
                allowed.join(", ")
            ))),
            None => Ok(()),
        }
    }

    fn check_bounds(&self, value: &FieldValue) -> Result<()> {
        let FieldValidation { min, max, .. } = &self.validation;
        if min.is_none() && max.is_none() {
            return Ok(());
        }

        #[allow(clippy::cast_precision_loss)]
        let measures: Vec<f64> = match value {
            FieldValue::Number(n) => vec![*n],
            FieldValue::Text(text) => vec![text.chars().count() as f64],
            FieldValue::List(items) => vec![items.len() as f64],
            FieldValue::NumberRange { min, max } => vec![*min, *max],
            _ => Vec::new(),
        };

        for measure in measures {
            if let Some(min) = min {
                if measure < *min {
                    return Err(self.fail(format!(
                        "field {}: {measure} is below minimum {min}",
                        self.field_name
                    )));
                }
            }
            if let Some(max) = max {
                if measure > *max {
                    return Err(self.fail(format!(
                        "field {}: {measure} is above maximum {max}",
                        self.field_name
                    )));
                }
            }
        }
        Ok(())
    }

    fn fail(&self, default_message: String) -> EngineError {
        EngineError::Validation(
            self.validation
                .error_message
                .clone()
                .unwrap_or(default_message),
        )
    }
}

/// Ordered set of field definitions with unique names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema {
    fields: Vec<FieldDefinition>,
}

impl FieldSchema {
    pub fn new(fields: impl IntoIterator<Item = FieldDefinition>) -> Result<Self> {
        let mut schema = Self::default();
        for field in fields {
            schema.push(field)?;
        }
        Ok(schema)
    }

    pub fn push(&mut self, field: FieldDefinition) -> Result<()> {
        field.validate_definition()?;
        if self.contains(&field.field_name) {
            return Err(EngineError::Validation(format!(
                "duplicate field name: {}",
                field.field_name
            )));
        }
        self.fields.push(field);
        Ok(())
    }

    pub fn remove(&mut self, field_name: &str) -> Option<FieldDefinition> {
        let pos = self
            .fields
            .iter()
            .position(|field| field.field_name == field_name)?;
        Some(self.fields.remove(pos))
    }

    #[must_use]
    pub fn get(&self, field_name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.field_name == field_name)
    }

    /// Look up a field, failing with `UnknownField`.
    pub fn require(&self, field_name: &str) -> Result<&FieldDefinition> {
        self.get(field_name)
            .ok_or_else(|| EngineError::UnknownField(field_name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, field_name: &str) -> bool {
        self.get(field_name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Re-check every definition, including name uniqueness.
    pub fn validate(&self) -> Result<()> {
        Self::new(self.fields.iter().cloned()).map(|_| ())
    }

    /// Validate a record against the schema and return a normalized copy.
    ///
    /// Declared fields are coerced to their data types; fields the schema
    /// does not declare are kept verbatim.
    pub fn validate_record(&self, record: &Record) -> Result<Record> {
        let mut normalized = record.clone();
        for field in &self.fields {
            let value = field.validate_value(record.value(&field.field_name))?;
            if value.is_null() {
                normalized.remove(&field.field_name);
            } else {
                normalized.insert(field.field_name.clone(), value);
            }
        }
        Ok(normalized)
    }
}

impl<'a> IntoIterator for &'a FieldSchema {
    type Item = &'a FieldDefinition;
    type IntoIter = std::slice::Iter<'a, FieldDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
