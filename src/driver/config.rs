//! Lookup configuration file
//!
//! JSON document describing the cached table, the lookup conditions and the
//! match policies. Loaded once, validated, then turned into a `CacheSchema`
//! and a list of `ConditionSpec`s.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::driver::{ConditionSpec, DriverOptions, MultipleMatchPolicy};
use crate::cache::{CacheError, CacheResult, CacheSchema, FieldType, KeyField, Operator, Value};
use crate::observability::{log_event_with_fields, Event};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFieldConfig {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// String fields only (optional, default true)
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputFieldConfig {
    pub name: String,

    /// Emitted when nothing matches (optional, default null)
    #[serde(default)]
    pub default: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionConfig {
    /// Key field to compare against
    pub field: String,

    /// `=`, `<>`, `<`, `<=`, `>`, `>=`, `BETWEEN`, `LIKE`, `IS NULL`, `IS NOT NULL`
    pub operator: String,

    /// Incoming column holding the bound (not used by null tests)
    #[serde(default)]
    pub input: Option<String>,

    /// Incoming column holding the upper bound (BETWEEN only)
    #[serde(default)]
    pub upper_input: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    pub key_fields: Vec<KeyFieldConfig>,

    #[serde(default)]
    pub output_fields: Vec<OutputFieldConfig>,

    pub conditions: Vec<ConditionConfig>,

    /// What to do when several rows match (optional, default "first")
    #[serde(default)]
    pub multiple_match_policy: MultipleMatchPolicy,

    /// Drop incoming rows without a match instead of emitting defaults
    #[serde(default)]
    pub eat_row_on_failure: bool,

    /// Evaluate cheap conditions first
    #[serde(default)]
    pub reorder_conditions: bool,
}

fn default_true() -> bool {
    true
}

impl LookupConfig {
    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> CacheResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CacheError::config(format!("failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_json_str(&content)?;

        let conditions = config.conditions.len().to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("path", path.display().to_string().as_str()), ("conditions", conditions.as_str())],
        );
        Ok(config)
    }

    /// Parse and validate configuration from JSON text
    pub fn from_json_str(content: &str) -> CacheResult<Self> {
        let config: LookupConfig = serde_json::from_str(content)
            .map_err(|e| CacheError::config(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CacheResult<()> {
        if self.key_fields.is_empty() {
            return Err(CacheError::config("at least one key field is required"));
        }
        // Shape checks (empty / duplicate names) live in CacheSchema.
        self.schema()?;

        let keys: HashSet<&str> = self.key_fields.iter().map(|f| f.name.as_str()).collect();
        for condition in &self.conditions {
            if !keys.contains(condition.field.as_str()) {
                return Err(CacheError::config(format!(
                    "condition field '{}' is not a key field",
                    condition.field
                )));
            }
            let op: Operator = condition.operator.parse()?;
            if op.needs_value() && condition.input.is_none() {
                return Err(CacheError::config(format!(
                    "condition '{} {}' needs an input column",
                    condition.field, op
                )));
            }
            if op.needs_upper() && condition.upper_input.is_none() {
                return Err(CacheError::config(format!(
                    "condition '{} {}' needs an upper_input column",
                    condition.field, op
                )));
            }
        }
        Ok(())
    }

    pub fn schema(&self) -> CacheResult<CacheSchema> {
        let key_fields = self
            .key_fields
            .iter()
            .map(|f| KeyField {
                name: f.name.clone(),
                field_type: f.field_type,
                case_sensitive: f.case_sensitive,
            })
            .collect();
        let output_fields = self.output_fields.iter().map(|f| f.name.clone()).collect();
        CacheSchema::new(key_fields, output_fields)
    }

    pub fn condition_specs(&self) -> CacheResult<Vec<ConditionSpec>> {
        self.conditions
            .iter()
            .map(|c| {
                let field_type = self
                    .key_fields
                    .iter()
                    .find(|f| f.name == c.field)
                    .map(|f| f.field_type)
                    .ok_or_else(|| CacheError::config(format!("unknown key field '{}'", c.field)))?;
                Ok(ConditionSpec {
                    field: c.field.clone(),
                    field_type,
                    op: c.operator.parse()?,
                    input: c.input.clone(),
                    upper_input: c.upper_input.clone(),
                })
            })
            .collect()
    }

    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            policy: self.multiple_match_policy,
            eat_row_on_failure: self.eat_row_on_failure,
            reorder_conditions: self.reorder_conditions,
            defaults: self
                .output_fields
                .iter()
                .map(|f| Value::from_json(&f.default))
                .collect(),
        }
    }
}
