//! Lookup driver
//!
//! Per incoming row:
//!
//! 1. Bind each configured condition to the row's input columns
//! 2. Resolve the conjunction against the cache
//! 3. Apply the multiple-match policy or the no-match policy
//! 4. Hand the resulting output rows to the sink

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{
    CacheError, CacheResult, FieldType, LookupCondition, LookupSession, MatchResult, Operator,
    Ordinal, ReadAllCache, Value,
};
use crate::observability::{Event, Logger};

use super::config::LookupConfig;

/// Incoming pipeline row, by column name
pub type InputRow = HashMap<String, Value>;

/// What to emit when more than one row matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultipleMatchPolicy {
    /// Lowest ordinal (first loaded) wins
    #[default]
    First,
    /// One output per match, in load order
    All,
    /// Reject the incoming row with `AmbiguousMatch`
    Fail,
}

/// A configured condition whose bounds come from incoming rows
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSpec {
    pub field: String,
    pub field_type: FieldType,
    pub op: Operator,
    pub input: Option<String>,
    pub upper_input: Option<String>,
}

impl ConditionSpec {
    /// Build the concrete condition for one incoming row.
    ///
    /// Input values are coerced to the key field's type where possible
    /// (e.g. date strings); anything else is passed through so the engine
    /// reports the mismatch.
    pub fn bind(&self, row: &InputRow) -> CacheResult<LookupCondition> {
        let value = match (&self.input, self.op.needs_value()) {
            (Some(column), true) => self.column(row, column)?,
            (None, true) => {
                return Err(CacheError::condition(&self.field, "no input column configured"))
            }
            (_, false) => Value::Null,
        };
        let upper = match (&self.upper_input, self.op.needs_upper()) {
            (Some(column), true) => Some(self.column(row, column)?),
            _ => None,
        };
        Ok(LookupCondition {
            field: self.field.clone(),
            op: self.op,
            value,
            upper,
        })
    }

    fn column(&self, row: &InputRow, column: &str) -> CacheResult<Value> {
        let raw = row.get(column).ok_or_else(|| {
            CacheError::condition(&self.field, format!("input column '{}' missing", column))
        })?;
        if self.op == Operator::Like {
            return Ok(raw.clone());
        }
        Ok(raw.coerce_to(self.field_type).unwrap_or_else(|| raw.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DriverOptions {
    pub policy: MultipleMatchPolicy,
    pub eat_row_on_failure: bool,
    pub reorder_conditions: bool,
    /// Output values used when nothing matches
    pub defaults: Vec<Value>,
}

/// Receives the outcome of each lookup
pub trait LookupSink {
    /// One output row for `input`
    fn emit(&mut self, input: &InputRow, outputs: &[Value]) -> CacheResult<()>;

    /// Nothing matched `input`; called before any defaults are emitted
    fn no_match(&mut self, _input: &InputRow) -> CacheResult<()> {
        Ok(())
    }
}

/// Collects everything in memory
#[derive(Debug, Default)]
pub struct VecSink {
    pub emitted: Vec<Vec<Value>>,
    pub misses: usize,
}

impl LookupSink for VecSink {
    fn emit(&mut self, _input: &InputRow, outputs: &[Value]) -> CacheResult<()> {
        self.emitted.push(outputs.to_vec());
        Ok(())
    }

    fn no_match(&mut self, _input: &InputRow) -> CacheResult<()> {
        self.misses += 1;
        Ok(())
    }
}

/// What happened to one incoming row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Emitted this many matched rows
    Matched(usize),
    /// No match, defaults emitted
    Defaulted,
    /// No match, row dropped
    Dropped,
}

/// Drives one lookup stream over a shared cache
#[derive(Debug)]
pub struct LookupDriver {
    session: LookupSession,
    specs: Vec<ConditionSpec>,
    options: DriverOptions,
    bound: Vec<LookupCondition>,
}

impl LookupDriver {
    pub fn new(
        cache: Arc<ReadAllCache>,
        mut specs: Vec<ConditionSpec>,
        options: DriverOptions,
    ) -> CacheResult<Self> {
        let outputs = cache.schema().output_fields().len();
        if !options.defaults.is_empty() && options.defaults.len() != outputs {
            return Err(CacheError::config(format!(
                "{} default values for {} output fields",
                options.defaults.len(),
                outputs
            )));
        }
        for spec in &specs {
            if cache.index(&spec.field).is_none() {
                return Err(CacheError::condition(&spec.field, "no index for this field"));
            }
        }
        if options.reorder_conditions {
            specs.sort_by_key(|s| s.op.cost_class());
        }

        Ok(Self {
            bound: Vec::with_capacity(specs.len()),
            session: LookupSession::new(cache),
            specs,
            options,
        })
    }

    pub fn from_config(cache: Arc<ReadAllCache>, config: &LookupConfig) -> CacheResult<Self> {
        Self::new(cache, config.condition_specs()?, config.driver_options())
    }

    pub fn specs(&self) -> &[ConditionSpec] {
        &self.specs
    }

    pub fn cache(&self) -> &Arc<ReadAllCache> {
        self.session.cache()
    }

    /// Resolve one incoming row and feed the sink
    pub fn process<K: LookupSink>(&mut self, input: &InputRow, sink: &mut K) -> CacheResult<LookupOutcome> {
        let result = self.lookup(input, sink);
        if let Err(e) = &result {
            if !matches!(e, CacheError::AmbiguousMatch { .. }) {
                Logger::error(
                    Event::LookupFailed.as_str(),
                    &[("code", e.code()), ("error", e.to_string().as_str())],
                );
            }
        }
        result
    }

    fn lookup<K: LookupSink>(&mut self, input: &InputRow, sink: &mut K) -> CacheResult<LookupOutcome> {
        self.bound.clear();
        for spec in &self.specs {
            self.bound.push(spec.bind(input)?);
        }

        let ordinals: Vec<Ordinal> = match self.session.resolve(&self.bound)? {
            MatchResult::NoMatch => Vec::new(),
            MatchResult::Single(row) => vec![row.ordinal()],
            MatchResult::Multiple(ordinals) => ordinals,
        };

        if ordinals.is_empty() {
            sink.no_match(input)?;
            if self.options.eat_row_on_failure {
                return Ok(LookupOutcome::Dropped);
            }
            let defaults = self.defaults();
            sink.emit(input, &defaults)?;
            return Ok(LookupOutcome::Defaulted);
        }

        match self.options.policy {
            MultipleMatchPolicy::First => self.emit_rows(input, &ordinals[..1], sink),
            MultipleMatchPolicy::All => self.emit_rows(input, &ordinals, sink),
            MultipleMatchPolicy::Fail => {
                let count = ordinals.len().to_string();
                Logger::warn(Event::LookupAmbiguous.as_str(), &[("matches", count.as_str())]);
                Err(CacheError::AmbiguousMatch {
                    count: ordinals.len(),
                })
            }
        }
    }

    fn emit_rows<K: LookupSink>(
        &self,
        input: &InputRow,
        ordinals: &[Ordinal],
        sink: &mut K,
    ) -> CacheResult<LookupOutcome> {
        let cache = self.session.cache();
        for ordinal in ordinals {
            let row = cache
                .row(*ordinal)
                .ok_or_else(|| CacheError::Internal(format!("ordinal {} not in row store", ordinal)))?;
            sink.emit(input, row.outputs())?;
        }
        Ok(LookupOutcome::Matched(ordinals.len()))
    }

    fn defaults(&self) -> Vec<Value> {
        if self.options.defaults.is_empty() {
            vec![Value::Null; self.session.cache().schema().output_fields().len()]
        } else {
            self.options.defaults.clone()
        }
    }
}
