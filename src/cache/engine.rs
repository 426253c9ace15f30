//! Lookup engine
//!
//! Evaluates a conjunction of conditions against the field indices.
//!
//! # Execution (strict order)
//!
//! 1. Validate every condition (indexed field, bounds present, bound types,
//!    LIKE patterns compiled)
//! 2. `init` the searching context to all rows
//! 3. Intersect each condition's row set into the context, stopping as soon
//!    as the context is empty
//! 4. Classify the survivors: none, one, or many
//!
//! Condition order never changes the result, only how much work is done.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::context::SearchingContext;
use super::errors::{CacheError, CacheResult};
use super::index::{FieldIndex, RowSet};
use super::like::LikePattern;
use super::store::{CachedRow, Ordinal, RowStore};
use super::value::Value;
use crate::observability::CacheMetrics;

/// Comparison operator of a lookup condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Between,
    IsNull,
    IsNotNull,
    Like,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Between => "BETWEEN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Like => "LIKE",
        }
    }

    /// Whether the operator reads the condition's bound value
    pub fn needs_value(&self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// Whether the operator also needs an upper bound
    pub fn needs_upper(&self) -> bool {
        matches!(self, Operator::Between)
    }

    /// Relative evaluation cost; lower is cheaper and usually more selective.
    pub fn cost_class(&self) -> u8 {
        match self {
            Operator::Eq | Operator::IsNull => 0,
            Operator::IsNotNull => 1,
            Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge | Operator::Between => 2,
            Operator::Ne => 3,
            Operator::Like => 4,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        let op = match normalized.as_str() {
            "=" | "==" | "EQ" => Operator::Eq,
            "<>" | "!=" | "NE" => Operator::Ne,
            "<" | "LT" => Operator::Lt,
            "<=" | "LE" => Operator::Le,
            ">" | "GT" => Operator::Gt,
            ">=" | "GE" => Operator::Ge,
            "BETWEEN" => Operator::Between,
            "IS NULL" | "IS_NULL" => Operator::IsNull,
            "IS NOT NULL" | "IS_NOT_NULL" => Operator::IsNotNull,
            "LIKE" => Operator::Like,
            _ => return Err(CacheError::config(format!("unknown operator '{}'", s))),
        };
        Ok(op)
    }
}

/// One predicate of a lookup: `field op value [AND upper]`
#[derive(Debug, Clone, PartialEq)]
pub struct LookupCondition {
    pub field: String,
    pub op: Operator,
    pub value: Value,
    /// Upper bound, BETWEEN only
    pub upper: Option<Value>,
}

impl LookupCondition {
    pub fn new(field: impl Into<String>, op: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
            upper: None,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Ne, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Lt, value.into())
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Le, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Gt, value.into())
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Ge, value.into())
    }

    pub fn between(field: impl Into<String>, lower: impl Into<Value>, upper: impl Into<Value>) -> Self {
        Self {
            upper: Some(upper.into()),
            ..Self::new(field, Operator::Between, lower.into())
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::IsNull, Value::Null)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::IsNotNull, Value::Null)
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::new(field, Operator::Like, pattern.into())
    }
}

/// Outcome of one lookup
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult<'c> {
    NoMatch,
    Single(&'c CachedRow),
    /// Ordinals in ascending (load) order
    Multiple(Vec<Ordinal>),
}

impl MatchResult<'_> {
    pub fn is_match(&self) -> bool {
        !matches!(self, MatchResult::NoMatch)
    }

    pub fn len(&self) -> usize {
        match self {
            MatchResult::NoMatch => 0,
            MatchResult::Single(_) => 1,
            MatchResult::Multiple(ordinals) => ordinals.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.is_match()
    }

    /// All matching ordinals, ascending
    pub fn ordinals(&self) -> Vec<Ordinal> {
        match self {
            MatchResult::NoMatch => Vec::new(),
            MatchResult::Single(row) => vec![row.ordinal()],
            MatchResult::Multiple(ordinals) => ordinals.clone(),
        }
    }
}

/// Read-only view over a built cache that answers lookups
#[derive(Debug, Clone, Copy)]
pub struct LookupEngine<'c> {
    store: &'c RowStore,
    indexes: &'c HashMap<String, FieldIndex>,
    metrics: &'c CacheMetrics,
}

impl<'c> LookupEngine<'c> {
    pub fn new(
        store: &'c RowStore,
        indexes: &'c HashMap<String, FieldIndex>,
        metrics: &'c CacheMetrics,
    ) -> Self {
        Self {
            store,
            indexes,
            metrics,
        }
    }

    /// Resolve a conjunction of conditions using `ctx` as scratch space.
    ///
    /// Malformed conditions fail before any index is queried.
    pub fn resolve(
        &self,
        ctx: &mut SearchingContext,
        conditions: &[LookupCondition],
    ) -> CacheResult<MatchResult<'c>> {
        self.metrics.increment_lookups();
        let result = self.evaluate(ctx, conditions);
        match &result {
            Ok(MatchResult::NoMatch) => self.metrics.increment_no_match(),
            Ok(MatchResult::Single(_)) => self.metrics.increment_single_match(),
            Ok(MatchResult::Multiple(_)) => self.metrics.increment_multiple_match(),
            Err(_) => self.metrics.increment_lookup_errors(),
        }
        result
    }

    fn evaluate(
        &self,
        ctx: &mut SearchingContext,
        conditions: &[LookupCondition],
    ) -> CacheResult<MatchResult<'c>> {
        let prepared = self.validate(conditions)?;

        ctx.init(self.store.row_count());
        for (prepared, condition) in prepared.iter().zip(conditions) {
            if ctx.is_empty() {
                self.metrics.increment_short_circuits();
                break;
            }
            apply_condition(ctx, prepared, condition)?;
        }

        let candidates = ctx.candidates();
        match candidates.len() {
            0 => Ok(MatchResult::NoMatch),
            1 => {
                let ordinal = candidates
                    .min()
                    .ok_or_else(|| CacheError::Internal("singleton set without a member".into()))?;
                self.store
                    .get(ordinal)
                    .map(MatchResult::Single)
                    .ok_or_else(|| CacheError::Internal(format!("ordinal {} not in row store", ordinal)))
            }
            _ => Ok(MatchResult::Multiple(candidates.iter().collect())),
        }
    }

    fn validate(&self, conditions: &[LookupCondition]) -> CacheResult<Vec<Prepared<'c>>> {
        conditions
            .iter()
            .map(|condition| {
                let index = self.indexes.get(&condition.field).ok_or_else(|| {
                    CacheError::condition(&condition.field, "no index for this field")
                })?;
                let like = check_condition(index, condition)?;
                Ok(Prepared { index, like })
            })
            .collect()
    }
}

/// A validated condition's index, plus its compiled pattern for LIKE
struct Prepared<'c> {
    index: &'c FieldIndex,
    like: Option<LikePattern>,
}

/// Check everything `apply_condition` could fail on.
fn check_condition(index: &FieldIndex, condition: &LookupCondition) -> CacheResult<Option<LikePattern>> {
    match condition.op {
        Operator::IsNull | Operator::IsNotNull => Ok(None),
        Operator::Like => index.compile_like(&condition.value),
        Operator::Between => {
            let upper = condition
                .upper
                .as_ref()
                .ok_or_else(|| CacheError::condition(index.field(), "BETWEEN needs an upper bound"))?;
            index.encoder().encode(&condition.value)?;
            index.encoder().encode(upper)?;
            Ok(None)
        }
        _ => index.encoder().encode(&condition.value).map(|_| None),
    }
}

fn apply_condition(
    ctx: &mut SearchingContext,
    prepared: &Prepared<'_>,
    condition: &LookupCondition,
) -> CacheResult<()> {
    let index = prepared.index;
    let value = &condition.value;
    match condition.op {
        Operator::Eq => match index.bucket(value)? {
            Some(rows) => ctx.intersect(rows, false),
            None => ctx.intersect(&RowSet::new(), false),
        },
        Operator::Ne => {
            // NULL <> x is never true
            if value.is_null() {
                ctx.intersect(&RowSet::new(), false);
            } else {
                if let Some(rows) = index.bucket(value)? {
                    ctx.intersect(rows, true);
                }
                ctx.intersect(index.null_rows(), true);
            }
        }
        Operator::Lt => intersect_range(ctx, index, None, Some(value), false, false)?,
        Operator::Le => intersect_range(ctx, index, None, Some(value), false, true)?,
        Operator::Gt => intersect_range(ctx, index, Some(value), None, false, false)?,
        Operator::Ge => intersect_range(ctx, index, Some(value), None, true, false)?,
        Operator::Between => {
            let upper = condition
                .upper
                .as_ref()
                .ok_or_else(|| CacheError::condition(index.field(), "BETWEEN needs an upper bound"))?;
            intersect_range(ctx, index, Some(value), Some(upper), true, true)?;
        }
        Operator::IsNull => ctx.intersect(index.null_rows(), false),
        Operator::IsNotNull => ctx.intersect(index.null_rows(), true),
        Operator::Like => match &prepared.like {
            Some(pattern) => {
                index.like_into(pattern, ctx.working_set());
                ctx.intersect_working(false);
            }
            None => ctx.intersect(&RowSet::new(), false),
        },
    }
    Ok(())
}

fn intersect_range(
    ctx: &mut SearchingContext,
    index: &FieldIndex,
    lower: Option<&Value>,
    upper: Option<&Value>,
    lower_inclusive: bool,
    upper_inclusive: bool,
) -> CacheResult<()> {
    index.range_into(lower, upper, lower_inclusive, upper_inclusive, ctx.working_set())?;
    ctx.intersect_working(false);
    Ok(())
}
