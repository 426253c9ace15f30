//! Row sources consumed by the cache builder
//!
//! A source yields rows until it returns `Ok(None)`. Any `Err` aborts the
//! build; the builder wraps it unchanged as the error's `source()`.

use std::error::Error as StdError;
use std::io::BufRead;

use thiserror::Error;

use super::builder::CacheSchema;
use super::value::{FieldType, Value};

/// One reference row as delivered by a source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    /// Key-field values, in schema order
    pub keys: Vec<Value>,
    /// Output-field values, in schema order
    pub outputs: Vec<Value>,
}

impl SourceRow {
    pub fn new(keys: Vec<Value>, outputs: Vec<Value>) -> Self {
        Self { keys, outputs }
    }
}

/// Trait for reading reference rows during a build
pub trait RowSource {
    type Error: StdError + Send + Sync + 'static;

    /// Read the next row. `Ok(None)` at end of input.
    fn next_row(&mut self) -> Result<Option<SourceRow>, Self::Error>;
}

/// Adapts any fallible iterator of rows
#[derive(Debug)]
pub struct IterSource<I>(I);

impl<I> IterSource<I> {
    pub fn new(rows: I) -> Self {
        Self(rows)
    }
}

impl<I, E> RowSource for IterSource<I>
where
    I: Iterator<Item = Result<SourceRow, E>>,
    E: StdError + Send + Sync + 'static,
{
    type Error = E;

    fn next_row(&mut self) -> Result<Option<SourceRow>, E> {
        self.0.next().transpose()
    }
}

/// Source that never fails
pub fn infallible<I>(rows: I) -> IterSource<impl Iterator<Item = Result<SourceRow, std::convert::Infallible>>>
where
    I: IntoIterator<Item = SourceRow>,
{
    IterSource::new(rows.into_iter().map(Ok))
}

/// Errors raised by `JsonLinesSource`
#[derive(Debug, Error)]
pub enum JsonSourceError {
    #[error("read failed at line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON at line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line} is not a JSON object")]
    NotAnObject { line: usize },

    #[error("line {line}: field '{field}' is not a valid {expected}")]
    FieldType {
        line: usize,
        field: String,
        expected: FieldType,
    },
}

/// Reads one JSON object per line, picking fields by name.
///
/// Missing fields read as null. Blank lines are skipped.
pub struct JsonLinesSource<R> {
    reader: R,
    key_fields: Vec<(String, FieldType)>,
    output_fields: Vec<String>,
    line: usize,
    buffer: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R, schema: &CacheSchema) -> Self {
        Self {
            reader,
            key_fields: schema
                .key_fields()
                .iter()
                .map(|f| (f.name.clone(), f.field_type))
                .collect(),
            output_fields: schema.output_fields().to_vec(),
            line: 0,
            buffer: String::new(),
        }
    }

    fn parse_line(&self) -> Result<SourceRow, JsonSourceError> {
        let line = self.line;
        let parsed: serde_json::Value = serde_json::from_str(&self.buffer)
            .map_err(|source| JsonSourceError::Json { line, source })?;
        let object = parsed
            .as_object()
            .ok_or(JsonSourceError::NotAnObject { line })?;

        let mut keys = Vec::with_capacity(self.key_fields.len());
        for (name, field_type) in &self.key_fields {
            let raw = object.get(name).map(Value::from_json).unwrap_or(Value::Null);
            let value = raw.coerce_to(*field_type).ok_or_else(|| JsonSourceError::FieldType {
                line,
                field: name.clone(),
                expected: *field_type,
            })?;
            keys.push(value);
        }

        let outputs = self
            .output_fields
            .iter()
            .map(|name| object.get(name).map(Value::from_json).unwrap_or(Value::Null))
            .collect();

        Ok(SourceRow { keys, outputs })
    }
}

impl<R: BufRead> RowSource for JsonLinesSource<R> {
    type Error = JsonSourceError;

    fn next_row(&mut self) -> Result<Option<SourceRow>, JsonSourceError> {
        loop {
            self.buffer.clear();
            self.line += 1;
            let read = self
                .reader
                .read_line(&mut self.buffer)
                .map_err(|source| JsonSourceError::Io {
                    line: self.line,
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }
            if !self.buffer.trim().is_empty() {
                return self.parse_line().map(Some);
            }
        }
    }
}
