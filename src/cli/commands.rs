//! CLI command implementations
//!
//! Both commands follow the same boot sequence:
//! 1. Configuration load
//! 2. Cache build from the reference file
//!
//! `lookup` then streams stdin through a `LookupDriver`; `stats` reports the
//! shape of the built cache and exits.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Map, Value as JsonValue};

use crate::cache::{CacheError, CacheResult, JsonLinesSource, ReadAllCache, Value};
use crate::driver::{InputRow, LookupConfig, LookupDriver, LookupSink};
use crate::observability::{log_event_with_fields, Event, Logger};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_input_rows, write_output_row};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    Logger::set_min_severity(cli.log_level);
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Lookup { config, reference } => lookup(&config, &reference),
        Command::Stats { config, reference } => stats(&config, &reference),
    }
}

/// Counts for one lookup stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub rows_in: u64,
    pub rows_out: u64,
    pub rows_rejected: u64,
}

/// Resolve stdin rows against the reference table, writing to stdout
pub fn lookup(config_path: &Path, reference: &Path) -> CliResult<()> {
    let config = LookupConfig::load(config_path)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    lookup_stream(&config, reference, stdin.lock(), &mut out)?;
    out.flush()?;
    Ok(())
}

/// Build the cache and run every row of `input` through the driver.
///
/// Rows rejected with a non-fatal error are logged and skipped; fatal errors
/// and output failures end the stream.
pub fn lookup_stream<R: BufRead, W: Write>(
    config: &LookupConfig,
    reference: &Path,
    input: R,
    out: &mut W,
) -> CliResult<StreamSummary> {
    let cache = build_cache(config, reference)?;
    let mut driver = LookupDriver::from_config(Arc::clone(&cache), config)?;
    let mut sink = JsonLinesSink {
        out,
        output_fields: cache.schema().output_fields(),
        written: 0,
    };
    let mut summary = StreamSummary::default();

    for row in read_input_rows(input) {
        let row = match row {
            Ok(row) => row,
            Err(CliError::Input { line, reason }) => {
                let line = line.to_string();
                Logger::error(
                    Event::LookupFailed.as_str(),
                    &[("code", "ROWCACHE_CLI_INPUT"), ("error", reason.as_str()), ("line", line.as_str())],
                );
                summary.rows_in += 1;
                summary.rows_rejected += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        summary.rows_in += 1;

        match driver.process(&row, &mut sink) {
            Ok(_) => {}
            Err(e @ CacheError::Sink(_)) => return Err(e.into()),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(_) => summary.rows_rejected += 1,
        }
    }
    summary.rows_out = sink.written;

    let rows_in = summary.rows_in.to_string();
    let rows_out = summary.rows_out.to_string();
    let rejected = summary.rows_rejected.to_string();
    let metrics = cache.metrics().to_json();
    log_event_with_fields(
        Event::LookupStreamComplete,
        &[
            ("metrics", metrics.as_str()),
            ("rows_in", rows_in.as_str()),
            ("rows_out", rows_out.as_str()),
            ("rows_rejected", rejected.as_str()),
        ],
    );
    Ok(summary)
}

/// Build the cache and print its row count and per-field key counts
pub fn stats(config_path: &Path, reference: &Path) -> CliResult<()> {
    let config = LookupConfig::load(config_path)?;
    let cache = build_cache(&config, reference)?;

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &stats_report(&cache))?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Row count plus distinct keys and nulls per key field
pub fn stats_report(cache: &ReadAllCache) -> JsonValue {
    let mut fields = Map::new();
    for field in cache.schema().key_fields() {
        if let Some(index) = cache.index(&field.name) {
            fields.insert(
                field.name.clone(),
                json!({
                    "type": field.field_type.as_str(),
                    "distinct_keys": index.key_count(),
                    "nulls": index.null_rows().len(),
                }),
            );
        }
    }
    json!({
        "rows": cache.row_count(),
        "fields": fields,
    })
}

fn build_cache(config: &LookupConfig, reference: &Path) -> CliResult<Arc<ReadAllCache>> {
    let file = File::open(reference).map_err(|e| {
        CliError::config_error(format!("failed to open reference {}: {}", reference.display(), e))
    })?;
    let schema = config.schema()?;
    let mut source = JsonLinesSource::new(BufReader::new(file), &schema);
    Ok(Arc::new(ReadAllCache::build(schema, &mut source)?))
}

struct JsonLinesSink<'a, W: Write> {
    out: &'a mut W,
    output_fields: &'a [String],
    written: u64,
}

impl<W: Write> LookupSink for JsonLinesSink<'_, W> {
    fn emit(&mut self, input: &InputRow, outputs: &[Value]) -> CacheResult<()> {
        write_output_row(&mut *self.out, input, self.output_fields, outputs)
            .map_err(|e| CacheError::Sink(e.to_string()))?;
        self.written += 1;
        Ok(())
    }
}
