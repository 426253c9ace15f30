//! JSON-lines I/O for the CLI
//!
//! - Input: one JSON object per line on stdin, blank lines skipped
//! - Output: one JSON object per emitted row on stdout
//! - UTF-8 only

use std::io::{BufRead, Write};

use serde_json::{Map, Value as JsonValue};

use super::errors::{CliError, CliResult};
use crate::cache::Value;
use crate::driver::InputRow;

/// Parse one incoming line into an input row
pub fn parse_input_row(line_number: usize, line: &str) -> CliResult<InputRow> {
    let parsed: JsonValue = serde_json::from_str(line)
        .map_err(|e| CliError::input_error(line_number, e.to_string()))?;
    let object = match parsed {
        JsonValue::Object(object) => object,
        _ => return Err(CliError::input_error(line_number, "expected a JSON object")),
    };
    Ok(object
        .iter()
        .map(|(k, v)| (k.clone(), Value::from_json(v)))
        .collect())
}

/// Iterate over non-blank input lines as rows, numbered from 1
pub fn read_input_rows<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<InputRow>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(parse_input_row(idx + 1, &line)),
            Err(e) => Some(Err(CliError::from(e))),
        })
}

/// Write the input row extended with the output fields as one JSON line.
///
/// Output fields win over input columns of the same name.
pub fn write_output_row<W: Write>(
    out: &mut W,
    input: &InputRow,
    output_fields: &[String],
    outputs: &[Value],
) -> CliResult<()> {
    let mut object = Map::new();
    for (name, value) in input {
        object.insert(name.clone(), value.to_json());
    }
    for (name, value) in output_fields.iter().zip(outputs) {
        object.insert(name.clone(), value.to_json());
    }
    serde_json::to_writer(&mut *out, &JsonValue::Object(object))?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_skips_blank_lines() {
        let input = Cursor::new("{\"id\": 1}\n\n   \n{\"id\": 2, \"name\": \"b\"}\n");
        let rows: Vec<InputRow> = read_input_rows(input).collect::<CliResult<_>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("name"), Some(&Value::from("b")));
    }

    #[test]
    fn test_non_object_reports_line() {
        let input = Cursor::new("{\"id\": 1}\n[1, 2]\n");
        let err = read_input_rows(input).nth(1).unwrap().unwrap_err();
        match err {
            CliError::Input { line, .. } => assert_eq!(line, 2),
            other => panic!("expected input error, got {:?}", other),
        }
    }

    #[test]
    fn test_write_merges_outputs() {
        let mut input = InputRow::new();
        input.insert("id".to_string(), Value::Integer(7));
        input.insert("label".to_string(), Value::from("stale"));

        let mut out = Vec::new();
        write_output_row(&mut out, &input, &["label".to_string()], &[Value::from("fresh")]).unwrap();

        let line = String::from_utf8(out).unwrap();
        assert!(line.ends_with('\n'));
        let parsed: JsonValue = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(parsed["id"], 7);
        assert_eq!(parsed["label"], "fresh");
    }
}
