//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::{Table, Tabled, settings::Style};

use tidewatch_core::decode;

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Print a status line to stderr, green when color is on.
pub fn success(message: &str, color: bool, quiet: bool) {
    if quiet {
        return;
    }
    if color {
        eprintln!("{} {message}", "✓".green());
    } else {
        eprintln!("✓ {message}");
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted string,
/// since single-item detail views don't use `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Render a tree. Tables and plain output use the flattened rows;
/// structured formats keep the nesting.
pub fn render_tree<T, R>(
    format: &OutputFormat,
    roots: &[T],
    flatten: impl Fn(&[T]) -> Vec<R>,
    id_fn: impl Fn(&R) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => render_table(&flatten(roots)),
        OutputFormat::Json => render_json(roots, false),
        OutputFormat::JsonCompact => render_json(roots, true),
        OutputFormat::Yaml => render_yaml(roots),
        OutputFormat::Plain => flatten(roots)
            .iter()
            .map(id_fn)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Render schemaless telemetry rows.
///
/// Columns are the union of keys in first-seen order, with `time` first.
/// With `decode`, coded fields are replaced by their readable form in
/// every format.
pub fn render_records(format: &OutputFormat, records: &[Value], decode: bool) -> String {
    let records: Vec<Value> = if decode {
        records.iter().map(decode_record).collect()
    } else {
        records.to_vec()
    };

    match format {
        OutputFormat::Table => {
            let columns = record_columns(&records);
            let mut builder = Builder::default();
            builder.push_record(columns.iter().cloned());
            for record in &records {
                builder.push_record(columns.iter().map(|c| cell(record.get(c))));
            }
            builder.build().with(Style::rounded()).to_string()
        }
        OutputFormat::Json => render_json(&records, false),
        OutputFormat::JsonCompact => records
            .iter()
            .map(|r| render_json(r, true))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Yaml => render_yaml(&records),
        OutputFormat::Plain => records
            .iter()
            .map(|r| cell(r.get("time")))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn decode_record(record: &Value) -> Value {
    let Value::Object(map) = record else {
        return record.clone();
    };
    let decoded = map
        .iter()
        .map(|(k, v)| {
            let v = decode::humanize(k, v).map_or_else(|| v.clone(), Value::String);
            (k.clone(), v)
        })
        .collect();
    Value::Object(decoded)
}

fn record_columns(records: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        if let Value::Object(map) = record {
            for key in map.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
    }
    if let Some(pos) = columns.iter().position(|c| c == "time") {
        let time = columns.remove(pos);
        columns.insert(0, time);
    }
    columns
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let result = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    result.unwrap_or_else(|e| format!("<serialization failed: {e}>"))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("<serialization failed: {e}>"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn record_columns_put_time_first() {
        let records = vec![
            json!({ "ubatt": 3600, "time": "t1" }),
            json!({ "time": "t0", "leak": 0 }),
        ];
        assert_eq!(record_columns(&records), vec!["time", "ubatt", "leak"]);
    }

    #[test]
    fn plain_records_list_timestamps() {
        let records = vec![json!({ "time": "t1" }), json!({ "time": "t0" })];
        assert_eq!(render_records(&OutputFormat::Plain, &records, false), "t1\nt0");
    }

    #[test]
    fn decoded_records_use_labels() {
        let records = vec![json!({ "time": "t1", "uploadChannel": 2 })];
        let out = render_records(&OutputFormat::JsonCompact, &records, true);
        let back: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(back["uploadChannel"], "Beidou");
    }

    #[test]
    fn table_renders_missing_cells_blank() {
        let records = vec![json!({ "time": "t1", "a": 1 }), json!({ "time": "t0" })];
        let out = render_records(&OutputFormat::Table, &records, false);
        assert!(out.contains("t1"));
        assert!(out.contains("t0"));
    }
}
