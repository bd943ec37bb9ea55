use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::data::model::{Column, EventCollection};

// ---------------------------------------------------------------------------
// PrintConfig – truncation and precision policy
// ---------------------------------------------------------------------------

/// How events are rendered: how many of them, float precision, and how many
/// elements of a jagged value to show before truncating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintConfig {
    pub n_events: usize,
    pub precision: usize,
    pub max_elements: usize,
}

impl Default for PrintConfig {
    fn default() -> Self {
        PrintConfig {
            n_events: 1,
            precision: 3,
            max_elements: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// Event rendering
// ---------------------------------------------------------------------------

const SEPARATOR_WIDTH: usize = 85;

/// Render the first `config.n_events` events as `field: value` lines with a
/// separator between events. Read-only; nested field names keep their dotted
/// form.
pub fn format_events(c: &EventCollection, config: &PrintConfig) -> String {
    let n = config.n_events.min(c.len());
    let mut out = String::new();
    let _ = writeln!(out, "\n---> Printing {n} event(s)...\n");
    let separator = "-".repeat(SEPARATOR_WIDTH);
    for event in 0..n {
        out.push_str(&separator);
        out.push('\n');
        for field in c.field_names() {
            // field_names() only yields present columns
            if let Ok(column) = c.column(field) {
                let _ = writeln!(out, "{field}: {}", format_value(column, event, config));
            }
        }
        out.push_str(&separator);
        out.push_str("\n\n");
    }
    out
}

/// Print the rendered events to stdout.
pub fn print_events(c: &EventCollection, config: &PrintConfig) {
    print!("{}", format_events(c, config));
}

fn format_value(column: &Column, event: usize, config: &PrintConfig) -> String {
    match column {
        Column::F64(v) => format!("{:.*}", config.precision, v[event]),
        Column::I64(v) => v[event].to_string(),
        Column::Bool(v) => v[event].to_string(),
        Column::JaggedF64(v) => format_list(
            v[event].iter().map(|x| format!("{:.*}", config.precision, x)),
            v[event].len(),
            config.max_elements,
        ),
        Column::JaggedI64(v) => format_list(
            v[event].iter().map(i64::to_string),
            v[event].len(),
            config.max_elements,
        ),
    }
}

fn format_list(items: impl Iterator<Item = String>, len: usize, max: usize) -> String {
    let shown: Vec<String> = items.take(max).collect();
    if len > max {
        format!("[{}, ... ({len} total)]", shown.join(", "))
    } else {
        format!("[{}]", shown.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::EventCollection;

    fn collection() -> EventCollection {
        EventCollection::from_columns(vec![
            ("event".to_string(), Column::I64(vec![1001, 1002])),
            (
                "trkqual.result".to_string(),
                Column::F64(vec![0.87654, 0.12345]),
            ),
            (
                "trksegs.time".to_string(),
                Column::JaggedF64(vec![
                    (0..12).map(|i| 500.0 + i as f64).collect(),
                    vec![640.25],
                ]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn renders_fields_with_precision() {
        let text = format_events(&collection(), &PrintConfig::default());
        assert!(text.contains("event: 1001"));
        assert!(text.contains("trkqual.result: 0.877"));
        // Only one event by default.
        assert!(!text.contains("1002"));
    }

    #[test]
    fn long_jagged_values_are_truncated() {
        let text = format_events(&collection(), &PrintConfig::default());
        assert!(text.contains("... (12 total)"));
    }

    #[test]
    fn respects_event_count_and_bounds() {
        let config = PrintConfig {
            n_events: 5,
            ..PrintConfig::default()
        };
        let text = format_events(&collection(), &config);
        // Clamped to the two available events.
        assert!(text.contains("---> Printing 2 event(s)"));
        assert!(text.contains("1002"));
    }
}
