//! Per-column probe reports: a serializable summary of what inference
//! committed to, with YAML persistence and an aligned text rendering.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    column::{Column, DataType},
    ingest,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnReport {
    pub name: Option<String>,
    pub datatype: DataType,
    /// The finalized parse pattern for temporal columns inferred from text.
    pub pattern: Option<String>,
    /// Longest non-absent string observed, for downstream column sizing.
    pub max_width: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub rows: usize,
    pub columns: Vec<ColumnReport>,
}

impl ProbeReport {
    pub fn from_columns(columns: &[Column]) -> Self {
        let reports = columns
            .iter()
            .map(|column| ColumnReport {
                name: column.name().map(str::to_string),
                datatype: column.data_type(),
                pattern: column.resolved_pattern().map(str::to_string),
                max_width: column.max_char_len(),
            })
            .collect();
        Self {
            rows: ingest::row_count(columns),
            columns: reports,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating report file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing report YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening report file {path:?}"))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).context("Parsing report YAML")
    }

    /// Renders the report as an aligned text table.
    pub fn render(&self) -> String {
        if self.columns.is_empty() {
            return "No columns inferred.\n".to_string();
        }
        let headers = ["column", "datatype", "pattern", "max width"];
        let rows: Vec<[String; 4]> = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                [
                    column
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("(column {})", idx + 1)),
                    column.datatype.to_string(),
                    column.pattern.clone().unwrap_or_else(|| "-".to_string()),
                    column.max_width.to_string(),
                ]
            })
            .collect();

        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in &rows {
            for (idx, cell) in row.iter().enumerate() {
                widths[idx] = widths[idx].max(cell.chars().count());
            }
        }

        let format_row = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(widths.iter().copied())
                .map(|(cell, width)| format!("{cell:<width$}"))
                .join("  ")
                .trim_end()
                .to_string()
        };

        let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let mut lines = vec![format_row(&header_cells), format_row(&separator)];
        lines.extend(rows.iter().map(|row| format_row(row)));
        let mut output = lines.join("\n");
        output.push('\n');
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Column, RawValue};
    use tempfile::tempdir;

    fn probe_columns() -> Vec<Column> {
        let mut id = Column::new(Some("id".to_string()));
        id.process_value(RawValue::Text("42".to_string())).unwrap();
        id.finalize().unwrap();

        let mut seen = Column::new(Some("seen".to_string()));
        seen.process_value(RawValue::Text("2023-04-15".to_string()))
            .unwrap();
        seen.finalize().unwrap();

        vec![id, seen]
    }

    #[test]
    fn report_captures_types_patterns_and_row_count() {
        let report = ProbeReport::from_columns(&probe_columns());
        assert_eq!(report.rows, 1);
        assert_eq!(report.columns[0].datatype, DataType::Integer);
        assert_eq!(report.columns[0].pattern, None);
        assert_eq!(report.columns[1].datatype, DataType::Date);
        assert_eq!(report.columns[1].pattern.as_deref(), Some("%Y-%m-%d"));
        assert_eq!(report.columns[1].max_width, 10);
    }

    #[test]
    fn report_round_trips_through_yaml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("probe.yml");
        let report = ProbeReport::from_columns(&probe_columns());
        report.save(&path).expect("save report");

        let loaded = ProbeReport::load(&path).expect("load report");
        assert_eq!(loaded.rows, report.rows);
        assert_eq!(loaded.columns.len(), 2);
        assert_eq!(loaded.columns[1].datatype, DataType::Date);
        assert_eq!(loaded.columns[1].pattern.as_deref(), Some("%Y-%m-%d"));
    }

    #[test]
    fn rendering_aligns_and_handles_unnamed_columns() {
        let mut unnamed = Column::new(None);
        unnamed
            .process_value(RawValue::Text("7".to_string()))
            .unwrap();
        unnamed.finalize().unwrap();

        let report = ProbeReport::from_columns(&[unnamed]);
        let rendered = report.render();
        assert!(rendered.contains("(column 1)"));
        assert!(rendered.contains("integer"));

        let empty = ProbeReport::from_columns(&[]);
        assert_eq!(empty.render(), "No columns inferred.\n");
    }
}
