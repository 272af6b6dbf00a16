//! XLSX workbook reading via calamine.
//!
//! The worksheet range is loaded whole and handed to the ingest driver row by
//! row. Native cell values keep their types on the way into the engine:
//! serial date-times split into date, time, or date-time raw values by their
//! serial magnitude, booleans pass through as text (the engine's type
//! vocabulary has no boolean), and error cells count as absent.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use calamine::{Data, DataType as _, Range, Reader, Xlsx, open_workbook};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;

use crate::column::RawValue;

/// Loads the named worksheet, or the first one when no name is given.
pub fn read_range(path: &Path, sheet: Option<&str>) -> Result<Range<Data>> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).with_context(|| format!("Opening workbook {path:?}"))?;
    let index = match sheet {
        Some(name) => workbook
            .sheet_names()
            .iter()
            .position(|candidate| candidate == name)
            .ok_or_else(|| anyhow!("Worksheet '{name}' not found in {path:?}"))?,
        None => 0,
    };
    workbook
        .worksheet_range_at(index)
        .ok_or_else(|| anyhow!("Workbook {path:?} has no worksheets"))?
        .with_context(|| format!("Reading worksheet range from {path:?}"))
}

/// Maps one workbook cell to the engine's raw-value vocabulary.
pub fn cell_to_raw(cell: &Data) -> RawValue {
    match cell {
        Data::Empty => RawValue::Absent,
        Data::Int(i) => RawValue::Integer(*i),
        Data::Float(f) => RawValue::Float(*f),
        Data::String(s) => RawValue::Text(s.clone()),
        Data::Bool(b) => RawValue::Text(if *b { "true" } else { "false" }.to_string()),
        Data::DateTime(serial) => {
            let value = serial.as_f64();
            let mapped = if value < 1.0 {
                cell.as_time().map(RawValue::Time)
            } else if value.fract() == 0.0 {
                cell.as_date().map(RawValue::Date)
            } else {
                cell.as_datetime().map(RawValue::DateTime)
            };
            mapped.unwrap_or(RawValue::Absent)
        }
        Data::DateTimeIso(s) => parse_iso_temporal(s),
        Data::DurationIso(s) => RawValue::Text(s.clone()),
        Data::Error(err) => {
            debug!("treating workbook error cell {err:?} as absent");
            RawValue::Absent
        }
    }
}

/// Header labels come from whatever the first row holds, rendered as text.
pub fn cell_label(cell: &Data) -> String {
    cell.as_string().unwrap_or_else(|| cell.to_string())
}

fn parse_iso_temporal(value: &str) -> RawValue {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return RawValue::DateTime(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return RawValue::Date(date);
    }
    if let Ok(time) = NaiveTime::parse_from_str(value, "%H:%M:%S%.f") {
        return RawValue::Time(time);
    }
    RawValue::Text(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_cells_keep_their_native_types() {
        assert_eq!(cell_to_raw(&Data::Empty), RawValue::Absent);
        assert_eq!(cell_to_raw(&Data::Int(7)), RawValue::Integer(7));
        assert_eq!(cell_to_raw(&Data::Float(2.5)), RawValue::Float(2.5));
        assert_eq!(
            cell_to_raw(&Data::String("abc".to_string())),
            RawValue::Text("abc".to_string())
        );
        assert_eq!(
            cell_to_raw(&Data::Bool(true)),
            RawValue::Text("true".to_string())
        );
    }

    #[test]
    fn iso_strings_parse_into_native_temporals() {
        assert_eq!(
            parse_iso_temporal("2024-05-06T14:30:00"),
            RawValue::DateTime(
                NaiveDate::from_ymd_opt(2024, 5, 6)
                    .unwrap()
                    .and_hms_opt(14, 30, 0)
                    .unwrap()
            )
        );
        assert_eq!(
            parse_iso_temporal("2024-05-06"),
            RawValue::Date(NaiveDate::from_ymd_opt(2024, 5, 6).unwrap())
        );
        assert_eq!(
            parse_iso_temporal("14:30:00"),
            RawValue::Time(NaiveTime::from_hms_opt(14, 30, 0).unwrap())
        );
        assert_eq!(
            parse_iso_temporal("not a timestamp"),
            RawValue::Text("not a timestamp".to_string())
        );
    }
}
