//! The per-column type and format inference engine.
//!
//! One [`Column`] instance owns one source column. [`Column::process_value`]
//! consumes raw cells in row order: the first non-absent value commits the
//! column's data type exactly once, temporal columns then narrow their parse
//! pattern sample by sample, and values seen before the pattern stabilized are
//! buffered. [`Column::finalize`] sweeps those buffered values through the
//! same conversion routine once the pattern is known, or fails hard when no
//! pattern ever emerged.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;
use thiserror::Error;

use crate::{
    data::Value,
    normalize,
    pattern::{DateSlots, TimeFormatBuilder, chrono_format},
};

/// Fatal inference failures. Both kinds mean the heuristic could not produce
/// a safe answer; continuing would silently yield wrong data.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// A value does not parse under the type or pattern the column committed
    /// to. The commitment was wrong for this value; there is no per-row
    /// recovery.
    #[error("column '{column}': value '{value}' does not parse as {expected}")]
    ConversionFailure {
        column: String,
        value: String,
        expected: String,
    },
    /// Input ended while values were still buffered and no parse pattern was
    /// ever committed. There is no best-guess output for such a column.
    #[error("column '{column}': no parse format could be inferred from the data")]
    UnresolvedFormat { column: String },
}

/// The data type a column commits to on its first non-absent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Integer,
    Float,
    String,
    Date,
    Time,
    DateTime,
    Unknown,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::DateTime => "datetime",
            DataType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A raw scalar handed to the engine by a reader. Delimited text always
/// arrives as `Text`; the native variants come from workbook cells.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Absent,
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Absent => Ok(()),
            RawValue::Text(s) => write!(f, "{s}"),
            RawValue::Integer(i) => write!(f, "{i}"),
            RawValue::Float(v) => write!(f, "{v}"),
            RawValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            RawValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            RawValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// One output slot, index-aligned with the input stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// A missing or sentinel-mapped input; passes through every stage as-is.
    Absent,
    /// A normalized raw string buffered until the column's pattern resolves.
    Pending(String),
    /// A converted value.
    Converted(Value),
}

impl Cell {
    pub fn is_absent(&self) -> bool {
        matches!(self, Cell::Absent)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Cell::Converted(value) => Some(value),
            _ => None,
        }
    }

    /// Rendering used when writing converted output.
    pub fn display_string(&self) -> String {
        match self {
            Cell::Absent => String::new(),
            Cell::Pending(raw) => raw.clone(),
            Cell::Converted(value) => value.as_display(),
        }
    }
}

/// Conversion capability selected once at type-commit time and never
/// re-dispatched per value. Both the immediate path and the deferred fix-up
/// sweep run through [`Converter::convert`].
///
/// Temporal variants carry `None` when the column was typed from a native
/// workbook value: natives convert directly, and text arriving later has no
/// pattern to parse under.
#[derive(Debug, Clone, PartialEq)]
enum Converter {
    Integer,
    Float,
    Text,
    Date(Option<String>),
    Time(Option<String>),
    DateTime(Option<String>),
}

impl Converter {
    fn for_type(data_type: DataType, pattern: Option<String>) -> Self {
        match data_type {
            DataType::Integer => Converter::Integer,
            DataType::Float => Converter::Float,
            DataType::Date => Converter::Date(pattern),
            DataType::Time => Converter::Time(pattern),
            DataType::DateTime => Converter::DateTime(pattern),
            DataType::String | DataType::Unknown => Converter::Text,
        }
    }

    fn pattern(&self) -> Option<&str> {
        match self {
            Converter::Date(pattern)
            | Converter::Time(pattern)
            | Converter::DateTime(pattern) => pattern.as_deref(),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Converter::Integer => "integer".to_string(),
            Converter::Float => "float".to_string(),
            Converter::Text => "string".to_string(),
            Converter::Date(pattern) => describe_temporal("date", pattern.as_deref()),
            Converter::Time(pattern) => describe_temporal("time", pattern.as_deref()),
            Converter::DateTime(pattern) => describe_temporal("datetime", pattern.as_deref()),
        }
    }

    fn convert(&self, raw: &RawValue) -> Option<Value> {
        match (self, raw) {
            (Converter::Integer, RawValue::Integer(i)) => Some(Value::Integer(*i)),
            (Converter::Integer, RawValue::Float(f)) => {
                (f.fract() == 0.0).then(|| Value::Integer(*f as i64))
            }
            (Converter::Integer, RawValue::Text(s)) => s.parse().ok().map(Value::Integer),

            (Converter::Float, RawValue::Float(f)) => Some(Value::Float(*f)),
            (Converter::Float, RawValue::Integer(i)) => Some(Value::Float(*i as f64)),
            (Converter::Float, RawValue::Text(s)) => s.parse().ok().map(Value::Float),

            (Converter::Text, other) => Some(Value::String(other.to_string())),

            (Converter::Date(_), RawValue::Date(d)) => Some(Value::Date(*d)),
            (Converter::Date(Some(pattern)), RawValue::Text(s)) => {
                NaiveDate::parse_from_str(s, &chrono_format(pattern))
                    .ok()
                    .map(Value::Date)
            }

            (Converter::Time(_), RawValue::Time(t)) => Some(Value::Time(*t)),
            (Converter::Time(Some(pattern)), RawValue::Text(s)) => {
                NaiveTime::parse_from_str(s, &chrono_format(pattern))
                    .ok()
                    .map(Value::Time)
            }

            (Converter::DateTime(_), RawValue::DateTime(dt)) => Some(Value::DateTime(*dt)),
            (Converter::DateTime(Some(pattern)), RawValue::Text(s)) => {
                NaiveDateTime::parse_from_str(s, &chrono_format(pattern))
                    .ok()
                    .map(Value::DateTime)
            }

            _ => None,
        }
    }
}

fn describe_temporal(kind: &str, pattern: Option<&str>) -> String {
    match pattern {
        Some(pattern) => format!("{kind} (pattern {pattern})"),
        None => format!("{kind} (native)"),
    }
}

/// Pattern-narrowing state for an unresolved temporal column. Date columns
/// use the slots, time columns the builder, date-time columns both; each half
/// freezes independently and the column resolves when its type's halves have
/// all committed.
#[derive(Debug, Clone)]
struct Narrowing {
    date: DateSlots,
    time: TimeFormatBuilder,
    date_pattern: Option<String>,
    time_pattern: Option<String>,
}

impl Narrowing {
    fn new() -> Self {
        Self {
            date: DateSlots::new(),
            time: TimeFormatBuilder::new(),
            date_pattern: None,
            time_pattern: None,
        }
    }
}

#[derive(Debug, Clone)]
enum FormatState {
    Unresolved(Narrowing),
    Resolved(Converter),
}

/// The per-column inference state machine. Exclusively owned by its
/// row-iteration driver; calls must observe row order.
#[derive(Debug, Clone)]
pub struct Column {
    name: Option<String>,
    extra_absent_tokens: Vec<String>,
    data_type: Option<DataType>,
    values: Vec<Cell>,
    pending_raw: usize,
    state: FormatState,
    max_char_len: usize,
}

impl Column {
    pub fn new(name: Option<String>) -> Self {
        Self::with_absent_tokens(name, Vec::new())
    }

    /// Construction with additional sentinel strings appended to the default
    /// absent-token set.
    pub fn with_absent_tokens(name: Option<String>, extra_absent_tokens: Vec<String>) -> Self {
        Self {
            name,
            extra_absent_tokens,
            data_type: None,
            values: Vec::new(),
            pending_raw: 0,
            state: FormatState::Unresolved(Narrowing::new()),
            max_char_len: 0,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The committed data type; `Unknown` until a non-absent value arrives.
    pub fn data_type(&self) -> DataType {
        self.data_type.unwrap_or(DataType::Unknown)
    }

    /// Converted output, one entry per `process_value` call, in input order.
    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    /// Count of buffered raw entries still awaiting the fix-up pass.
    pub fn pending_raw(&self) -> usize {
        self.pending_raw
    }

    /// The finalized parse pattern for temporal columns.
    pub fn resolved_pattern(&self) -> Option<&str> {
        match &self.state {
            FormatState::Resolved(converter) => converter.pattern(),
            FormatState::Unresolved(_) => None,
        }
    }

    /// Longest non-absent string observed, for downstream column sizing.
    pub fn max_char_len(&self) -> usize {
        self.max_char_len
    }

    fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| "<unnamed>".to_string())
    }

    /// Feeds one raw cell. Absent values pass straight through; the first
    /// concrete value commits the data type; temporal values narrow the
    /// pattern and either convert immediately or buffer for the fix-up pass.
    pub fn process_value(&mut self, raw: RawValue) -> Result<(), InferenceError> {
        let Some(raw) = self.strip(raw) else {
            self.values.push(Cell::Absent);
            return Ok(());
        };

        if self.data_type.is_none() {
            self.commit_type(&raw);
        }
        let raw = self.canonicalize(raw);
        if let RawValue::Text(text) = &raw
            && matches!(self.state, FormatState::Unresolved(_))
        {
            self.narrow(text);
        }

        match &self.state {
            FormatState::Resolved(converter) => {
                let converted = converter
                    .convert(&raw)
                    .ok_or_else(|| self.conversion_failure(&raw))?;
                self.values.push(Cell::Converted(converted));
            }
            FormatState::Unresolved(_) => match raw {
                RawValue::Text(text) => {
                    self.values.push(Cell::Pending(text));
                    self.pending_raw += 1;
                }
                native => {
                    // A native workbook value in a column still narrowing its
                    // text pattern converts without one.
                    let converter = Converter::for_type(self.data_type(), None);
                    let converted = converter
                        .convert(&native)
                        .ok_or_else(|| self.conversion_failure(&native))?;
                    self.values.push(Cell::Converted(converted));
                }
            },
        }
        Ok(())
    }

    /// Finalizes the column after the last `process_value` call: converts
    /// every buffered raw entry with the now-final pattern, reproducing
    /// exactly the value the immediate path would have produced. Fails when
    /// values are still buffered and no pattern was ever committed.
    pub fn finalize(&mut self) -> Result<(), InferenceError> {
        if self.pending_raw == 0 {
            return Ok(());
        }
        let converter = match &self.state {
            FormatState::Resolved(converter) => converter.clone(),
            FormatState::Unresolved(_) => {
                return Err(InferenceError::UnresolvedFormat {
                    column: self.label(),
                });
            }
        };
        for idx in 0..self.values.len() {
            if self.pending_raw == 0 {
                break;
            }
            if let Cell::Pending(text) = &self.values[idx] {
                let raw = RawValue::Text(text.clone());
                let converted = converter
                    .convert(&raw)
                    .ok_or_else(|| self.conversion_failure(&raw))?;
                self.values[idx] = Cell::Converted(converted);
                self.pending_raw -= 1;
            }
        }
        Ok(())
    }

    fn strip(&mut self, raw: RawValue) -> Option<RawValue> {
        match raw {
            RawValue::Absent => None,
            RawValue::Text(text) => {
                let stripped = normalize::strip_text(&text, &self.extra_absent_tokens)?;
                self.max_char_len = self.max_char_len.max(stripped.chars().count());
                Some(RawValue::Text(stripped))
            }
            other => Some(other),
        }
    }

    fn commit_type(&mut self, raw: &RawValue) {
        let (data_type, converter) = match raw {
            RawValue::Integer(_) => (DataType::Integer, Some(Converter::Integer)),
            RawValue::Float(f) => {
                if f.fract() == 0.0 {
                    (DataType::Integer, Some(Converter::Integer))
                } else {
                    (DataType::Float, Some(Converter::Float))
                }
            }
            RawValue::Date(_) => (DataType::Date, Some(Converter::Date(None))),
            RawValue::Time(_) => (DataType::Time, Some(Converter::Time(None))),
            RawValue::DateTime(_) => (DataType::DateTime, Some(Converter::DateTime(None))),
            RawValue::Text(text) => classify_text(text),
            RawValue::Absent => return,
        };
        debug!("column '{}' committed to {}", self.label(), data_type);
        self.data_type = Some(data_type);
        if let Some(converter) = converter {
            self.state = FormatState::Resolved(converter);
        }
    }

    fn canonicalize(&self, raw: RawValue) -> RawValue {
        match raw {
            RawValue::Text(text) => {
                let canonical = match self.data_type() {
                    DataType::Date => normalize::canonicalize_date(&text),
                    DataType::Time => normalize::canonicalize_time(&text),
                    DataType::DateTime => normalize::canonicalize_datetime(&text),
                    _ => text,
                };
                RawValue::Text(canonical)
            }
            other => other,
        }
    }

    fn narrow(&mut self, value: &str) {
        let data_type = self.data_type();
        let FormatState::Unresolved(narrowing) = &mut self.state else {
            return;
        };
        match data_type {
            DataType::Date | DataType::DateTime => {
                if narrowing.date_pattern.is_none()
                    && let Some(token) = normalize::date_token(value)
                {
                    narrowing.date_pattern = narrowing.date.observe(token);
                }
            }
            _ => {}
        }
        match data_type {
            DataType::Time | DataType::DateTime => {
                if narrowing.time_pattern.is_none()
                    && let Some((token, meridiem)) = normalize::time_token(value)
                {
                    narrowing.time_pattern = narrowing.time.observe(token, meridiem);
                }
            }
            _ => {}
        }

        let pattern = match data_type {
            DataType::Date => narrowing.date_pattern.clone(),
            DataType::Time => narrowing.time_pattern.clone(),
            DataType::DateTime => match (&narrowing.date_pattern, &narrowing.time_pattern) {
                (Some(date), Some(time)) => Some(format!("{date} {time}")),
                _ => None,
            },
            _ => None,
        };
        if let Some(pattern) = pattern {
            debug!(
                "column '{}' resolved {} pattern '{}'",
                self.label(),
                data_type,
                pattern
            );
            self.state = FormatState::Resolved(Converter::for_type(data_type, Some(pattern)));
        }
    }

    fn conversion_failure(&self, raw: &RawValue) -> InferenceError {
        let expected = match &self.state {
            FormatState::Resolved(converter) => converter.describe(),
            FormatState::Unresolved(_) => self.data_type().to_string(),
        };
        InferenceError::ConversionFailure {
            column: self.label(),
            value: raw.to_string(),
            expected,
        }
    }
}

/// Derives the type of a column from its first concrete text value.
fn classify_text(text: &str) -> (DataType, Option<Converter>) {
    if text.parse::<i64>().is_ok() {
        return (DataType::Integer, Some(Converter::Integer));
    }
    if let Ok(parsed) = text.parse::<f64>()
        && parsed.is_finite()
        && parsed.fract() != 0.0
    {
        return (DataType::Float, Some(Converter::Float));
    }
    let has_time = normalize::has_time_shape(text);
    let has_date = normalize::has_date_shape(text);
    match (has_date, has_time) {
        (true, true) => (DataType::DateTime, None),
        (true, false) => (DataType::Date, None),
        (false, true) => (DataType::Time, None),
        (false, false) => (DataType::String, Some(Converter::Text)),
    }
}
