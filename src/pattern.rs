//! Date and time pattern narrowing.
//!
//! A time sample usually proves its own hour format: an hour above 12 forces
//! 24-hour, an AM/PM marker forces 12-hour. Date samples are harder: a token
//! like `03-04-05` is ambiguous among day/month/year orderings, so
//! [`DateSlots`] keeps a per-slot set of still-possible roles and prunes it
//! with every sample until each slot holds exactly one role. Narrowing is
//! monotonic: the first sample to prove a constraint wins, and a committed
//! pattern is never revisited.

use itertools::Itertools;

/// Number of ambiguous time samples after which the 12-hour pattern is
/// committed anyway, guaranteeing forward progress on data where no hour ever
/// exceeds 12 and no AM/PM marker appears.
pub const FORCE_FORMAT_SAMPLES: usize = 50;

/// One positional role a date component can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Day,
    Month,
    Year,
}

impl DateField {
    fn token(self, wide_year: bool) -> &'static str {
        match self {
            DateField::Day => "%d",
            DateField::Month => "%m",
            DateField::Year => {
                if wide_year {
                    "%Y"
                } else {
                    "%y"
                }
            }
        }
    }
}

/// Constraint-propagation state for a three-component date token.
///
/// Initial candidate sets come from the component orderings that occur in
/// practice (day-month-year, month-day-year, year-month-day): the middle slot
/// is never a year and the last slot is never a month. Each role occupies
/// exactly one slot, so a slot narrowed to a single role removes that role
/// everywhere else; the removal loop runs to a fixed point. Evidence that
/// empties a slot is contradictory and permanently blocks resolution.
#[derive(Debug, Clone)]
pub struct DateSlots {
    slots: [Vec<DateField>; 3],
    wide_year: [bool; 3],
    contradicted: bool,
}

impl Default for DateSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl DateSlots {
    pub fn new() -> Self {
        Self {
            slots: [
                vec![DateField::Day, DateField::Month, DateField::Year],
                vec![DateField::Day, DateField::Month],
                vec![DateField::Day, DateField::Year],
            ],
            wide_year: [false; 3],
            contradicted: false,
        }
    }

    /// Feeds one canonicalized (dash-separated) date token and returns the
    /// committed pattern once every slot has narrowed to a single role.
    pub fn observe(&mut self, token: &str) -> Option<String> {
        if self.contradicted {
            return None;
        }
        let parts: Vec<&str> = token.split('-').collect();
        if parts.len() != self.slots.len() {
            return None;
        }
        for (idx, part) in parts.iter().enumerate() {
            let Ok(value) = part.parse::<u32>() else {
                return None;
            };
            if part.len() == 4 {
                self.wide_year[idx] = true;
                self.pin(idx, DateField::Year);
            } else if value > 31 {
                self.pin(idx, DateField::Year);
            } else if value > 12 {
                self.slots[idx].retain(|field| *field != DateField::Month);
            }
        }
        self.propagate();
        self.pattern()
    }

    /// True once pruning has removed every candidate from some slot: the
    /// samples admit no consistent day/month/year assignment.
    pub fn is_contradicted(&self) -> bool {
        self.contradicted
    }

    fn pin(&mut self, idx: usize, field: DateField) {
        self.slots[idx].retain(|candidate| *candidate == field);
    }

    fn propagate(&mut self) {
        loop {
            let mut changed = false;
            for idx in 0..self.slots.len() {
                if self.slots[idx].len() != 1 {
                    continue;
                }
                let settled = self.slots[idx][0];
                for other in 0..self.slots.len() {
                    if other == idx {
                        continue;
                    }
                    let before = self.slots[other].len();
                    self.slots[other].retain(|field| *field != settled);
                    changed |= self.slots[other].len() != before;
                }
            }
            if !changed {
                break;
            }
        }
        if self.slots.iter().any(Vec::is_empty) {
            self.contradicted = true;
        }
    }

    fn pattern(&self) -> Option<String> {
        if self.contradicted || self.slots.iter().any(|slot| slot.len() != 1) {
            return None;
        }
        Some(
            self.slots
                .iter()
                .zip(self.wide_year)
                .map(|(slot, wide)| slot[0].token(wide))
                .join("-"),
        )
    }
}

/// Accumulates time samples until the hour format is proven or the forced
/// threshold is reached.
#[derive(Debug, Clone)]
pub struct TimeFormatBuilder {
    samples: usize,
    threshold: usize,
}

impl Default for TimeFormatBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeFormatBuilder {
    pub fn new() -> Self {
        Self {
            samples: 0,
            threshold: FORCE_FORMAT_SAMPLES,
        }
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Feeds one canonicalized (colon-separated) time token. Returns the
    /// committed pattern when evidence proves the hour format, or when the
    /// sample threshold forces the 12-hour default.
    pub fn observe(&mut self, token: &str, meridiem: bool) -> Option<String> {
        self.samples += 1;
        let parts: Vec<&str> = token.split(':').collect();
        let hour = parts.first().and_then(|part| part.parse::<u32>().ok())?;

        let twenty_four = hour > 12;
        let mut pattern = String::from(if twenty_four { "%H" } else { "%I" });
        pattern.push_str(":%M");
        if parts.len() > 2 {
            pattern.push_str(":%S");
            if parts[2].contains('.') {
                pattern.push_str("%.f");
            }
        }
        if meridiem {
            pattern.push_str(" %p");
        }

        if twenty_four || meridiem || self.samples >= self.threshold {
            Some(pattern)
        } else {
            None
        }
    }
}

/// Translates a committed pattern into the form chrono can parse with.
///
/// `%I` without an accompanying `%p` cannot materialize a time-of-day in
/// chrono; every hour observed under such a pattern was <= 12, so parsing via
/// `%H` yields the identical clock value. The reported pattern keeps `%I`.
pub fn chrono_format(pattern: &str) -> String {
    if pattern.contains("%I") && !pattern.contains("%p") {
        pattern.replace("%I", "%H")
    } else {
        pattern.to_string()
    }
}
