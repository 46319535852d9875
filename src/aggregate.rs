//! Attendance statistics for a session, and per-student tallies across several sessions.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::models::AttendanceRecord;

/// Attendance below this percentage is flagged.
pub const DEFAULT_LOW_THRESHOLD: f64 = 75.0;

/// A percentage rounded to one decimal, or the absence of data.
///
/// `NoData` is distinct from `Value(0.0)`: a session with an empty roster has no attendance, not
/// zero attendance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Percentage {
    NoData,
    Value(f64),
}

impl Percentage {
    /// `present / total * 100`, rounded to one decimal.
    pub fn from_counts(present: usize, total: usize) -> Self {
        if total == 0 {
            return Percentage::NoData;
        }
        let permille = present as f64 * 1000.0 / total as f64;
        Percentage::Value(permille.round() / 10.0)
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Percentage::NoData => None,
            Percentage::Value(v) => Some(v),
        }
    }

    /// Classifies the percentage against `threshold`. There is no level without data.
    pub fn level(self, threshold: f64) -> Option<AttendanceLevel> {
        self.value().map(|v| {
            if v < threshold {
                AttendanceLevel::Low
            } else {
                AttendanceLevel::Acceptable
            }
        })
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Percentage::NoData => f.write_str("-"),
            Percentage::Value(v) => write!(f, "{v:.1}%"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttendanceLevel {
    Low,
    Acceptable,
}

impl fmt::Display for AttendanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceLevel::Low => f.write_str("LOW"),
            AttendanceLevel::Acceptable => f.write_str("OK"),
        }
    }
}

/// The outcome of one session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub present: usize,
    pub absent: usize,
    pub total: usize,
    pub percentage: Percentage,
}

impl AttendanceSummary {
    pub fn level(&self, threshold: f64) -> Option<AttendanceLevel> {
        self.percentage.level(threshold)
    }
}

/// Summarises the records of one session. Absent is always `total - present`.
pub fn summarize(records: &[AttendanceRecord]) -> AttendanceSummary {
    let total = records.len();
    let present = records.iter().filter(|r| r.is_present()).count();

    AttendanceSummary {
        present,
        absent: total - present,
        total,
        percentage: Percentage::from_counts(present, total),
    }
}

/// A student's attendance over a set of sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentTally {
    pub roll_number: String,
    pub full_name: String,
    pub attended: usize,
    pub held: usize,
}

impl StudentTally {
    pub fn percentage(&self) -> Percentage {
        Percentage::from_counts(self.attended, self.held)
    }

    /// Case-insensitive substring match on roll number or name. An empty query matches everyone.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.roll_number.to_lowercase().contains(&query)
            || self.full_name.to_lowercase().contains(&query)
    }
}

/// Tallies every student appearing in the records of several sessions, ordered by roll number.
pub fn tally<'a, I>(sessions: I) -> Vec<StudentTally>
where
    I: IntoIterator<Item = &'a [AttendanceRecord]>,
{
    let mut tallies: BTreeMap<String, StudentTally> = BTreeMap::new();

    for records in sessions {
        for record in records {
            let entry = tallies
                .entry(record.roll_number.clone())
                .or_insert_with(|| StudentTally {
                    roll_number: record.roll_number.clone(),
                    full_name: record.full_name.clone(),
                    attended: 0,
                    held: 0,
                });
            entry.held += 1;
            if record.is_present() {
                entry.attended += 1;
            }
        }
    }

    tallies.into_values().collect()
}

/// The students whose attendance is below `threshold`.
pub fn defaulters(tallies: &[StudentTally], threshold: f64) -> Vec<&StudentTally> {
    tallies
        .iter()
        .filter(|t| t.percentage().level(threshold) == Some(AttendanceLevel::Low))
        .collect()
}
