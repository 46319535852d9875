//! Domain types for timetables, attendance sessions and student rosters, plus the row shapes the
//! attendance service sends over the wire.

use chrono::{Datelike, Days, NaiveDate};
use diesel::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;
use thiserror::Error;

use crate::error::{Error, Result};
use crate::schema;

/// Identifier assigned by the attendance service (or the local store).
pub type Id = i64;

/// The number of teaching periods in a day.
pub const PERIODS_PER_DAY: u8 = 9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown weekday {0:?}")]
pub struct ParseWeekdayError(String);

/// A teaching day. Weekends never carry timetable slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    /// Days since the Monday of the same week.
    pub fn offset(self) -> u64 {
        match self {
            Weekday::Mon => 0,
            Weekday::Tue => 1,
            Weekday::Wed => 2,
            Weekday::Thu => 3,
            Weekday::Fri => 4,
        }
    }

    /// The three-letter code the attendance service uses.
    pub fn code(self) -> &'static str {
        match self {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
        }
    }

    /// The teaching day a calendar date falls on, or `None` on weekends.
    pub fn of(date: NaiveDate) -> Option<Self> {
        match date.weekday() {
            chrono::Weekday::Mon => Some(Weekday::Mon),
            chrono::Weekday::Tue => Some(Weekday::Tue),
            chrono::Weekday::Wed => Some(Weekday::Wed),
            chrono::Weekday::Thu => Some(Weekday::Thu),
            chrono::Weekday::Fri => Some(Weekday::Fri),
            chrono::Weekday::Sat | chrono::Weekday::Sun => None,
        }
    }

    /// The calendar date of this day in the week starting at `week_start`.
    pub fn date_in_week(self, week_start: NaiveDate) -> NaiveDate {
        week_start
            .checked_add_days(Days::new(self.offset()))
            .unwrap_or(week_start)
    }
}

impl FromStr for Weekday {
    type Err = ParseWeekdayError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mon" | "monday" => Ok(Weekday::Mon),
            "tue" | "tuesday" => Ok(Weekday::Tue),
            "wed" | "wednesday" => Ok(Weekday::Wed),
            "thu" | "thursday" => Ok(Weekday::Thu),
            "fri" | "friday" => Ok(Weekday::Fri),
            _ => Err(ParseWeekdayError(s.to_string())),
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A period number, always within `1..=PERIODS_PER_DAY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period(u8);

impl Period {
    pub fn new(number: i64) -> Option<Self> {
        u8::try_from(number)
            .ok()
            .filter(|n| (1..=PERIODS_PER_DAY).contains(n))
            .map(Period)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every period of a day, in order.
    pub fn all() -> impl Iterator<Item = Period> {
        (1..=PERIODS_PER_DAY).map(Period)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown session category {0:?}")]
pub struct ParseCategoryError(String);

/// How a session was actually held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionCategory {
    /// The scheduled course was taught.
    Normal,
    /// A different course was taught in this slot.
    Swap,
    /// The period was declared free; nobody takes attendance.
    Free,
}

impl SessionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionCategory::Normal => "normal",
            SessionCategory::Swap => "swap",
            SessionCategory::Free => "free",
        }
    }
}

impl FromStr for SessionCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(SessionCategory::Normal),
            "swap" => Ok(SessionCategory::Swap),
            "free" => Ok(SessionCategory::Free),
            _ => Err(ParseCategoryError(s.to_string())),
        }
    }
}

impl fmt::Display for SessionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A course as it appears on a timetable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Course {
    pub code: String,
    pub name: String,
}

impl Course {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }

    /// Builds a course from the optional code/name pair the service sends, `None` if both are
    /// missing or blank.
    pub fn from_parts(code: Option<&str>, name: Option<&str>) -> Option<Self> {
        let code = code.map(str::trim).unwrap_or_default();
        let name = name.map(str::trim).unwrap_or_default();
        if code.is_empty() && name.is_empty() {
            None
        } else {
            Some(Self::new(code, name))
        }
    }

    /// The course name, falling back to the code.
    pub fn title(&self) -> &str {
        if self.name.is_empty() {
            &self.code
        } else {
            &self.name
        }
    }

    /// The course code, falling back to the name.
    pub fn short(&self) -> &str {
        if self.code.is_empty() {
            &self.name
        } else {
            &self.code
        }
    }
}

/// A fixed weekly teaching assignment of a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableSlot {
    pub day: Weekday,
    pub period: Period,
    pub course: Course,
    pub faculty_name: String,
    pub room_info: Option<String>,
}

/// One realised instance of a slot on a calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceSession {
    pub id: Id,
    pub date: NaiveDate,
    pub day: Weekday,
    pub period: Period,
    pub category: SessionCategory,
    pub scheduled: Course,
    /// Only meaningful when `category` is [`SessionCategory::Swap`].
    pub actual: Option<Course>,
    pub faculty_name: String,
    pub verified: bool,
}

/// One student's status within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub roll_number: String,
    pub full_name: String,
    /// Empty when the service sends no status, which counts as absent.
    #[serde(default, deserialize_with = "status_or_empty")]
    pub status: String,
}

fn status_or_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl AttendanceRecord {
    /// Case-insensitive match against "present". Any other status counts as absent.
    pub fn is_present(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("present")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Tabled)]
#[diesel(table_name = schema::departments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Department {
    #[tabled(rename = "ID")]
    pub id: Id,
    #[tabled(rename = "Code")]
    pub dept_code: String,
    #[tabled(rename = "Name")]
    pub dept_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Tabled)]
#[diesel(table_name = schema::batches)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Batch {
    #[tabled(rename = "ID")]
    pub id: Id,
    #[tabled(rename = "Department")]
    pub dept_id: Id,
    #[tabled(rename = "Batch")]
    pub batch_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Tabled)]
#[diesel(table_name = schema::sections)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Section {
    #[tabled(rename = "ID")]
    pub id: Id,
    #[tabled(rename = "Batch")]
    pub batch_id: Id,
    #[tabled(rename = "Section")]
    pub section_name: String,
}

/// A timetable slot merged with the session held for it in the requested week, as returned by
/// the week-grid endpoint. Day and period are kept raw here and validated during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeekGridRow {
    pub day: String,
    pub slot_number: i64,
    /// Identifies the slot for [`crate::service::AttendanceService::sessions_by_timetable`].
    #[serde(default)]
    pub timetable_id: Option<Id>,
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub faculty_name: Option<String>,
    #[serde(default)]
    pub room_info: Option<String>,
    #[serde(default)]
    pub session_id: Option<Id>,
    #[serde(default)]
    pub session_category: Option<String>,
    #[serde(default)]
    pub actual_course_code: Option<String>,
    #[serde(default)]
    pub actual_course_name: Option<String>,
    #[serde(default)]
    pub is_verified_by_faculty: Option<bool>,
}

/// A session held for one timetable slot, as listed in the slot's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSession {
    pub id: Id,
    #[serde(deserialize_with = "calendar_date")]
    pub session_date: NaiveDate,
    #[serde(default, alias = "session_category")]
    pub category: Option<String>,
    #[serde(default)]
    pub actual_course_code: Option<String>,
    #[serde(default)]
    pub actual_course_name: Option<String>,
    #[serde(default)]
    pub marked_by: Option<String>,
    #[serde(default)]
    pub is_verified_by_faculty: Option<bool>,
}

impl SlotSession {
    pub fn category(&self) -> Option<SessionCategory> {
        self.category.as_deref()?.parse().ok()
    }

    pub fn is_verified(&self) -> bool {
        self.is_verified_by_faculty.unwrap_or(false)
    }
}

/// Accepts a plain `YYYY-MM-DD` date or a timestamp starting with one.
fn calendar_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let day = raw.get(..10).unwrap_or(&raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(serde::de::Error::custom)
}

/// A per-period row of the daily overview, with counts already aggregated by the service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DailyOverviewRow {
    pub slot_number: i64,
    #[serde(default)]
    pub scheduled_course_name: Option<String>,
    #[serde(default)]
    pub actual_course_code: Option<String>,
    #[serde(default)]
    pub actual_course_name: Option<String>,
    #[serde(default)]
    pub faculty_name: Option<String>,
    #[serde(default)]
    pub session_category: Option<String>,
    #[serde(default)]
    pub session_id: Option<Id>,
    #[serde(default)]
    pub present_count: Option<i64>,
    #[serde(default)]
    pub absent_count: Option<i64>,
    #[serde(default)]
    pub total_count: Option<i64>,
    #[serde(default)]
    pub is_verified_by_faculty: Option<bool>,
}

impl DailyOverviewRow {
    /// The session category, `None` when the period has not been marked (or the category is not
    /// one this client knows).
    pub fn category(&self) -> Option<SessionCategory> {
        self.session_category.as_deref()?.parse().ok()
    }

    /// The course that was actually taught: the swapped-in course for swaps, the scheduled one
    /// otherwise.
    pub fn display_course(&self) -> &str {
        let scheduled = self.scheduled_course_name.as_deref().unwrap_or_default();
        if self.category() == Some(SessionCategory::Swap) {
            self.actual_course_name
                .as_deref()
                .or(self.actual_course_code.as_deref())
                .unwrap_or(scheduled)
        } else {
            scheduled
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: Id,
    pub roll_number: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub section_id: Option<Id>,
}

/// The payload used to create or update a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentForm {
    pub roll: String,
    pub name: String,
    pub email: Option<String>,
    pub section_id: Id,
}

impl StudentForm {
    /// Trims every field and rejects forms without a roll number or name.
    pub fn normalized(self) -> Result<Self> {
        let roll = self.roll.trim().to_string();
        let name = self.name.trim().to_string();
        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        if roll.is_empty() {
            return Err(Error::validation("a student needs a roll number"));
        }
        if name.is_empty() {
            return Err(Error::validation("a student needs a name"));
        }

        Ok(Self {
            roll,
            name,
            email,
            section_id: self.section_id,
        })
    }
}
