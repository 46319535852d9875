//! Resolution of the department → batch → section → semester → date selection into the
//! parameters the attendance service expects.

use chrono::{Datelike, Days, NaiveDate};

use crate::error::{Error, Result};
use crate::models::{Batch, Id, Section};

/// The highest semester a programme runs.
pub const MAX_SEMESTER: u8 = 8;

/// Returns the Monday of the ISO week containing `date`. A Sunday belongs to the week that
/// started six days earlier.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    let since_monday = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(since_monday)).unwrap_or(date)
}

/// Parameters of a week-grid fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekQuery {
    pub section_id: Id,
    /// Always a Monday.
    pub week_start: NaiveDate,
    pub semester: u8,
}

/// Parameters of a daily-overview fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayQuery {
    pub section_id: Id,
    pub date: NaiveDate,
    pub semester: u8,
}

/// The cascading selection shared by every screen. Changing a parent clears its children so a
/// stale section can never outlive the batch it belonged to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSelection {
    department: Option<Id>,
    batch: Option<Id>,
    section: Option<Id>,
    semester: Option<u8>,
    date: Option<NaiveDate>,
}

impl Default for FilterSelection {
    fn default() -> Self {
        Self {
            department: None,
            batch: None,
            section: None,
            semester: Some(1),
            date: None,
        }
    }
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn department(&self) -> Option<Id> {
        self.department
    }

    pub fn batch(&self) -> Option<Id> {
        self.batch
    }

    pub fn section(&self) -> Option<Id> {
        self.section
    }

    pub fn semester(&self) -> Option<u8> {
        self.semester
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn select_department(&mut self, department: Option<Id>) {
        if self.department != department {
            self.batch = None;
            self.section = None;
        }
        self.department = department;
    }

    pub fn select_batch(&mut self, batch: Option<Id>) {
        if self.batch != batch {
            self.section = None;
        }
        self.batch = batch;
    }

    pub fn select_section(&mut self, section: Option<Id>) {
        self.section = section;
    }

    pub fn select_semester(&mut self, semester: Option<u8>) {
        self.semester = semester;
    }

    pub fn select_date(&mut self, date: Option<NaiveDate>) {
        self.date = date;
    }

    /// Builder-style shorthand used by the command line, where every level arrives at once.
    pub fn with_section(mut self, section: Id) -> Self {
        self.section = Some(section);
        self
    }

    pub fn with_semester(mut self, semester: u8) -> Self {
        self.semester = Some(semester);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Only a section is needed to list a roster.
    pub fn resolve_section(&self) -> Result<Id> {
        self.section
            .ok_or_else(|| Error::validation("select a department, batch and section first"))
    }

    fn resolve_common(&self) -> Result<(Id, NaiveDate, u8)> {
        let (Some(section), Some(semester), Some(date)) = (self.section, self.semester, self.date)
        else {
            return Err(Error::validation("please select section, semester, and date"));
        };

        if !(1..=MAX_SEMESTER).contains(&semester) {
            return Err(Error::validation(format!(
                "semester must be between 1 and {MAX_SEMESTER}, got {semester}"
            )));
        }

        Ok((section, date, semester))
    }

    /// Resolves the selection into a week-grid query, normalising the date to its Monday.
    pub fn resolve_week(&self) -> Result<WeekQuery> {
        let (section_id, date, semester) = self.resolve_common()?;

        Ok(WeekQuery {
            section_id,
            week_start: monday_of(date),
            semester,
        })
    }

    /// Resolves the selection into a daily-overview query. The date is used as given.
    pub fn resolve_day(&self) -> Result<DayQuery> {
        let (section_id, date, semester) = self.resolve_common()?;

        Ok(DayQuery {
            section_id,
            date,
            semester,
        })
    }
}

/// The batches belonging to a department, out of the unfiltered list the service returns.
pub fn batches_of(batches: &[Batch], department: Id) -> Vec<Batch> {
    batches
        .iter()
        .filter(|b| b.dept_id == department)
        .cloned()
        .collect()
}

/// The sections belonging to a batch, out of the unfiltered list the service returns.
pub fn sections_of(sections: &[Section], batch: Id) -> Vec<Section> {
    sections
        .iter()
        .filter(|s| s.batch_id == batch)
        .cloned()
        .collect()
}
