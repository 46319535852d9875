//! Reconciliation of a section's fixed weekly timetable with the attendance sessions actually held
//! in one week.
//!
//! The result is always a full [`Grid`] of `5 × PERIODS_PER_DAY` cells. Every cell is rebuilt from
//! scratch on each fetch; whether an unmarked slot is overdue depends on `today` and is decided
//! here, never stored.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

use crate::models::{
    AttendanceSession, Course, Id, PERIODS_PER_DAY, Period, SessionCategory, TimetableSlot,
    WeekGridRow, Weekday,
};

/// What a grid coordinate resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellState {
    /// No class is scheduled.
    Empty,
    /// Scheduled for today or later and not marked yet.
    Pending(TimetableSlot),
    /// Scheduled in the past and never marked.
    Unmarked(TimetableSlot),
    /// Declared free. Carries no session id on purpose: there are no records to look up.
    Free { slot: TimetableSlot, verified: bool },
    /// Held as scheduled.
    Normal {
        slot: TimetableSlot,
        session_id: Id,
        verified: bool,
    },
    /// A different course was taught in this slot.
    Swap {
        slot: TimetableSlot,
        session_id: Id,
        scheduled: Course,
        actual: Option<Course>,
        verified: bool,
    },
}

/// One (day, period) coordinate of the week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledCell {
    pub day: Weekday,
    pub period: Period,
    pub date: NaiveDate,
    pub state: CellState,
}

impl ReconciledCell {
    pub fn slot(&self) -> Option<&TimetableSlot> {
        match &self.state {
            CellState::Empty => None,
            CellState::Pending(slot) | CellState::Unmarked(slot) => Some(slot),
            CellState::Free { slot, .. }
            | CellState::Normal { slot, .. }
            | CellState::Swap { slot, .. } => Some(slot),
        }
    }

    /// The session whose records can be fetched for this cell. Only normal and swapped sessions
    /// have one.
    pub fn session_id(&self) -> Option<Id> {
        match &self.state {
            CellState::Normal { session_id, .. } | CellState::Swap { session_id, .. } => {
                Some(*session_id)
            }
            _ => None,
        }
    }

    pub fn category(&self) -> Option<SessionCategory> {
        match &self.state {
            CellState::Free { .. } => Some(SessionCategory::Free),
            CellState::Normal { .. } => Some(SessionCategory::Normal),
            CellState::Swap { .. } => Some(SessionCategory::Swap),
            _ => None,
        }
    }

    /// The subject to show first: the taught course for swaps, the scheduled course otherwise.
    /// Free and empty cells have none.
    pub fn primary_subject(&self) -> Option<&str> {
        match &self.state {
            CellState::Empty | CellState::Free { .. } => None,
            CellState::Swap { actual, .. } => {
                Some(actual.as_ref().map_or("unknown", Course::short))
            }
            CellState::Pending(slot)
            | CellState::Unmarked(slot)
            | CellState::Normal { slot, .. } => Some(slot.course.title()),
        }
    }

    /// The originally scheduled subject of a swap, rendered struck through next to the primary.
    pub fn struck_subject(&self) -> Option<&str> {
        match &self.state {
            CellState::Swap { scheduled, .. } => Some(scheduled.short()),
            _ => None,
        }
    }

    pub fn is_verified(&self) -> bool {
        match &self.state {
            CellState::Free { verified, .. }
            | CellState::Normal { verified, .. }
            | CellState::Swap { verified, .. } => *verified,
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.state, CellState::Empty)
    }
}

/// Inconsistencies in the data the service returned. None of them abort reconciliation; they are
/// logged and kept on the grid so the caller can surface them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityWarning {
    DuplicateSlot {
        day: Weekday,
        period: Period,
    },
    DuplicateSession {
        day: Weekday,
        period: Period,
        kept: Id,
        dropped: Id,
    },
    OrphanSession {
        session_id: Id,
        day: Weekday,
        period: Period,
    },
    SessionOutsideWeek {
        session_id: Id,
        date: NaiveDate,
    },
    InvalidCoordinate {
        day: String,
        period: i64,
    },
    UnknownCategory {
        session_id: Option<Id>,
        category: String,
    },
    SwapWithoutCourse {
        session_id: Id,
    },
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityWarning::DuplicateSlot { day, period } => {
                write!(f, "more than one timetable slot for {day} period {period}")
            }
            IntegrityWarning::DuplicateSession {
                day,
                period,
                kept,
                dropped,
            } => write!(
                f,
                "sessions {kept} and {dropped} both cover {day} period {period}; showing {kept}"
            ),
            IntegrityWarning::OrphanSession {
                session_id,
                day,
                period,
            } => write!(
                f,
                "session {session_id} on {day} period {period} has no timetable slot"
            ),
            IntegrityWarning::SessionOutsideWeek { session_id, date } => {
                write!(f, "session {session_id} is dated {date}, outside this week")
            }
            IntegrityWarning::InvalidCoordinate { day, period } => {
                write!(f, "row for day {day:?} period {period} is outside the grid")
            }
            IntegrityWarning::UnknownCategory {
                session_id,
                category,
            } => match session_id {
                Some(id) => write!(f, "session {id} has unknown category {category:?}"),
                None => write!(f, "unknown session category {category:?}"),
            },
            IntegrityWarning::SwapWithoutCourse { session_id } => {
                write!(f, "swapped session {session_id} does not name the course taught")
            }
        }
    }
}

/// The reconciled week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    week_start: NaiveDate,
    cells: Vec<ReconciledCell>,
    warnings: Vec<IntegrityWarning>,
}

impl Grid {
    pub fn week_start(&self) -> NaiveDate {
        self.week_start
    }

    /// All cells, day by day, each day in period order.
    pub fn cells(&self) -> &[ReconciledCell] {
        &self.cells
    }

    pub fn cell(&self, day: Weekday, period: Period) -> &ReconciledCell {
        let index = day.offset() as usize * usize::from(PERIODS_PER_DAY)
            + usize::from(period.get() - 1);
        &self.cells[index]
    }

    /// The cells of one day, in period order.
    pub fn day(&self, day: Weekday) -> &[ReconciledCell] {
        let start = day.offset() as usize * usize::from(PERIODS_PER_DAY);
        &self.cells[start..start + usize::from(PERIODS_PER_DAY)]
    }

    pub fn warnings(&self) -> &[IntegrityWarning] {
        &self.warnings
    }

    /// Whether no class at all is scheduled this week.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(ReconciledCell::is_empty)
    }

    /// Cells that have records to look up.
    pub fn marked_sessions(&self) -> impl Iterator<Item = &ReconciledCell> {
        self.cells.iter().filter(|c| c.session_id().is_some())
    }
}

fn record(warnings: &mut Vec<IntegrityWarning>, warning: IntegrityWarning) {
    tracing::warn!(%warning, "schedule data inconsistency");
    warnings.push(warning);
}

/// Reconciles the timetable of a section with the sessions recorded in the week starting at
/// `week_start`. Cells dated before `today` without a session are [`CellState::Unmarked`].
pub fn merge_week(
    slots: &[TimetableSlot],
    sessions: &[AttendanceSession],
    week_start: NaiveDate,
    today: NaiveDate,
) -> Grid {
    merge(slots, sessions, week_start, today, Vec::new())
}

fn merge(
    slots: &[TimetableSlot],
    sessions: &[AttendanceSession],
    week_start: NaiveDate,
    today: NaiveDate,
    mut warnings: Vec<IntegrityWarning>,
) -> Grid {
    let mut slot_at: HashMap<(Weekday, Period), &TimetableSlot> = HashMap::new();
    for slot in slots {
        if slot_at.contains_key(&(slot.day, slot.period)) {
            record(
                &mut warnings,
                IntegrityWarning::DuplicateSlot {
                    day: slot.day,
                    period: slot.period,
                },
            );
        } else {
            slot_at.insert((slot.day, slot.period), slot);
        }
    }

    let mut session_at: HashMap<(Weekday, Period), &AttendanceSession> = HashMap::new();
    for session in sessions {
        if session.date != session.day.date_in_week(week_start) {
            record(
                &mut warnings,
                IntegrityWarning::SessionOutsideWeek {
                    session_id: session.id,
                    date: session.date,
                },
            );
            continue;
        }

        let key = (session.day, session.period);
        if let Some(kept) = session_at.get(&key) {
            record(
                &mut warnings,
                IntegrityWarning::DuplicateSession {
                    day: session.day,
                    period: session.period,
                    kept: kept.id,
                    dropped: session.id,
                },
            );
        } else if !slot_at.contains_key(&key) {
            record(
                &mut warnings,
                IntegrityWarning::OrphanSession {
                    session_id: session.id,
                    day: session.day,
                    period: session.period,
                },
            );
        } else {
            session_at.insert(key, session);
        }
    }

    let mut cells = Vec::with_capacity(Weekday::ALL.len() * usize::from(PERIODS_PER_DAY));
    for day in Weekday::ALL {
        let date = day.date_in_week(week_start);
        for period in Period::all() {
            let state = match (slot_at.get(&(day, period)), session_at.get(&(day, period))) {
                (None, _) => CellState::Empty,
                (Some(slot), None) if date < today => CellState::Unmarked((*slot).clone()),
                (Some(slot), None) => CellState::Pending((*slot).clone()),
                (Some(slot), Some(session)) => {
                    resolve_session(slot, session, &mut warnings)
                }
            };
            cells.push(ReconciledCell {
                day,
                period,
                date,
                state,
            });
        }
    }

    tracing::debug!(
        %week_start,
        slots = slots.len(),
        sessions = sessions.len(),
        warnings = warnings.len(),
        "reconciled week"
    );

    Grid {
        week_start,
        cells,
        warnings,
    }
}

fn resolve_session(
    slot: &TimetableSlot,
    session: &AttendanceSession,
    warnings: &mut Vec<IntegrityWarning>,
) -> CellState {
    let slot = slot.clone();
    match session.category {
        SessionCategory::Free => CellState::Free {
            slot,
            verified: session.verified,
        },
        SessionCategory::Normal => CellState::Normal {
            slot,
            session_id: session.id,
            verified: session.verified,
        },
        SessionCategory::Swap => {
            if session.actual.is_none() {
                record(
                    warnings,
                    IntegrityWarning::SwapWithoutCourse {
                        session_id: session.id,
                    },
                );
            }
            let scheduled = if session.scheduled.short().is_empty() {
                slot.course.clone()
            } else {
                session.scheduled.clone()
            };
            CellState::Swap {
                slot,
                session_id: session.id,
                scheduled,
                actual: session.actual.clone(),
                verified: session.verified,
            }
        }
    }
}

/// Reconciles the pre-merged rows of the week-grid endpoint. Each row is one timetable slot,
/// optionally carrying the session held for it that week.
pub fn merge_rows(rows: &[WeekGridRow], week_start: NaiveDate, today: NaiveDate) -> Grid {
    let mut warnings = Vec::new();
    let mut slots = Vec::with_capacity(rows.len());
    let mut sessions = Vec::new();

    for row in rows {
        let (Ok(day), Some(period)) = (row.day.parse::<Weekday>(), Period::new(row.slot_number))
        else {
            record(
                &mut warnings,
                IntegrityWarning::InvalidCoordinate {
                    day: row.day.clone(),
                    period: row.slot_number,
                },
            );
            continue;
        };

        let course = Course::from_parts(row.course_code.as_deref(), row.course_name.as_deref())
            .unwrap_or_default();
        let faculty_name = row.faculty_name.clone().unwrap_or_default();

        slots.push(TimetableSlot {
            day,
            period,
            course: course.clone(),
            faculty_name: faculty_name.clone(),
            room_info: row.room_info.clone().filter(|r| !r.trim().is_empty()),
        });

        let Some(session_id) = row.session_id else {
            if let Some(category) = &row.session_category {
                record(
                    &mut warnings,
                    IntegrityWarning::UnknownCategory {
                        session_id: None,
                        category: category.clone(),
                    },
                );
            }
            continue;
        };

        let category = match row.session_category.as_deref() {
            None => SessionCategory::Normal,
            Some(raw) => match raw.parse() {
                Ok(category) => category,
                Err(_) => {
                    record(
                        &mut warnings,
                        IntegrityWarning::UnknownCategory {
                            session_id: Some(session_id),
                            category: raw.to_string(),
                        },
                    );
                    continue;
                }
            },
        };

        let actual = match category {
            SessionCategory::Swap => Course::from_parts(
                row.actual_course_code.as_deref(),
                row.actual_course_name.as_deref(),
            ),
            _ => None,
        };

        sessions.push(AttendanceSession {
            id: session_id,
            date: day.date_in_week(week_start),
            day,
            period,
            category,
            scheduled: course,
            actual,
            faculty_name,
            verified: row.is_verified_by_faculty.unwrap_or(false),
        });
    }

    merge(&slots, &sessions, week_start, today, warnings)
}
