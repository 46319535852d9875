//! Terminal rendering of the view states.
//!
//! Every function returns the rendered text; printing is left to the binary. Empty results render
//! as an explicit message so they can never be mistaken for a failure.

use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::aggregate::{AttendanceSummary, Percentage, StudentTally};
use crate::models::{
    AttendanceRecord, Batch, DailyOverviewRow, Department, Period, Section, SessionCategory,
    Student, Weekday,
};
use crate::schedule::{CellState, Grid, ReconciledCell};
use crate::view::{Detail, HistoryEntry};

/// Overlays U+0336 on every character so terminals draw the text struck through.
pub fn strike(text: &str) -> String {
    text.chars().flat_map(|c| [c, '\u{0336}']).collect()
}

fn modern(mut table: Table) -> String {
    table.with(Style::modern());
    table.to_string()
}

fn list<T: Tabled>(title: &str, items: Vec<T>) -> String {
    if items.is_empty() {
        return format!("No {} found.", title.to_lowercase());
    }
    format!("{title}:\n{}", modern(Table::new(items)))
}

pub fn departments(departments: &[Department]) -> String {
    list("Departments", departments.to_vec())
}

pub fn batches(batches: &[Batch]) -> String {
    list("Batches", batches.to_vec())
}

pub fn sections(sections: &[Section]) -> String {
    list("Sections", sections.to_vec())
}

/// The text shown inside one cell of the week grid, followed by the slot's faculty and room.
pub fn cell_text(cell: &ReconciledCell) -> String {
    let tick = if cell.is_verified() { " ✓" } else { "" };

    let mut text = match &cell.state {
        CellState::Empty => "-".to_string(),
        CellState::Pending(slot) => slot.course.title().to_string(),
        CellState::Unmarked(slot) => format!("{}\nUNMARKED", slot.course.title()),
        CellState::Free { slot, .. } => format!("{}\nFREE{tick}", slot.course.title()),
        CellState::Normal { .. } => {
            format!("{}{tick}", cell.primary_subject().unwrap_or_default())
        }
        CellState::Swap { .. } => format!(
            "{}{tick}\n{}",
            cell.primary_subject().unwrap_or_default(),
            strike(cell.struck_subject().unwrap_or_default())
        ),
    };

    if let Some(slot) = cell.slot() {
        if !slot.faculty_name.is_empty() {
            text.push('\n');
            text.push_str(&slot.faculty_name);
        }
        if let Some(room) = &slot.room_info {
            text.push_str(&format!("\n[{room}]"));
        }
    }
    text
}

/// Renders the reconciled week: one row per weekday, one column per period.
pub fn week(grid: &Grid) -> String {
    let heading = format!("Week of {}", grid.week_start().format("%a %d %b %Y"));
    if grid.is_blank() {
        return format!("{heading}\nNo classes are scheduled for this week.");
    }

    let mut builder = Builder::default();
    let mut header = vec!["Day".to_string()];
    header.extend(Period::all().map(|p| format!("P{p}")));
    builder.push_record(header);

    for day in Weekday::ALL {
        let date = day.date_in_week(grid.week_start());
        let mut row = vec![format!("{day}\n{}", date.format("%d %b"))];
        row.extend(grid.day(day).iter().map(cell_text));
        builder.push_record(row);
    }

    let mut text = format!("{heading}\n{}", modern(builder.build()));
    for warning in grid.warnings() {
        text.push_str(&format!("\nwarning: {warning}"));
    }
    text
}

fn summary_line(summary: &AttendanceSummary, threshold: f64) -> String {
    let flag = summary
        .level(threshold)
        .map(|level| format!(" [{level}]"))
        .unwrap_or_default();

    format!(
        "Present: {}  Absent: {}  Total: {}  Attendance: {}{flag}",
        summary.present, summary.absent, summary.total, summary.percentage
    )
}

#[derive(Tabled)]
struct RecordRow<'a> {
    #[tabled(rename = "Roll No")]
    roll_number: &'a str,
    #[tabled(rename = "Name")]
    full_name: &'a str,
    #[tabled(rename = "Status")]
    status: &'a str,
}

/// Renders the attendance detail of one session.
pub fn detail(detail: &Detail, threshold: f64) -> String {
    let Detail::Loaded {
        cell,
        records,
        summary,
    } = detail
    else {
        return "No session selected.".to_string();
    };

    let mut heading = format!(
        "{} {} period {}: {}",
        cell.day,
        cell.date,
        cell.period,
        cell.primary_subject().unwrap_or_default()
    );
    if let Some(struck) = cell.struck_subject() {
        heading.push_str(&format!(" (swapped from {struck})"));
    }

    session(&heading, records_table(records), summary, threshold)
}

/// Renders a session's records when no grid cell is attached, e.g. a lookup by id.
pub fn session(
    heading: &str,
    table: Option<String>,
    summary: &AttendanceSummary,
    threshold: f64,
) -> String {
    let body = table.unwrap_or_else(|| "No attendance records for this session.".to_string());
    format!("{heading}\n{}\n{body}", summary_line(summary, threshold))
}

pub fn records_table(records: &[AttendanceRecord]) -> Option<String> {
    if records.is_empty() {
        return None;
    }
    let rows = records.iter().map(|r| RecordRow {
        roll_number: &r.roll_number,
        full_name: &r.full_name,
        status: &r.status,
    });
    Some(modern(Table::new(rows)))
}

#[derive(Tabled)]
struct OverviewLine {
    #[tabled(rename = "Period")]
    period: i64,
    #[tabled(rename = "Course")]
    course: String,
    #[tabled(rename = "Faculty")]
    faculty: String,
    #[tabled(rename = "Type")]
    category: String,
    #[tabled(rename = "Present")]
    present: String,
    #[tabled(rename = "Absent")]
    absent: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "%")]
    percentage: String,
    #[tabled(rename = "Verified")]
    verified: &'static str,
}

fn count(value: Option<i64>) -> usize {
    value.and_then(|v| usize::try_from(v).ok()).unwrap_or(0)
}

/// Renders the daily overview. Periods without a session show as not marked.
pub fn overview(rows: &[DailyOverviewRow], threshold: f64) -> String {
    if rows.is_empty() {
        return "No classes are scheduled for this day.".to_string();
    }

    let lines = rows.iter().map(|row| {
        let blank = |label: &str| {
            let dash = || "-".to_string();
            (label.to_string(), dash(), dash(), dash(), dash())
        };
        let (category, present, absent, total, percentage) = match (row.session_id, row.category())
        {
            (None, _) => blank("NOT MARKED"),
            (Some(_), Some(SessionCategory::Free)) => blank("FREE"),
            (Some(_), category) => {
                let percentage =
                    Percentage::from_counts(count(row.present_count), count(row.total_count));
                let flag = percentage
                    .level(threshold)
                    .map(|level| format!(" {level}"))
                    .unwrap_or_default();
                (
                    category.unwrap_or(SessionCategory::Normal).to_string(),
                    count(row.present_count).to_string(),
                    count(row.absent_count).to_string(),
                    count(row.total_count).to_string(),
                    format!("{percentage}{flag}"),
                )
            }
        };

        OverviewLine {
            period: row.slot_number,
            course: row.display_course().to_string(),
            faculty: row.faculty_name.clone().unwrap_or_default(),
            category,
            present,
            absent,
            total,
            percentage,
            verified: if row.is_verified_by_faculty.unwrap_or(false) {
                "yes"
            } else {
                "no"
            },
        }
    });

    modern(Table::new(lines))
}

#[derive(Tabled)]
struct HistoryLine {
    #[tabled(rename = "Session")]
    id: i64,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Type")]
    category: String,
    #[tabled(rename = "Marked by")]
    marked_by: String,
    #[tabled(rename = "Present")]
    present: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "%")]
    percentage: String,
    #[tabled(rename = "Verified")]
    verified: &'static str,
}

/// Renders the sessions held for one timetable slot. Open one with `session <id>`.
pub fn history(entries: &[HistoryEntry], threshold: f64) -> String {
    if entries.is_empty() {
        return "No sessions have been held for this slot yet.".to_string();
    }

    let lines = entries.iter().map(|entry| {
        let session = &entry.session;
        let category = match session.category() {
            Some(SessionCategory::Swap) => {
                let actual = session
                    .actual_course_code
                    .as_deref()
                    .or(session.actual_course_name.as_deref())
                    .unwrap_or("?");
                format!("swap ({actual})")
            }
            Some(category) => category.to_string(),
            None => "-".to_string(),
        };
        let (present, total, percentage) = match &entry.summary {
            Some(summary) => {
                let flag = summary
                    .level(threshold)
                    .map(|level| format!(" {level}"))
                    .unwrap_or_default();
                (
                    summary.present.to_string(),
                    summary.total.to_string(),
                    format!("{}{flag}", summary.percentage),
                )
            }
            None => ("-".to_string(), "-".to_string(), "-".to_string()),
        };

        HistoryLine {
            id: session.id,
            date: session.session_date.format("%a %d %b %Y").to_string(),
            category,
            marked_by: session.marked_by.clone().unwrap_or_else(|| "-".to_string()),
            present,
            total,
            percentage,
            verified: if session.is_verified() { "yes" } else { "no" },
        }
    });

    format!("Sessions held:\n{}", modern(Table::new(lines)))
}

#[derive(Tabled)]
struct RosterLine<'a> {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Roll No")]
    roll_number: &'a str,
    #[tabled(rename = "Name")]
    full_name: &'a str,
    #[tabled(rename = "Email")]
    email: &'a str,
}

pub fn roster(students: &[Student]) -> String {
    if students.is_empty() {
        return "No students in this section.".to_string();
    }
    let lines = students.iter().map(|s| RosterLine {
        id: s.id,
        roll_number: &s.roll_number,
        full_name: &s.full_name,
        email: s.email.as_deref().unwrap_or("-"),
    });
    format!("Roster:\n{}", modern(Table::new(lines)))
}

#[derive(Tabled)]
struct TallyLine<'a> {
    #[tabled(rename = "Roll No")]
    roll_number: &'a str,
    #[tabled(rename = "Name")]
    full_name: &'a str,
    #[tabled(rename = "Attended")]
    attended: usize,
    #[tabled(rename = "Held")]
    held: usize,
    #[tabled(rename = "%")]
    percentage: Percentage,
}

pub fn defaulters(tallies: &[&StudentTally], threshold: f64) -> String {
    if tallies.is_empty() {
        return format!("No students below {threshold}% attendance.");
    }
    let lines = tallies.iter().map(|t| TallyLine {
        roll_number: &t.roll_number,
        full_name: &t.full_name,
        attended: t.attended,
        held: t.held,
        percentage: t.percentage(),
    });
    format!(
        "Students below {threshold}% attendance:\n{}",
        modern(Table::new(lines))
    )
}
