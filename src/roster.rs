//! Bulk roster import.
//!
//! A roster file is a CSV with a `roll_number,full_name,email` header. Importing compares it with
//! the students already in the section, keyed by roll number, and produces a [`RosterPlan`]:
//! students to add, students whose details changed, and students no longer listed. Dropped
//! students are only removed when asked to.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{Id, Student, StudentForm};
use crate::service::AttendanceService;

/// One line of a roster CSV.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RosterEntry {
    pub roll_number: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl RosterEntry {
    fn form(&self, section_id: Id) -> Result<StudentForm> {
        StudentForm {
            roll: self.roll_number.clone(),
            name: self.full_name.clone(),
            email: self.email.clone(),
            section_id,
        }
        .normalized()
    }
}

/// Reads roster entries from CSV. A roll number listed twice is rejected.
pub fn read_roster<R: Read>(reader: R) -> Result<Vec<RosterEntry>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for entry in reader.deserialize() {
        let entry: RosterEntry = entry?;
        if !seen.insert(entry.roll_number.to_lowercase()) {
            return Err(Error::validation(format!(
                "roll number {} is listed more than once",
                entry.roll_number
            )));
        }
        entries.push(entry);
    }

    Ok(entries)
}

pub fn read_roster_file(path: &Path) -> Result<Vec<RosterEntry>> {
    read_roster(std::fs::File::open(path)?)
}

/// The changes needed to bring a section in line with a roster file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RosterPlan {
    pub added: Vec<StudentForm>,
    pub updated: Vec<(Id, StudentForm)>,
    pub dropped: Vec<Student>,
}

impl RosterPlan {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.dropped.is_empty()
    }
}

/// Diffs `incoming` against the `current` students of `section_id`. Roll numbers compare
/// case-insensitively.
pub fn plan_sync(current: &[Student], incoming: &[RosterEntry], section_id: Id) -> Result<RosterPlan> {
    let existing: HashMap<String, &Student> = current
        .iter()
        .map(|s| (s.roll_number.to_lowercase(), s))
        .collect();

    let mut plan = RosterPlan::default();
    let mut listed = HashSet::new();

    for entry in incoming {
        let form = entry.form(section_id)?;
        let key = form.roll.to_lowercase();

        match existing.get(&key) {
            None => plan.added.push(form),
            Some(student) => {
                if student.full_name != form.name || student.email != form.email {
                    plan.updated.push((student.id, form));
                }
            }
        }
        listed.insert(key);
    }

    plan.dropped = current
        .iter()
        .filter(|s| !listed.contains(&s.roll_number.to_lowercase()))
        .cloned()
        .collect();

    Ok(plan)
}

/// What [`apply_plan`] changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub dropped: usize,
}

/// Applies `plan` through `service`, removing dropped students only when `drop_missing` is set.
pub fn apply_plan(
    service: &mut dyn AttendanceService,
    plan: &RosterPlan,
    drop_missing: bool,
) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    for form in &plan.added {
        service.add_student(form)?;
        report.added += 1;
    }
    for (id, form) in &plan.updated {
        service.update_student(*id, form)?;
        report.updated += 1;
    }

    if drop_missing {
        for student in &plan.dropped {
            service.delete_student(student.id)?;
            report.dropped += 1;
        }
    } else if !plan.dropped.is_empty() {
        tracing::info!(
            count = plan.dropped.len(),
            "students missing from the roster file were kept"
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: Id, roll: &str, name: &str, email: Option<&str>) -> Student {
        Student {
            id,
            roll_number: roll.to_string(),
            full_name: name.to_string(),
            email: email.map(str::to_string),
            section_id: Some(1),
        }
    }

    #[test]
    fn reads_csv_with_optional_email() {
        let csv = "roll_number,full_name,email\n21CS001, Asha ,asha@college.edu\n21CS002,Bala,\n";
        let entries = read_roster(csv.as_bytes()).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].full_name, "Asha");
        assert_eq!(entries[0].email.as_deref(), Some("asha@college.edu"));
        assert_eq!(entries[1].email, None);
    }

    #[test]
    fn repeated_roll_numbers_are_rejected() {
        let csv = "roll_number,full_name,email\n21CS001,Asha,\n21cs001,Asha K,\n";
        assert!(read_roster(csv.as_bytes()).unwrap_err().is_validation());
    }

    #[test]
    fn plan_adds_updates_and_drops_by_roll_number() {
        let current = vec![
            student(1, "21CS001", "Asha", None),
            student(2, "21CS002", "Bala", Some("bala@college.edu")),
            student(3, "21CS003", "Chitra", None),
        ];
        let incoming = vec![
            RosterEntry {
                roll_number: "21cs001".to_string(),
                full_name: "Asha".to_string(),
                email: None,
            },
            RosterEntry {
                roll_number: "21CS002".to_string(),
                full_name: "Bala".to_string(),
                email: Some("bala.r@college.edu".to_string()),
            },
            RosterEntry {
                roll_number: "21CS004".to_string(),
                full_name: "Dev".to_string(),
                email: None,
            },
        ];

        let plan = plan_sync(&current, &incoming, 1).unwrap();

        assert_eq!(plan.added.len(), 1);
        assert_eq!(plan.added[0].roll, "21CS004");
        assert_eq!(plan.updated.len(), 1);
        assert_eq!(plan.updated[0].0, 2);
        assert_eq!(plan.dropped, vec![current[2].clone()]);
    }

    #[test]
    fn unchanged_roster_needs_nothing() {
        let current = vec![student(1, "21CS001", "Asha", None)];
        let incoming = vec![RosterEntry {
            roll_number: "21CS001".to_string(),
            full_name: " Asha".to_string(),
            email: Some(String::new()),
        }];
        assert!(plan_sync(&current, &incoming, 1).unwrap().is_empty());
    }

    #[test]
    fn blank_names_fail_the_plan() {
        let incoming = vec![RosterEntry {
            roll_number: "21CS001".to_string(),
            full_name: "  ".to_string(),
            email: None,
        }];
        assert!(plan_sync(&[], &incoming, 1).unwrap_err().is_validation());
    }
}
