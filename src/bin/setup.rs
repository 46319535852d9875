//! Creates the tables of the local attendance database named in the settings.
//!
//! With `--demo`, also fills it with one section, its timetable and the sessions of the current
//! week, so the other commands have something to show.

use anyhow::{Context, Result};
use campus_attendance::config::load_config;
use campus_attendance::filter::monday_of;
use campus_attendance::models::{StudentForm, Weekday};
use campus_attendance::service::AttendanceService;
use campus_attendance::store::{
    NewBatch, NewDepartment, NewSection, NewSession, NewSlot, SqliteStore,
};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Settings file. Defaults to `config.toml` in the working directory, if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed a demo section.
    #[arg(long)]
    demo: bool,
}

const COURSES: [(&str, &str, &str); 4] = [
    ("CSE201", "Data Structures", "Dr. Meera Nair"),
    ("CSE202", "Operating Systems", "Dr. Arjun Rao"),
    ("MA201", "Discrete Mathematics", "Dr. Kavya Iyer"),
    ("CSE203", "Computer Networks", "Dr. Rahul Menon"),
];

const STUDENTS: [(&str, &str, &str); 4] = [
    ("23CS001", "Aditi Sharma", "aditi@college.edu"),
    ("23CS002", "Bharath Kumar", "bharath@college.edu"),
    ("23CS003", "Chitra Devi", ""),
    ("23CS004", "Dinesh Babu", "dinesh@college.edu"),
];

fn seed(store: &mut SqliteStore) -> Result<()> {
    let dept_id = store.insert_department(&NewDepartment {
        dept_code: "CSE",
        dept_name: "Computer Science and Engineering",
    })?;
    let batch_id = store.insert_batch(&NewBatch {
        dept_id,
        batch_name: "2023-2027",
    })?;
    let section_id = store.insert_section(&NewSection {
        batch_id,
        section_name: "A",
    })?;

    for (roll, name, email) in STUDENTS {
        store.add_student(&StudentForm {
            roll: roll.to_string(),
            name: name.to_string(),
            email: (!email.is_empty()).then(|| email.to_string()),
            section_id,
        })?;
    }

    let today = Local::now().date_naive();
    let week_start = monday_of(today);

    for day in Weekday::ALL {
        for slot_number in 1..=4_i32 {
            let course = (day.offset() as usize + slot_number as usize) % COURSES.len();
            let (code, name, faculty) = COURSES[course];
            let timetable_id = store.insert_slot(&NewSlot {
                section_id,
                semester: 3,
                day: day.code(),
                slot_number,
                course_code: code,
                course_name: name,
                faculty_name: faculty,
                room_info: Some("Block B 204"),
            })?;

            let date = day.date_in_week(week_start);
            if date >= today {
                continue;
            }

            // The third slot is taken by another course, and the last slot of Friday is free.
            let swapped = slot_number == 3;
            let free = day == Weekday::Fri && slot_number == 4;
            let (category, actual) = match (free, swapped) {
                (true, _) => ("free", None),
                (false, true) => ("swap", Some(COURSES[(course + 1) % COURSES.len()])),
                (false, false) => ("normal", None),
            };
            let session_id = store.insert_session(&NewSession {
                timetable_id,
                session_date: date,
                category,
                actual_course_code: actual.map(|(code, _, _)| code),
                actual_course_name: actual.map(|(_, name, _)| name),
                is_verified_by_faculty: slot_number % 2 == 1,
            })?;

            if !free {
                let absent = STUDENTS[(day.offset() as usize) % STUDENTS.len()].0;
                let present: Vec<&str> = STUDENTS
                    .iter()
                    .map(|(roll, _, _)| *roll)
                    .filter(|roll| *roll != absent)
                    .collect();
                store.mark(session_id, &present, "Present")?;
                store.mark(session_id, &[absent], "Absent")?;
            }
        }
    }

    tracing::info!(section_id, "seeded demo section");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = Args::parse();
    let settings = load_config(args.config.as_deref()).context("failed to load settings")?;

    let mut store = SqliteStore::open(&settings.database.url)
        .with_context(|| format!("failed to open {}", settings.database.url))?;
    store.init_schema()?;
    println!("Initialized {}", settings.database.url);

    if args.demo {
        seed(&mut store)?;
        println!("Seeded a demo section; try `campus-attendance --backend sqlite departments`.");
    }

    Ok(())
}
