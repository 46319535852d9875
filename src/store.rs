use chrono::{Days, NaiveDate};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::{
    AttendanceRecord, Batch, DailyOverviewRow, Department, Id, SessionCategory, Section,
    SlotSession, Student, StudentForm, WeekGridRow, Weekday,
};
use crate::schema;
use crate::service::AttendanceService;

/// The tables of a local attendance database. Every statement is idempotent.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS departments (
    id INTEGER PRIMARY KEY,
    dept_code TEXT NOT NULL UNIQUE,
    dept_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS batches (
    id INTEGER PRIMARY KEY,
    dept_id INTEGER NOT NULL REFERENCES departments (id),
    batch_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sections (
    id INTEGER PRIMARY KEY,
    batch_id INTEGER NOT NULL REFERENCES batches (id),
    section_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY,
    roll_number TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL,
    email TEXT,
    section_id INTEGER NOT NULL REFERENCES sections (id)
);

CREATE TABLE IF NOT EXISTS timetable (
    id INTEGER PRIMARY KEY,
    section_id INTEGER NOT NULL REFERENCES sections (id),
    semester INTEGER NOT NULL,
    day TEXT NOT NULL,
    slot_number INTEGER NOT NULL,
    course_code TEXT NOT NULL,
    course_name TEXT NOT NULL,
    faculty_name TEXT NOT NULL,
    room_info TEXT
);

CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY,
    timetable_id INTEGER NOT NULL REFERENCES timetable (id),
    session_date TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT 'normal',
    actual_course_code TEXT,
    actual_course_name TEXT,
    is_verified_by_faculty BOOLEAN NOT NULL DEFAULT 0,
    UNIQUE (timetable_id, session_date)
);

CREATE TABLE IF NOT EXISTS records (
    session_id INTEGER NOT NULL REFERENCES sessions (id) ON DELETE CASCADE,
    student_id INTEGER NOT NULL REFERENCES students (id) ON DELETE CASCADE,
    status TEXT NOT NULL,
    PRIMARY KEY (session_id, student_id)
);
"#;

#[derive(Queryable, Selectable)]
#[diesel(table_name = schema::students)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct StudentRow {
    id: i64,
    roll_number: String,
    full_name: String,
    email: Option<String>,
    section_id: i64,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Student {
            id: row.id,
            roll_number: row.roll_number,
            full_name: row.full_name,
            email: row.email,
            section_id: Some(row.section_id),
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = schema::timetable)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct SlotRow {
    id: i64,
    day: String,
    slot_number: i32,
    course_code: String,
    course_name: String,
    faculty_name: String,
    room_info: Option<String>,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = schema::sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct SessionRow {
    id: i64,
    timetable_id: i64,
    session_date: NaiveDate,
    category: String,
    actual_course_code: Option<String>,
    actual_course_name: Option<String>,
    is_verified_by_faculty: bool,
}

#[derive(Insertable)]
#[diesel(table_name = schema::departments)]
pub struct NewDepartment<'a> {
    pub dept_code: &'a str,
    pub dept_name: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = schema::batches)]
pub struct NewBatch<'a> {
    pub dept_id: Id,
    pub batch_name: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = schema::sections)]
pub struct NewSection<'a> {
    pub batch_id: Id,
    pub section_name: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = schema::students)]
struct NewStudent<'a> {
    roll_number: &'a str,
    full_name: &'a str,
    email: Option<&'a str>,
    section_id: Id,
}

impl<'a> From<&'a StudentForm> for NewStudent<'a> {
    fn from(form: &'a StudentForm) -> Self {
        NewStudent {
            roll_number: &form.roll,
            full_name: &form.name,
            email: form.email.as_deref(),
            section_id: form.section_id,
        }
    }
}

/// A weekly timetable slot. `day` is one of the service's day codes ("Mon".."Fri").
#[derive(Insertable)]
#[diesel(table_name = schema::timetable)]
pub struct NewSlot<'a> {
    pub section_id: Id,
    pub semester: i32,
    pub day: &'a str,
    pub slot_number: i32,
    pub course_code: &'a str,
    pub course_name: &'a str,
    pub faculty_name: &'a str,
    pub room_info: Option<&'a str>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::sessions)]
pub struct NewSession<'a> {
    pub timetable_id: Id,
    pub session_date: NaiveDate,
    pub category: &'a str,
    pub actual_course_code: Option<&'a str>,
    pub actual_course_name: Option<&'a str>,
    pub is_verified_by_faculty: bool,
}

#[derive(Insertable)]
#[diesel(table_name = schema::records)]
struct NewRecord<'a> {
    session_id: Id,
    student_id: Id,
    status: &'a str,
}

/// An attendance database on SQLite, serving the same operations as the remote service.
pub struct SqliteStore {
    db: SqliteConnection,
}

impl SqliteStore {
    /// Connects to the SQLite database at `database_url`. The schema is not created; see
    /// [`SqliteStore::init_schema`].
    pub fn open(database_url: &str) -> Result<Self> {
        let mut db = SqliteConnection::establish(database_url)?;
        db.batch_execute("PRAGMA foreign_keys = ON;")?;

        tracing::debug!(database_url, "opened attendance database");
        Ok(Self { db })
    }

    /// A private database that lives as long as the store, with the schema in place.
    pub fn open_in_memory() -> Result<Self> {
        let mut store = Self::open(":memory:")?;
        store.init_schema()?;
        Ok(store)
    }

    pub fn init_schema(&mut self) -> Result<()> {
        self.db.batch_execute(SCHEMA_SQL)?;
        Ok(())
    }

    pub fn insert_department(&mut self, department: &NewDepartment<'_>) -> Result<Id> {
        Ok(diesel::insert_into(schema::departments::table)
            .values(department)
            .returning(schema::departments::id)
            .get_result(&mut self.db)?)
    }

    pub fn insert_batch(&mut self, batch: &NewBatch<'_>) -> Result<Id> {
        Ok(diesel::insert_into(schema::batches::table)
            .values(batch)
            .returning(schema::batches::id)
            .get_result(&mut self.db)?)
    }

    pub fn insert_section(&mut self, section: &NewSection<'_>) -> Result<Id> {
        Ok(diesel::insert_into(schema::sections::table)
            .values(section)
            .returning(schema::sections::id)
            .get_result(&mut self.db)?)
    }

    pub fn insert_slot(&mut self, slot: &NewSlot<'_>) -> Result<Id> {
        Ok(diesel::insert_into(schema::timetable::table)
            .values(slot)
            .returning(schema::timetable::id)
            .get_result(&mut self.db)?)
    }

    pub fn insert_session(&mut self, session: &NewSession<'_>) -> Result<Id> {
        Ok(diesel::insert_into(schema::sessions::table)
            .values(session)
            .returning(schema::sessions::id)
            .get_result(&mut self.db)?)
    }

    /// Records `status` for every listed student of a session. Existing records are overwritten.
    ///
    /// Roll numbers that are not on the roster are skipped. Returns the number of records written.
    pub fn mark(&mut self, session_id: Id, roll_numbers: &[&str], status: &str) -> Result<usize> {
        use schema::students::dsl::*;

        let known: Vec<(i64, String)> = students
            .filter(roll_number.eq_any(roll_numbers.to_vec()))
            .select((id, roll_number))
            .load(&mut self.db)?;

        for roll in roll_numbers {
            if !known.iter().any(|(_, r)| r == roll) {
                tracing::warn!(roll = *roll, status, "tried to mark an unknown student");
            }
        }

        let rows: Vec<NewRecord> = known
            .iter()
            .map(|(student_id, _)| NewRecord {
                session_id,
                student_id: *student_id,
                status,
            })
            .collect();

        // If the record already exists, this simply updates the status.
        Ok(diesel::replace_into(schema::records::table)
            .values(rows)
            .execute(&mut self.db)?)
    }

    /// Looks a student up by roll number.
    pub fn student_by_roll(&mut self, roll: &str) -> Result<Option<Student>> {
        use schema::students::dsl::*;

        Ok(students
            .filter(roll_number.eq(roll))
            .select(StudentRow::as_select())
            .first(&mut self.db)
            .optional()?
            .map(Student::from))
    }

    fn slots_for(&mut self, section: Id, sem: u8) -> Result<Vec<SlotRow>> {
        use schema::timetable::dsl::*;

        Ok(timetable
            .filter(section_id.eq(section))
            .filter(semester.eq(i32::from(sem)))
            .order((day, slot_number, id))
            .select(SlotRow::as_select())
            .load(&mut self.db)?)
    }

    fn sessions_between(
        &mut self,
        section: Id,
        sem: u8,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SessionRow>> {
        use schema::{sessions, timetable};

        Ok(sessions::table
            .inner_join(timetable::table)
            .filter(timetable::section_id.eq(section))
            .filter(timetable::semester.eq(i32::from(sem)))
            .filter(sessions::session_date.between(from, to))
            .order(sessions::id)
            .select(SessionRow::as_select())
            .load(&mut self.db)?)
    }
}

impl AttendanceService for SqliteStore {
    fn departments(&mut self) -> Result<Vec<Department>> {
        use schema::departments::dsl::*;

        Ok(departments
            .order(id)
            .select(Department::as_select())
            .load(&mut self.db)?)
    }

    fn batches(&mut self) -> Result<Vec<Batch>> {
        use schema::batches::dsl::*;

        Ok(batches
            .order(id)
            .select(Batch::as_select())
            .load(&mut self.db)?)
    }

    fn sections(&mut self) -> Result<Vec<Section>> {
        use schema::sections::dsl::*;

        Ok(sections
            .order(id)
            .select(Section::as_select())
            .load(&mut self.db)?)
    }

    fn week_grid(
        &mut self,
        section_id: Id,
        week_start: NaiveDate,
        semester: u8,
    ) -> Result<Vec<WeekGridRow>> {
        let week_end = week_start
            .checked_add_days(Days::new(Weekday::Fri.offset()))
            .unwrap_or(week_start);

        let slots = self.slots_for(section_id, semester)?;
        let sessions = self.sessions_between(section_id, semester, week_start, week_end)?;

        let rows = slots
            .into_iter()
            .map(|slot| {
                let session = slot.day.parse::<Weekday>().ok().and_then(|day| {
                    let date = day.date_in_week(week_start);
                    sessions
                        .iter()
                        .find(|s| s.timetable_id == slot.id && s.session_date == date)
                });

                WeekGridRow {
                    day: slot.day,
                    slot_number: i64::from(slot.slot_number),
                    timetable_id: Some(slot.id),
                    course_code: Some(slot.course_code),
                    course_name: Some(slot.course_name),
                    faculty_name: Some(slot.faculty_name),
                    room_info: slot.room_info,
                    session_id: session.map(|s| s.id),
                    session_category: session.map(|s| s.category.clone()),
                    actual_course_code: session.and_then(|s| s.actual_course_code.clone()),
                    actual_course_name: session.and_then(|s| s.actual_course_name.clone()),
                    is_verified_by_faculty: session.map(|s| s.is_verified_by_faculty),
                }
            })
            .collect();

        Ok(rows)
    }

    fn session_records(&mut self, session: Id) -> Result<Vec<AttendanceRecord>> {
        use schema::{records, students};

        let rows: Vec<(String, String, String)> = records::table
            .inner_join(students::table)
            .filter(records::session_id.eq(session))
            .order(students::roll_number)
            .select((students::roll_number, students::full_name, records::status))
            .load(&mut self.db)?;

        Ok(rows
            .into_iter()
            .map(|(roll_number, full_name, status)| AttendanceRecord {
                roll_number,
                full_name,
                status,
            })
            .collect())
    }

    fn sessions_by_timetable(&mut self, slot: Id) -> Result<Vec<SlotSession>> {
        use schema::sessions::dsl::*;

        let rows = sessions
            .filter(timetable_id.eq(slot))
            .order((session_date.desc(), id.desc()))
            .select(SessionRow::as_select())
            .load(&mut self.db)?;

        Ok(rows
            .into_iter()
            .map(|row| SlotSession {
                id: row.id,
                session_date: row.session_date,
                category: Some(row.category),
                actual_course_code: row.actual_course_code,
                actual_course_name: row.actual_course_name,
                marked_by: None,
                is_verified_by_faculty: Some(row.is_verified_by_faculty),
            })
            .collect())
    }

    fn daily_overview(
        &mut self,
        section_id: Id,
        date: NaiveDate,
        semester: u8,
    ) -> Result<Vec<DailyOverviewRow>> {
        use schema::records;

        let Some(weekday) = Weekday::of(date) else {
            return Ok(Vec::new());
        };

        let slots: Vec<SlotRow> = self
            .slots_for(section_id, semester)?
            .into_iter()
            .filter(|s| s.day.parse::<Weekday>().ok() == Some(weekday))
            .collect();
        let sessions = self.sessions_between(section_id, semester, date, date)?;

        let counted: Vec<Id> = sessions
            .iter()
            .filter(|s| s.category.parse::<SessionCategory>().ok() != Some(SessionCategory::Free))
            .map(|s| s.id)
            .collect();
        let statuses: Vec<(i64, String)> = records::table
            .filter(records::session_id.eq_any(counted.clone()))
            .select((records::session_id, records::status))
            .load(&mut self.db)?;

        // (present, total) per session
        let mut counts: HashMap<Id, (i64, i64)> = counted.iter().map(|&id| (id, (0, 0))).collect();
        for (session_id, status) in &statuses {
            if let Some((present, total)) = counts.get_mut(session_id) {
                *total += 1;
                if status.trim().eq_ignore_ascii_case("present") {
                    *present += 1;
                }
            }
        }

        let mut rows: Vec<DailyOverviewRow> = slots
            .into_iter()
            .map(|slot| {
                let session = sessions.iter().find(|s| s.timetable_id == slot.id);
                let tally = session.and_then(|s| counts.get(&s.id).copied());

                DailyOverviewRow {
                    slot_number: i64::from(slot.slot_number),
                    scheduled_course_name: Some(slot.course_name),
                    actual_course_code: session.and_then(|s| s.actual_course_code.clone()),
                    actual_course_name: session.and_then(|s| s.actual_course_name.clone()),
                    faculty_name: Some(slot.faculty_name),
                    session_category: session.map(|s| s.category.clone()),
                    session_id: session.map(|s| s.id),
                    present_count: tally.map(|(present, _)| present),
                    absent_count: tally.map(|(present, total)| total - present),
                    total_count: tally.map(|(_, total)| total),
                    is_verified_by_faculty: session.map(|s| s.is_verified_by_faculty),
                }
            })
            .collect();
        rows.sort_by_key(|r| r.slot_number);

        Ok(rows)
    }

    fn students_in_section(&mut self, section: Id) -> Result<Vec<Student>> {
        use schema::students::dsl::*;

        let rows = students
            .filter(section_id.eq(section))
            .order(roll_number)
            .select(StudentRow::as_select())
            .load(&mut self.db)?;

        Ok(rows.into_iter().map(Student::from).collect())
    }

    fn add_student(&mut self, form: &StudentForm) -> Result<()> {
        let form = form.clone().normalized()?;

        diesel::insert_into(schema::students::table)
            .values(NewStudent::from(&form))
            .execute(&mut self.db)?;

        Ok(())
    }

    fn update_student(&mut self, student_id: Id, form: &StudentForm) -> Result<()> {
        use schema::students::dsl::*;

        let form = form.clone().normalized()?;

        let updated = diesel::update(students.find(student_id))
            .set((
                roll_number.eq(&form.roll),
                full_name.eq(&form.name),
                email.eq(form.email.as_deref()),
                section_id.eq(form.section_id),
            ))
            .execute(&mut self.db)?;

        if updated == 0 {
            return Err(Error::StudentNotFound(student_id));
        }

        Ok(())
    }

    fn delete_student(&mut self, student_id: Id) -> Result<()> {
        use schema::{records, students};

        self.db.transaction::<_, Error, _>(|conn| {
            diesel::delete(records::table.filter(records::student_id.eq(student_id)))
                .execute(conn)?;

            let deleted = diesel::delete(students::table.find(student_id)).execute(conn)?;
            if deleted == 0 {
                return Err(Error::StudentNotFound(student_id));
            }

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_section() -> (SqliteStore, Id) {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let dept = store
            .insert_department(&NewDepartment {
                dept_code: "CSE",
                dept_name: "Computer Science",
            })
            .unwrap();
        let batch = store
            .insert_batch(&NewBatch {
                dept_id: dept,
                batch_name: "2022-26",
            })
            .unwrap();
        let section = store
            .insert_section(&NewSection {
                batch_id: batch,
                section_name: "A",
            })
            .unwrap();
        (store, section)
    }

    fn form(roll: &str, name: &str, section_id: Id) -> StudentForm {
        StudentForm {
            roll: roll.to_string(),
            name: name.to_string(),
            email: None,
            section_id,
        }
    }

    #[test]
    fn schema_can_be_created_twice() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        assert!(store.departments().unwrap().is_empty());
    }

    #[test]
    fn roster_crud() {
        let (mut store, section) = store_with_section();

        store.add_student(&form("21CS002", "Bala", section)).unwrap();
        store.add_student(&form("21CS001", "Asha", section)).unwrap();

        let roster = store.students_in_section(section).unwrap();
        let rolls: Vec<_> = roster.iter().map(|s| s.roll_number.as_str()).collect();
        assert_eq!(rolls, ["21CS001", "21CS002"]);

        let asha = roster[0].id;
        let mut renamed = form("21CS001", "Asha K", section);
        renamed.email = Some("asha@example.edu".to_string());
        store.update_student(asha, &renamed).unwrap();
        let updated = store.student_by_roll("21CS001").unwrap().unwrap();
        assert_eq!(updated.full_name, "Asha K");
        assert_eq!(updated.email.as_deref(), Some("asha@example.edu"));

        store.delete_student(asha).unwrap();
        assert_eq!(store.students_in_section(section).unwrap().len(), 1);
        assert!(matches!(
            store.delete_student(asha),
            Err(Error::StudentNotFound(_))
        ));
        assert!(matches!(
            store.update_student(asha, &renamed),
            Err(Error::StudentNotFound(_))
        ));
    }

    #[test]
    fn duplicate_roll_numbers_are_rejected() {
        let (mut store, section) = store_with_section();
        store.add_student(&form("21CS001", "Asha", section)).unwrap();
        assert!(matches!(
            store.add_student(&form("21CS001", "Someone", section)),
            Err(Error::Database(_))
        ));
    }

    #[test]
    fn deleting_a_student_removes_their_records() {
        let (mut store, section) = store_with_section();
        store.add_student(&form("21CS001", "Asha", section)).unwrap();
        store.add_student(&form("21CS002", "Bala", section)).unwrap();

        let slot = store
            .insert_slot(&NewSlot {
                section_id: section,
                semester: 3,
                day: "Mon",
                slot_number: 1,
                course_code: "CSE101",
                course_name: "Programming",
                faculty_name: "Dr. Meera",
                room_info: None,
            })
            .unwrap();
        let session = store
            .insert_session(&NewSession {
                timetable_id: slot,
                session_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                category: "normal",
                actual_course_code: None,
                actual_course_name: None,
                is_verified_by_faculty: false,
            })
            .unwrap();
        assert_eq!(
            store.mark(session, &["21CS001", "21CS002", "99XX999"], "Present").unwrap(),
            2
        );
        assert_eq!(store.session_records(session).unwrap().len(), 2);

        let asha = store.student_by_roll("21CS001").unwrap().unwrap().id;
        store.delete_student(asha).unwrap();

        let remaining = store.session_records(session).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].roll_number, "21CS002");
    }
}
