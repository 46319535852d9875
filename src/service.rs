//! The operations this crate needs from an attendance service. Every view is rebuilt from these
//! reads; nothing is cached between calls.

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{
    AttendanceRecord, Batch, DailyOverviewRow, Department, Id, Section, SlotSession, Student,
    StudentForm, WeekGridRow,
};

pub trait AttendanceService {
    fn departments(&mut self) -> Result<Vec<Department>>;

    /// Every batch, across departments. Narrow with [`crate::filter::batches_of`].
    fn batches(&mut self) -> Result<Vec<Batch>>;

    /// Every section, across batches. Narrow with [`crate::filter::sections_of`].
    fn sections(&mut self) -> Result<Vec<Section>>;

    /// The timetable of a section merged with the sessions of the week starting at `week_start`.
    fn week_grid(
        &mut self,
        section_id: Id,
        week_start: NaiveDate,
        semester: u8,
    ) -> Result<Vec<WeekGridRow>>;

    fn session_records(&mut self, session_id: Id) -> Result<Vec<AttendanceRecord>>;

    /// Every session ever held for one timetable slot, newest first.
    fn sessions_by_timetable(&mut self, timetable_id: Id) -> Result<Vec<SlotSession>>;

    fn daily_overview(
        &mut self,
        section_id: Id,
        date: NaiveDate,
        semester: u8,
    ) -> Result<Vec<DailyOverviewRow>>;

    fn students_in_section(&mut self, section_id: Id) -> Result<Vec<Student>>;

    fn add_student(&mut self, form: &StudentForm) -> Result<()>;

    fn update_student(&mut self, student_id: Id, form: &StudentForm) -> Result<()>;

    /// Removes a student together with their attendance records.
    fn delete_student(&mut self, student_id: Id) -> Result<()>;
}

impl<S: AttendanceService + ?Sized> AttendanceService for Box<S> {
    fn departments(&mut self) -> Result<Vec<Department>> {
        (**self).departments()
    }

    fn batches(&mut self) -> Result<Vec<Batch>> {
        (**self).batches()
    }

    fn sections(&mut self) -> Result<Vec<Section>> {
        (**self).sections()
    }

    fn week_grid(
        &mut self,
        section_id: Id,
        week_start: NaiveDate,
        semester: u8,
    ) -> Result<Vec<WeekGridRow>> {
        (**self).week_grid(section_id, week_start, semester)
    }

    fn session_records(&mut self, session_id: Id) -> Result<Vec<AttendanceRecord>> {
        (**self).session_records(session_id)
    }

    fn sessions_by_timetable(&mut self, timetable_id: Id) -> Result<Vec<SlotSession>> {
        (**self).sessions_by_timetable(timetable_id)
    }

    fn daily_overview(
        &mut self,
        section_id: Id,
        date: NaiveDate,
        semester: u8,
    ) -> Result<Vec<DailyOverviewRow>> {
        (**self).daily_overview(section_id, date, semester)
    }

    fn students_in_section(&mut self, section_id: Id) -> Result<Vec<Student>> {
        (**self).students_in_section(section_id)
    }

    fn add_student(&mut self, form: &StudentForm) -> Result<()> {
        (**self).add_student(form)
    }

    fn update_student(&mut self, student_id: Id, form: &StudentForm) -> Result<()> {
        (**self).update_student(student_id, form)
    }

    fn delete_student(&mut self, student_id: Id) -> Result<()> {
        (**self).delete_student(student_id)
    }
}
