//! Per-screen state objects.
//!
//! Each view owns its filters and the data fetched for them, and changes only in response to a
//! user action or a fetch completion. Every fetch is issued as a request tagged with a [`Ticket`];
//! a completion whose ticket is no longer the latest, or whose filters no longer match the view's
//! current selection, is discarded instead of overwriting newer data.

use chrono::{Days, NaiveDate};

use crate::aggregate::{AttendanceSummary, StudentTally, summarize, tally};
use crate::error::{Error, Result};
use crate::filter::{DayQuery, FilterSelection, WeekQuery};
use crate::models::{
    AttendanceRecord, DailyOverviewRow, Id, Period, SessionCategory, SlotSession, Student,
    StudentForm, WeekGridRow, Weekday,
};
use crate::schedule::{CellState, Grid, ReconciledCell, merge_rows};
use crate::service::AttendanceService;

/// Identifies one outstanding fetch of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Whether a completion was applied or thrown away as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Current,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Default)]
struct Generation(u64);

impl Generation {
    fn issue(&mut self) -> Ticket {
        self.0 += 1;
        Ticket(self.0)
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.0 == ticket.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRequest {
    pub ticket: Ticket,
    pub query: WeekQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailRequest {
    pub ticket: Ticket,
    pub session_id: Id,
}

/// The outcome of picking a cell of the week grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Nothing is scheduled there, or no grid is loaded.
    Nothing,
    /// The period was declared free; there are no records.
    Free,
    /// Attendance has not been marked for this slot yet.
    NotMarked { overdue: bool },
    /// Records must be fetched for this session.
    Fetch(DetailRequest),
}

/// The attendance detail panel of the week grid.
#[derive(Debug, Clone, PartialEq)]
pub enum Detail {
    Closed,
    Loading {
        cell: ReconciledCell,
    },
    Loaded {
        cell: ReconciledCell,
        records: Vec<AttendanceRecord>,
        summary: AttendanceSummary,
    },
}

/// The weekly timetable screen: a reconciled grid plus a detail panel for one session.
#[derive(Debug)]
pub struct TimetableView {
    filters: FilterSelection,
    grid: Option<Grid>,
    status: FetchStatus,
    grid_generation: Generation,
    detail: Detail,
    detail_generation: Generation,
}

impl TimetableView {
    pub fn new(filters: FilterSelection) -> Self {
        Self {
            filters,
            grid: None,
            status: FetchStatus::Idle,
            grid_generation: Generation::default(),
            detail: Detail::Closed,
            detail_generation: Generation::default(),
        }
    }

    pub fn filters(&self) -> &FilterSelection {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterSelection {
        &mut self.filters
    }

    /// The last grid that loaded successfully. A failed reload keeps it on screen.
    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    pub fn detail(&self) -> &Detail {
        &self.detail
    }

    /// Starts a grid fetch for the current filters. Any open detail panel is closed, and any
    /// detail fetch still in flight becomes stale.
    pub fn request_grid(&mut self) -> Result<GridRequest> {
        let query = self.filters.resolve_week()?;

        self.status = FetchStatus::Loading;
        self.close_detail();

        Ok(GridRequest {
            ticket: self.grid_generation.issue(),
            query,
        })
    }

    /// Applies the rows fetched for `request`. Failures are recorded and handed back to the caller
    /// to surface.
    pub fn complete_grid(
        &mut self,
        request: &GridRequest,
        result: Result<Vec<WeekGridRow>>,
        today: NaiveDate,
    ) -> Result<Applied> {
        if !self.grid_generation.is_current(request.ticket) {
            tracing::debug!(?request, "discarding superseded week grid");
            return Ok(Applied::Stale);
        }
        if self.filters.resolve_week().ok() != Some(request.query) {
            // Nothing else is in flight, so the view is no longer loading.
            tracing::debug!(?request, "discarding week grid for old filters");
            self.status = FetchStatus::Idle;
            return Ok(Applied::Stale);
        }

        match result {
            Ok(rows) => {
                self.grid = Some(merge_rows(&rows, request.query.week_start, today));
                self.status = FetchStatus::Ready;
                Ok(Applied::Current)
            }
            Err(e) => {
                self.status = FetchStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Picks a cell. Only normal and swapped sessions lead to a records fetch.
    pub fn select(&mut self, day: Weekday, period: Period) -> Selection {
        let Some(grid) = &self.grid else {
            return Selection::Nothing;
        };
        let cell = grid.cell(day, period).clone();

        match &cell.state {
            CellState::Empty => Selection::Nothing,
            CellState::Free { .. } => Selection::Free,
            CellState::Pending(_) => Selection::NotMarked { overdue: false },
            CellState::Unmarked(_) => Selection::NotMarked { overdue: true },
            CellState::Normal { session_id, .. } | CellState::Swap { session_id, .. } => {
                let request = DetailRequest {
                    ticket: self.detail_generation.issue(),
                    session_id: *session_id,
                };
                self.detail = Detail::Loading { cell };
                Selection::Fetch(request)
            }
        }
    }

    /// Applies the records fetched for `request`. A failure closes the detail panel rather than
    /// leaving partial data on it.
    pub fn complete_detail(
        &mut self,
        request: &DetailRequest,
        result: Result<Vec<AttendanceRecord>>,
    ) -> Result<Applied> {
        let Detail::Loading { cell } = &self.detail else {
            return Ok(Applied::Stale);
        };
        if !self.detail_generation.is_current(request.ticket)
            || cell.session_id() != Some(request.session_id)
        {
            tracing::debug!(?request, "discarding stale session records");
            return Ok(Applied::Stale);
        }
        let cell = cell.clone();

        match result {
            Ok(records) => {
                let summary = summarize(&records);
                self.detail = Detail::Loaded {
                    cell,
                    records,
                    summary,
                };
                Ok(Applied::Current)
            }
            Err(e) => {
                self.detail = Detail::Closed;
                Err(e)
            }
        }
    }

    pub fn close_detail(&mut self) {
        self.detail = Detail::Closed;
        // Invalidate any records fetch still in flight.
        self.detail_generation.issue();
    }

    /// Fetches and reconciles the week for the current filters.
    pub fn load(&mut self, service: &mut dyn AttendanceService, today: NaiveDate) -> Result<()> {
        let request = self.request_grid()?;
        let result = service.week_grid(
            request.query.section_id,
            request.query.week_start,
            request.query.semester,
        );
        self.complete_grid(&request, result, today)?;
        Ok(())
    }

    /// Selects a cell and, when it has a session, fetches its records.
    pub fn open(
        &mut self,
        service: &mut dyn AttendanceService,
        day: Weekday,
        period: Period,
    ) -> Result<Selection> {
        let selection = self.select(day, period);
        if let Selection::Fetch(request) = &selection {
            let result = service.session_records(request.session_id);
            self.complete_detail(request, result)?;
        }
        Ok(selection)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverviewRequest {
    pub ticket: Ticket,
    pub query: DayQuery,
}

/// The daily attendance overview screen.
#[derive(Debug)]
pub struct OverviewView {
    filters: FilterSelection,
    rows: Vec<DailyOverviewRow>,
    status: FetchStatus,
    generation: Generation,
}

impl OverviewView {
    pub fn new(filters: FilterSelection) -> Self {
        Self {
            filters,
            rows: Vec::new(),
            status: FetchStatus::Idle,
            generation: Generation::default(),
        }
    }

    pub fn filters_mut(&mut self) -> &mut FilterSelection {
        &mut self.filters
    }

    pub fn rows(&self) -> &[DailyOverviewRow] {
        &self.rows
    }

    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    /// Starts a fetch. The previous rows are cleared straight away.
    pub fn request(&mut self) -> Result<OverviewRequest> {
        let query = self.filters.resolve_day()?;

        self.rows.clear();
        self.status = FetchStatus::Loading;

        Ok(OverviewRequest {
            ticket: self.generation.issue(),
            query,
        })
    }

    pub fn complete(
        &mut self,
        request: &OverviewRequest,
        result: Result<Vec<DailyOverviewRow>>,
    ) -> Result<Applied> {
        if !self.generation.is_current(request.ticket) {
            tracing::debug!(?request, "discarding superseded overview");
            return Ok(Applied::Stale);
        }
        if self.filters.resolve_day().ok() != Some(request.query) {
            tracing::debug!(?request, "discarding overview for old filters");
            self.status = FetchStatus::Idle;
            return Ok(Applied::Stale);
        }

        match result {
            Ok(mut rows) => {
                rows.sort_by_key(|r| r.slot_number);
                self.rows = rows;
                self.status = FetchStatus::Ready;
                Ok(Applied::Current)
            }
            Err(e) => {
                self.status = FetchStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn load(&mut self, service: &mut dyn AttendanceService) -> Result<()> {
        let request = self.request()?;
        let result = service.daily_overview(
            request.query.section_id,
            request.query.date,
            request.query.semester,
        );
        self.complete(&request, result)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterRequest {
    pub ticket: Ticket,
    pub section_id: Id,
}

/// A change to the roster, ready to be sent to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterMutation {
    Create(StudentForm),
    Update(Id, StudentForm),
    Delete(Id),
}

/// The student management screen: the roster of one section and an add/edit form.
#[derive(Debug)]
pub struct RosterView {
    filters: FilterSelection,
    students: Vec<Student>,
    editing: Option<Id>,
    status: FetchStatus,
    generation: Generation,
}

impl RosterView {
    pub fn new(filters: FilterSelection) -> Self {
        Self {
            filters,
            students: Vec::new(),
            editing: None,
            status: FetchStatus::Idle,
            generation: Generation::default(),
        }
    }

    pub fn filters_mut(&mut self) -> &mut FilterSelection {
        &mut self.filters
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    pub fn editing(&self) -> Option<Id> {
        self.editing
    }

    pub fn request_list(&mut self) -> Result<RosterRequest> {
        let section_id = self.filters.resolve_section()?;
        self.status = FetchStatus::Loading;

        Ok(RosterRequest {
            ticket: self.generation.issue(),
            section_id,
        })
    }

    pub fn complete_list(
        &mut self,
        request: &RosterRequest,
        result: Result<Vec<Student>>,
    ) -> Result<Applied> {
        if !self.generation.is_current(request.ticket) {
            tracing::debug!(?request, "discarding superseded roster");
            return Ok(Applied::Stale);
        }
        if self.filters.section() != Some(request.section_id) {
            tracing::debug!(?request, "discarding roster of another section");
            self.status = FetchStatus::Idle;
            return Ok(Applied::Stale);
        }

        match result {
            Ok(students) => {
                self.students = students;
                self.status = FetchStatus::Ready;
                Ok(Applied::Current)
            }
            Err(e) => {
                self.status = FetchStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Switches the form to editing `student_id`, returning its current values.
    pub fn begin_edit(&mut self, student_id: Id) -> Result<StudentForm> {
        let section_id = self.filters.resolve_section()?;
        let student = self
            .students
            .iter()
            .find(|s| s.id == student_id)
            .ok_or(Error::StudentNotFound(student_id))?;

        self.editing = Some(student_id);
        Ok(StudentForm {
            roll: student.roll_number.clone(),
            name: student.full_name.clone(),
            email: student.email.clone(),
            section_id,
        })
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Turns the form into a create or, while editing, an update. The student always lands in
    /// the selected section.
    pub fn submit(&self, roll: &str, name: &str, email: Option<&str>) -> Result<RosterMutation> {
        let section_id = self.filters.resolve_section()?;
        let form = StudentForm {
            roll: roll.to_string(),
            name: name.to_string(),
            email: email.map(str::to_string),
            section_id,
        }
        .normalized()?;

        Ok(match self.editing {
            Some(id) => RosterMutation::Update(id, form),
            None => RosterMutation::Create(form),
        })
    }

    pub fn delete(&self, student_id: Id) -> Result<RosterMutation> {
        self.filters.resolve_section()?;
        Ok(RosterMutation::Delete(student_id))
    }

    pub fn load(&mut self, service: &mut dyn AttendanceService) -> Result<()> {
        let request = self.request_list()?;
        let result = service.students_in_section(request.section_id);
        self.complete_list(&request, result)?;
        Ok(())
    }

    /// Sends `mutation`, leaves edit mode and refreshes the list.
    pub fn apply(
        &mut self,
        service: &mut dyn AttendanceService,
        mutation: &RosterMutation,
    ) -> Result<()> {
        match mutation {
            RosterMutation::Create(form) => service.add_student(form)?,
            RosterMutation::Update(id, form) => service.update_student(*id, form)?,
            RosterMutation::Delete(id) => service.delete_student(*id)?,
        }
        tracing::info!(?mutation, "roster updated");

        self.editing = None;
        self.load(service)
    }
}

/// Tallies every marked session of the `weeks` weeks ending with the selected one.
pub fn section_tallies(
    service: &mut dyn AttendanceService,
    filters: &FilterSelection,
    weeks: u32,
    today: NaiveDate,
) -> Result<Vec<StudentTally>> {
    let query = filters.resolve_week()?;
    if weeks == 0 {
        return Err(Error::validation("at least one week is needed"));
    }

    let mut sessions = Vec::new();
    for back in 0..weeks {
        let week_start = query
            .week_start
            .checked_sub_days(Days::new(7 * u64::from(back)))
            .ok_or_else(|| Error::validation("date is out of range"))?;
        let rows = service.week_grid(query.section_id, week_start, query.semester)?;
        let grid = merge_rows(&rows, week_start, today);

        for session_id in grid.marked_sessions().filter_map(ReconciledCell::session_id) {
            sessions.push(service.session_records(session_id)?);
        }
    }
    tracing::debug!(sessions = sessions.len(), weeks, "tallying attendance");

    Ok(tally(sessions.iter().map(Vec::as_slice)))
}

/// One session held for a timetable slot. Free sessions have no records and carry no summary.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub session: SlotSession,
    pub summary: Option<AttendanceSummary>,
}

/// Looks up the id of the timetable slot at `day`/`period` of the selected section.
pub fn timetable_slot(
    service: &mut dyn AttendanceService,
    filters: &FilterSelection,
    day: Weekday,
    period: Period,
) -> Result<Id> {
    let query = filters.resolve_week()?;
    let rows = service.week_grid(query.section_id, query.week_start, query.semester)?;

    let row = rows
        .iter()
        .filter(|r| Period::new(r.slot_number) == Some(period))
        .find(|r| r.day.parse::<Weekday>().ok() == Some(day))
        .ok_or_else(|| {
            Error::validation(format!("nothing is scheduled on {day} period {period}"))
        })?;

    row.timetable_id.ok_or_else(|| {
        Error::validation(format!(
            "no timetable id was reported for {day} period {period}; pass it directly"
        ))
    })
}

/// Every session held for a timetable slot, newest first, each with its attendance summary.
pub fn slot_history(
    service: &mut dyn AttendanceService,
    timetable_id: Id,
) -> Result<Vec<HistoryEntry>> {
    let sessions = service.sessions_by_timetable(timetable_id)?;
    tracing::debug!(timetable_id, sessions = sessions.len(), "loading slot history");

    sessions
        .into_iter()
        .map(|session| {
            let summary = if session.category() == Some(SessionCategory::Free) {
                None
            } else {
                Some(summarize(&service.session_records(session.id)?))
            };
            Ok(HistoryEntry { session, summary })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Percentage;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(n: i64) -> Period {
        Period::new(n).unwrap()
    }

    fn filters(section: Id) -> FilterSelection {
        FilterSelection::new()
            .with_section(section)
            .with_semester(3)
            .with_date(date(2026, 10, 21))
    }

    fn rows() -> Vec<WeekGridRow> {
        vec![
            WeekGridRow {
                day: "Mon".to_string(),
                slot_number: 1,
                course_code: Some("CSE101".to_string()),
                session_id: Some(5),
                session_category: Some("normal".to_string()),
                ..Default::default()
            },
            WeekGridRow {
                day: "Mon".to_string(),
                slot_number: 2,
                course_code: Some("CSE102".to_string()),
                session_id: Some(6),
                session_category: Some("free".to_string()),
                ..Default::default()
            },
            WeekGridRow {
                day: "Fri".to_string(),
                slot_number: 4,
                course_code: Some("CSE103".to_string()),
                ..Default::default()
            },
        ]
    }

    fn record(roll: &str, status: &str) -> AttendanceRecord {
        AttendanceRecord {
            roll_number: roll.to_string(),
            full_name: roll.to_string(),
            status: status.to_string(),
        }
    }

    #[test]
    fn incomplete_filters_never_start_a_fetch() {
        let mut view = TimetableView::new(FilterSelection::new());
        assert!(view.request_grid().unwrap_err().is_validation());
        assert_eq!(view.status(), &FetchStatus::Idle);
    }

    #[test]
    fn grid_request_uses_the_monday() {
        let mut view = TimetableView::new(filters(4));
        let request = view.request_grid().unwrap();
        assert_eq!(request.query.week_start, date(2026, 10, 19));
        assert_eq!(view.status(), &FetchStatus::Loading);
    }

    #[test]
    fn an_older_response_is_discarded() {
        let today = date(2026, 10, 21);
        let mut view = TimetableView::new(filters(4));
        let first = view.request_grid().unwrap();
        let second = view.request_grid().unwrap();

        assert_eq!(
            view.complete_grid(&second, Ok(rows()), today).unwrap(),
            Applied::Current
        );
        assert_eq!(
            view.complete_grid(&first, Ok(Vec::new()), today).unwrap(),
            Applied::Stale
        );
        assert!(!view.grid().unwrap().is_blank());
    }

    #[test]
    fn a_response_for_old_filters_is_discarded() {
        let mut view = TimetableView::new(filters(4));
        let request = view.request_grid().unwrap();
        view.filters_mut().select_section(Some(5));

        assert_eq!(
            view.complete_grid(&request, Ok(rows()), date(2026, 10, 21)).unwrap(),
            Applied::Stale
        );
        assert!(view.grid().is_none());
        assert_eq!(view.status(), &FetchStatus::Idle);
    }

    #[test]
    fn a_superseded_response_leaves_the_view_loading() {
        let mut view = TimetableView::new(filters(4));
        let first = view.request_grid().unwrap();
        view.request_grid().unwrap();

        assert_eq!(
            view.complete_grid(&first, Ok(rows()), date(2026, 10, 21)).unwrap(),
            Applied::Stale
        );
        assert_eq!(view.status(), &FetchStatus::Loading);
    }

    #[test]
    fn overview_for_an_old_date_is_discarded() {
        let mut view = OverviewView::new(filters(4));
        let request = view.request().unwrap();
        view.filters_mut().select_date(Some(date(2026, 10, 22)));

        assert_eq!(view.complete(&request, Ok(Vec::new())).unwrap(), Applied::Stale);
        assert_eq!(view.status(), &FetchStatus::Idle);
    }

    #[test]
    fn a_failed_reload_keeps_the_previous_grid() {
        let today = date(2026, 10, 21);
        let mut view = TimetableView::new(filters(4));
        let request = view.request_grid().unwrap();
        view.complete_grid(&request, Ok(rows()), today).unwrap();

        let retry = view.request_grid().unwrap();
        let failure = Err(Error::Rejected {
            endpoint: "common/week-grid".to_string(),
            status: 500,
            message: "boom".to_string(),
        });
        assert!(view.complete_grid(&retry, failure, today).is_err());
        assert!(matches!(view.status(), FetchStatus::Failed(_)));
        assert!(view.grid().is_some());
    }

    #[test]
    fn selecting_cells_follows_their_state() {
        let today = date(2026, 10, 21);
        let mut view = TimetableView::new(filters(4));
        let request = view.request_grid().unwrap();
        view.complete_grid(&request, Ok(rows()), today).unwrap();

        assert_eq!(view.select(Weekday::Tue, period(1)), Selection::Nothing);
        assert_eq!(view.select(Weekday::Mon, period(2)), Selection::Free);
        assert_eq!(
            view.select(Weekday::Fri, period(4)),
            Selection::NotMarked { overdue: false }
        );
        assert_eq!(view.detail(), &Detail::Closed);

        let Selection::Fetch(detail) = view.select(Weekday::Mon, period(1)) else {
            panic!("a normal session should fetch its records");
        };
        assert_eq!(detail.session_id, 5);
        assert!(matches!(view.detail(), Detail::Loading { .. }));

        let records = vec![record("1", "Present"), record("2", "absent")];
        assert_eq!(
            view.complete_detail(&detail, Ok(records)).unwrap(),
            Applied::Current
        );
        let Detail::Loaded { summary, .. } = view.detail() else {
            panic!("records should be loaded");
        };
        assert_eq!(summary.percentage, Percentage::Value(50.0));
    }

    #[test]
    fn a_failed_records_fetch_closes_the_detail() {
        let today = date(2026, 10, 21);
        let mut view = TimetableView::new(filters(4));
        let request = view.request_grid().unwrap();
        view.complete_grid(&request, Ok(rows()), today).unwrap();

        let Selection::Fetch(detail) = view.select(Weekday::Mon, period(1)) else {
            panic!("a normal session should fetch its records");
        };
        let failure = Err(Error::Rejected {
            endpoint: "admin/records-by-session/5".to_string(),
            status: 404,
            message: "no such session".to_string(),
        });
        assert!(view.complete_detail(&detail, failure).is_err());
        assert_eq!(view.detail(), &Detail::Closed);
    }

    #[test]
    fn reloading_the_grid_makes_pending_records_stale() {
        let today = date(2026, 10, 21);
        let mut view = TimetableView::new(filters(4));
        let request = view.request_grid().unwrap();
        view.complete_grid(&request, Ok(rows()), today).unwrap();

        let Selection::Fetch(detail) = view.select(Weekday::Mon, period(1)) else {
            panic!("a normal session should fetch its records");
        };
        view.request_grid().unwrap();

        assert_eq!(
            view.complete_detail(&detail, Ok(vec![record("1", "present")])).unwrap(),
            Applied::Stale
        );
        assert_eq!(view.detail(), &Detail::Closed);
    }

    #[test]
    fn overview_clears_rows_when_refetching() {
        let mut view = OverviewView::new(filters(4));
        let request = view.request().unwrap();
        assert_eq!(request.query.date, date(2026, 10, 21));

        let rows = vec![
            DailyOverviewRow {
                slot_number: 3,
                ..Default::default()
            },
            DailyOverviewRow {
                slot_number: 1,
                ..Default::default()
            },
        ];
        view.complete(&request, Ok(rows)).unwrap();
        let slots: Vec<_> = view.rows().iter().map(|r| r.slot_number).collect();
        assert_eq!(slots, [1, 3]);

        view.request().unwrap();
        assert!(view.rows().is_empty());
        assert_eq!(view.status(), &FetchStatus::Loading);
    }

    #[test]
    fn roster_form_creates_or_updates() {
        let mut view = RosterView::new(FilterSelection::new().with_section(9));
        let request = view.request_list().unwrap();
        let students = vec![Student {
            id: 42,
            roll_number: "21CS001".to_string(),
            full_name: "Asha".to_string(),
            email: None,
            section_id: Some(9),
        }];
        view.complete_list(&request, Ok(students)).unwrap();

        let create = view.submit("21CS002", "Bala", None).unwrap();
        assert!(matches!(create, RosterMutation::Create(ref f) if f.section_id == 9));

        let form = view.begin_edit(42).unwrap();
        assert_eq!(form.roll, "21CS001");
        let update = view.submit(&form.roll, "Asha K", None).unwrap();
        assert!(matches!(update, RosterMutation::Update(42, ref f) if f.name == "Asha K"));

        view.cancel_edit();
        assert_eq!(view.editing(), None);
        assert!(matches!(view.begin_edit(7), Err(Error::StudentNotFound(7))));
    }

    #[test]
    fn roster_needs_a_section() {
        let view = RosterView::new(FilterSelection::new());
        assert!(view.submit("21CS002", "Bala", None).unwrap_err().is_validation());
        assert!(view.delete(1).unwrap_err().is_validation());
    }
}
