use campus_attendance::Error;
use campus_attendance::aggregate::{AttendanceLevel, Percentage, defaulters};
use campus_attendance::filter::{FilterSelection, batches_of, sections_of};
use campus_attendance::models::{Id, Period, SessionCategory, StudentForm, Weekday};
use campus_attendance::roster::{apply_plan, plan_sync, read_roster};
use campus_attendance::schedule::CellState;
use campus_attendance::service::AttendanceService;
use campus_attendance::store::{
    NewBatch, NewDepartment, NewSection, NewSession, NewSlot, SqliteStore,
};
use campus_attendance::view::{
    Applied, Detail, FetchStatus, OverviewView, RosterMutation, RosterView, Selection,
    TimetableView, section_tallies, slot_history, timetable_slot,
};
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn period(n: i64) -> Period {
    Period::new(n).unwrap()
}

struct Fixture {
    store: SqliteStore,
    section_id: Id,
    other_section_id: Id,
    sessions: Vec<Id>,
}

fn slot<'a>(
    section_id: Id,
    day: &'a str,
    slot_number: i32,
    code: &'a str,
    name: &'a str,
) -> NewSlot<'a> {
    NewSlot {
        section_id,
        semester: 3,
        day,
        slot_number,
        course_code: code,
        course_name: name,
        faculty_name: "Dr. Meera Nair",
        room_info: None,
    }
}

fn session(timetable_id: Id, session_date: NaiveDate, category: &str) -> NewSession<'_> {
    NewSession {
        timetable_id,
        session_date,
        category,
        actual_course_code: None,
        actual_course_name: None,
        is_verified_by_faculty: false,
    }
}

fn fixture() -> Fixture {
    let mut store = SqliteStore::open_in_memory().unwrap();

    let dept_id = store
        .insert_department(&NewDepartment {
            dept_code: "CSE",
            dept_name: "Computer Science",
        })
        .unwrap();
    let batch_id = store
        .insert_batch(&NewBatch {
            dept_id,
            batch_name: "2023-2027",
        })
        .unwrap();
    let section_id = store
        .insert_section(&NewSection {
            batch_id,
            section_name: "A",
        })
        .unwrap();
    let other_section_id = store
        .insert_section(&NewSection {
            batch_id,
            section_name: "B",
        })
        .unwrap();

    for (roll, name, email) in [
        ("23CS001", "Aditi", Some("aditi@college.edu")),
        ("23CS002", "Bharath", None),
        ("23CS003", "Chitra", Some("chitra@college.edu")),
        ("23CS004", "Dinesh", None),
    ] {
        store
            .add_student(&StudentForm {
                roll: roll.to_string(),
                name: name.to_string(),
                email: email.map(str::to_string),
                section_id,
            })
            .unwrap();
    }

    let mon = date(2026, 10, 12);
    let tue = date(2026, 10, 13);

    let mut add_slot = |section_id: Id, day: &str, number: i32, code: &str, name: &str| {
        store.insert_slot(&slot(section_id, day, number, code, name)).unwrap()
    };
    let mon1 = add_slot(section_id, "Mon", 1, "CSE201", "Data Structures");
    // Taught on Monday but never marked.
    add_slot(section_id, "Mon", 2, "MA201", "Discrete Mathematics");
    let tue3 = add_slot(section_id, "Tue", 3, "CSE202", "Operating Systems");
    let tue4 = add_slot(section_id, "Tue", 4, "CSE203", "Computer Networks");
    // Later in the week, not taught yet.
    add_slot(section_id, "Thu", 1, "CSE201", "Data Structures");
    // Another section's slot must never leak into this one.
    add_slot(other_section_id, "Mon", 1, "PH101", "Physics");

    let normal = store.insert_session(&session(mon1, mon, "normal")).unwrap();
    let swap = store
        .insert_session(&NewSession {
            actual_course_code: Some("CSE205"),
            actual_course_name: Some("Compilers"),
            is_verified_by_faculty: true,
            ..session(tue3, tue, "swap")
        })
        .unwrap();
    let free = store.insert_session(&session(tue4, tue, "free")).unwrap();

    store
        .mark(normal, &["23CS001", "23CS002", "23CS003"], "Present")
        .unwrap();
    store.mark(normal, &["23CS004"], "Absent").unwrap();
    store.mark(swap, &["23CS001", "23CS003"], "present").unwrap();
    store.mark(swap, &["23CS002", "23CS004"], "Absent").unwrap();

    Fixture {
        store,
        section_id,
        other_section_id,
        sessions: vec![normal, swap, free],
    }
}

fn filters(section_id: Id) -> FilterSelection {
    FilterSelection::new()
        .with_section(section_id)
        .with_semester(3)
        .with_date(date(2026, 10, 15))
}

/// Wednesday of the fixture week, which starts on Monday 2026-10-12.
fn today() -> NaiveDate {
    date(2026, 10, 14)
}

#[test]
fn cascade_narrows_reference_data() {
    let mut fx = fixture();

    let departments = fx.store.departments().unwrap();
    assert_eq!(departments.len(), 1);

    let batches = batches_of(&fx.store.batches().unwrap(), departments[0].id);
    assert_eq!(batches.len(), 1);

    let sections = sections_of(&fx.store.sections().unwrap(), batches[0].id);
    let names: Vec<_> = sections.iter().map(|s| s.section_name.as_str()).collect();
    assert_eq!(names, ["A", "B"]);
}

#[test_log::test]
fn week_grid_reconciles_every_state() {
    let mut fx = fixture();
    let mut view = TimetableView::new(filters(fx.section_id));

    view.load(&mut fx.store, today()).unwrap();
    let grid = view.grid().unwrap();

    assert_eq!(grid.week_start(), date(2026, 10, 12));
    assert_eq!(grid.cells().len(), 45);
    assert!(grid.warnings().is_empty());

    let mon1 = grid.cell(Weekday::Mon, period(1));
    assert!(matches!(mon1.state, CellState::Normal { .. }));
    assert_eq!(mon1.primary_subject(), Some("Data Structures"));

    assert!(matches!(
        grid.cell(Weekday::Mon, period(2)).state,
        CellState::Unmarked(_)
    ));

    let tue3 = grid.cell(Weekday::Tue, period(3));
    assert_eq!(tue3.category(), Some(SessionCategory::Swap));
    assert_eq!(tue3.primary_subject(), Some("CSE205"));
    assert_eq!(tue3.struck_subject(), Some("CSE202"));
    assert!(tue3.is_verified());

    let tue4 = grid.cell(Weekday::Tue, period(4));
    assert!(matches!(tue4.state, CellState::Free { .. }));
    assert_eq!(tue4.session_id(), None);

    assert!(matches!(
        grid.cell(Weekday::Thu, period(1)).state,
        CellState::Pending(_)
    ));
    assert!(grid.cell(Weekday::Fri, period(9)).is_empty());
}

#[test]
fn opening_a_swap_loads_its_summary() {
    let mut fx = fixture();
    let mut view = TimetableView::new(filters(fx.section_id));
    view.load(&mut fx.store, today()).unwrap();

    let selection = view.open(&mut fx.store, Weekday::Tue, period(3)).unwrap();
    assert!(matches!(
        selection,
        Selection::Fetch(request) if request.session_id == fx.sessions[1]
    ));

    let Detail::Loaded {
        records, summary, ..
    } = view.detail()
    else {
        panic!("records should be loaded");
    };
    let rolls: Vec<_> = records.iter().map(|r| r.roll_number.as_str()).collect();
    assert_eq!(rolls, ["23CS001", "23CS002", "23CS003", "23CS004"]);
    assert_eq!((summary.present, summary.absent, summary.total), (2, 2, 4));
    assert_eq!(summary.percentage, Percentage::Value(50.0));
    assert_eq!(summary.level(75.0), Some(AttendanceLevel::Low));
}

#[test]
fn free_and_unmarked_cells_do_not_fetch() {
    let mut fx = fixture();
    let mut view = TimetableView::new(filters(fx.section_id));
    view.load(&mut fx.store, today()).unwrap();

    assert_eq!(
        view.open(&mut fx.store, Weekday::Tue, period(4)).unwrap(),
        Selection::Free
    );
    assert_eq!(
        view.open(&mut fx.store, Weekday::Mon, period(2)).unwrap(),
        Selection::NotMarked { overdue: true }
    );
    assert_eq!(
        view.open(&mut fx.store, Weekday::Wed, period(5)).unwrap(),
        Selection::Nothing
    );
    assert_eq!(view.detail(), &Detail::Closed);
}

#[test]
fn an_empty_section_is_a_blank_week_not_an_error() {
    let mut fx = fixture();
    let mut view = TimetableView::new(
        FilterSelection::new()
            .with_section(fx.other_section_id)
            .with_semester(5)
            .with_date(today()),
    );

    view.load(&mut fx.store, today()).unwrap();
    assert!(view.grid().unwrap().is_blank());
}

#[test]
fn overview_counts_the_day() {
    let mut fx = fixture();
    let mut view = OverviewView::new(
        FilterSelection::new()
            .with_section(fx.section_id)
            .with_semester(3)
            .with_date(date(2026, 10, 13)),
    );

    view.load(&mut fx.store).unwrap();
    let rows = view.rows();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].slot_number, 3);
    assert_eq!(rows[0].display_course(), "Compilers");
    assert_eq!(rows[0].present_count, Some(2));
    assert_eq!(rows[0].absent_count, Some(2));

    assert_eq!(rows[1].slot_number, 4);
    assert_eq!(rows[1].category(), Some(SessionCategory::Free));
    assert_eq!(rows[1].total_count, None);
}

#[test]
fn overview_of_a_weekend_is_empty() {
    let mut fx = fixture();
    let mut view = OverviewView::new(
        FilterSelection::new()
            .with_section(fx.section_id)
            .with_semester(3)
            .with_date(date(2026, 10, 17)),
    );

    view.load(&mut fx.store).unwrap();
    assert!(view.rows().is_empty());
}

#[test]
fn tallies_find_defaulters_over_the_week() {
    let mut fx = fixture();

    let tallies = section_tallies(&mut fx.store, &filters(fx.section_id), 1, today()).unwrap();
    assert_eq!(tallies.len(), 4);
    assert!(tallies.iter().all(|t| t.held == 2));

    let low = defaulters(&tallies, 75.0);
    let rolls: Vec<_> = low.iter().map(|t| t.roll_number.as_str()).collect();
    assert_eq!(rolls, ["23CS002", "23CS004"]);
    assert_eq!(low[1].percentage(), Percentage::Value(0.0));

    let older = section_tallies(&mut fx.store, &filters(fx.section_id), 3, today()).unwrap();
    assert_eq!(older, tallies);
}

#[test]
fn roster_mutations_refresh_the_list() {
    let mut fx = fixture();
    let mut view = RosterView::new(FilterSelection::new().with_section(fx.section_id));
    view.load(&mut fx.store).unwrap();
    assert_eq!(view.students().len(), 4);

    let create = view.submit(" 23CS005 ", "Esha", Some("esha@college.edu")).unwrap();
    view.apply(&mut fx.store, &create).unwrap();
    assert_eq!(view.students().len(), 5);

    let esha = view
        .students()
        .iter()
        .find(|s| s.roll_number == "23CS005")
        .unwrap()
        .id;
    view.begin_edit(esha).unwrap();
    let update = view.submit("23CS005", "Esha K", None).unwrap();
    assert!(matches!(update, RosterMutation::Update(id, _) if id == esha));
    view.apply(&mut fx.store, &update).unwrap();
    assert_eq!(view.editing(), None);
    let renamed = view.students().iter().find(|s| s.id == esha).unwrap();
    assert_eq!(renamed.full_name, "Esha K");
    assert_eq!(renamed.email, None);

    let delete = view.delete(esha).unwrap();
    view.apply(&mut fx.store, &delete).unwrap();
    assert_eq!(view.students().len(), 4);
}

#[test]
fn removing_a_student_removes_their_records() {
    let mut fx = fixture();
    let dinesh = fx.store.student_by_roll("23CS004").unwrap().unwrap();

    fx.store.delete_student(dinesh.id).unwrap();

    let records = fx.store.session_records(fx.sessions[0]).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.roll_number != "23CS004"));
    assert!(matches!(
        fx.store.delete_student(dinesh.id),
        Err(Error::StudentNotFound(_))
    ));
}

#[test]
fn stale_roster_responses_are_ignored() {
    let mut fx = fixture();
    let mut view = RosterView::new(FilterSelection::new().with_section(fx.section_id));

    let request = view.request_list().unwrap();
    view.filters_mut().select_section(Some(fx.other_section_id));
    let students = fx.store.students_in_section(request.section_id);

    assert_eq!(view.complete_list(&request, students).unwrap(), Applied::Stale);
    assert!(view.students().is_empty());
    assert_eq!(view.status(), &FetchStatus::Idle);
}

#[test]
fn slot_history_lists_every_session_of_a_slot() {
    let mut fx = fixture();
    let selection = filters(fx.section_id);

    let tue3 = timetable_slot(&mut fx.store, &selection, Weekday::Tue, period(3)).unwrap();
    let earlier = fx
        .store
        .insert_session(&session(tue3, date(2026, 10, 6), "normal"))
        .unwrap();
    fx.store
        .mark(earlier, &["23CS001", "23CS002", "23CS003", "23CS004"], "Present")
        .unwrap();

    let history = slot_history(&mut fx.store, tue3).unwrap();
    let ids: Vec<_> = history.iter().map(|e| e.session.id).collect();
    assert_eq!(ids, [fx.sessions[1], earlier]);

    let latest = history[0].summary.unwrap();
    assert_eq!(history[0].session.category(), Some(SessionCategory::Swap));
    assert_eq!((latest.present, latest.total), (2, 4));
    assert_eq!(history[1].summary.unwrap().percentage, Percentage::Value(100.0));

    let tue4 = timetable_slot(&mut fx.store, &selection, Weekday::Tue, period(4)).unwrap();
    let free = slot_history(&mut fx.store, tue4).unwrap();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].summary, None);

    let mon2 = timetable_slot(&mut fx.store, &selection, Weekday::Mon, period(2)).unwrap();
    assert!(slot_history(&mut fx.store, mon2).unwrap().is_empty());

    let nothing = timetable_slot(&mut fx.store, &selection, Weekday::Wed, period(5));
    assert!(nothing.unwrap_err().is_validation());
}

#[test]
fn importing_a_roster_syncs_by_roll_number() {
    let mut fx = fixture();
    let csv = "roll_number,full_name,email\n\
               23CS001,Aditi,aditi@college.edu\n\
               23CS002,Bharath R,\n\
               23CS005,Esha,\n";
    let entries = read_roster(csv.as_bytes()).unwrap();

    let current = fx.store.students_in_section(fx.section_id).unwrap();
    let plan = plan_sync(&current, &entries, fx.section_id).unwrap();
    assert_eq!(plan.added.len(), 1);
    assert_eq!(plan.updated.len(), 1);
    assert_eq!(plan.dropped.len(), 2);

    let report = apply_plan(&mut fx.store, &plan, false).unwrap();
    assert_eq!((report.added, report.updated, report.dropped), (1, 1, 0));
    assert_eq!(fx.store.students_in_section(fx.section_id).unwrap().len(), 5);
    let bharath = fx.store.student_by_roll("23CS002").unwrap().unwrap();
    assert_eq!(bharath.full_name, "Bharath R");
}

#[test]
fn importing_can_drop_missing_students() {
    let mut fx = fixture();
    let csv = "roll_number,full_name,email
23CS001,Aditi,aditi@college.edu
";
    let entries = read_roster(csv.as_bytes()).unwrap();

    let current = fx.store.students_in_section(fx.section_id).unwrap();
    let plan = plan_sync(&current, &entries, fx.section_id).unwrap();
    let report = apply_plan(&mut fx.store, &plan, true).unwrap();

    assert_eq!((report.added, report.updated, report.dropped), (0, 0, 3));
    let left = fx.store.students_in_section(fx.section_id).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(fx.store.session_records(fx.sessions[0]).unwrap().len(), 1);
}
