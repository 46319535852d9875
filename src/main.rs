use anyhow::{Context, Result};
use campus_attendance::aggregate::{defaulters, summarize};
use campus_attendance::cli::{Cli, Command, RosterCommand, Selection as SelectionArgs};
use campus_attendance::config::{Settings, load_config};
use campus_attendance::filter::{FilterSelection, batches_of, sections_of};
use campus_attendance::service::AttendanceService;
use campus_attendance::view::{
    OverviewView, RosterView, Selection, TimetableView, section_tallies, slot_history,
    timetable_slot,
};
use campus_attendance::{create_backend, display, mailer, roster};
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = load_config(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(kind) = cli.backend {
        settings.backend.kind = kind;
    }

    // `RUST_LOG` wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();

    let mut service = create_backend(&settings)?;
    let today = Local::now().date_naive();

    run(cli.command, service.as_mut(), &settings, today)
}

fn filters(selection: &SelectionArgs, today: NaiveDate) -> FilterSelection {
    FilterSelection::new()
        .with_section(selection.section)
        .with_semester(selection.semester)
        .with_date(selection.date.unwrap_or(today))
}

fn run(
    command: Command,
    service: &mut dyn AttendanceService,
    settings: &Settings,
    today: NaiveDate,
) -> Result<()> {
    let threshold = settings.attendance.low_threshold;

    match command {
        Command::Departments => println!("{}", display::departments(&service.departments()?)),

        Command::Batches { dept } => {
            let mut batches = service.batches()?;
            if let Some(dept) = dept {
                batches = batches_of(&batches, dept);
            }
            println!("{}", display::batches(&batches));
        }

        Command::Sections { batch } => {
            let mut sections = service.sections()?;
            if let Some(batch) = batch {
                sections = sections_of(&sections, batch);
            }
            println!("{}", display::sections(&sections));
        }

        Command::Week { selection, open } => {
            let mut view = TimetableView::new(filters(&selection, today));
            view.load(service, today).context("failed to load the week")?;
            if let Some(grid) = view.grid() {
                println!("{}", display::week(grid));
            }

            if let Some((day, period)) = open {
                match view
                    .open(service, day, period)
                    .context("failed to load attendance records")?
                {
                    Selection::Nothing => println!("Nothing is scheduled on {day} period {period}."),
                    Selection::Free => println!("{day} period {period} was declared free."),
                    Selection::NotMarked { .. } => {
                        println!("Attendance for {day} period {period} has not been marked yet.")
                    }
                    Selection::Fetch(_) => println!("{}", display::detail(view.detail(), threshold)),
                }
            }
        }

        Command::Session { session_id } => {
            let records = service
                .session_records(session_id)
                .context("failed to load attendance records")?;
            let summary = summarize(&records);
            println!(
                "{}",
                display::session(
                    &format!("Session {session_id}"),
                    display::records_table(&records),
                    &summary,
                    threshold
                )
            );
        }

        Command::SlotHistory {
            timetable_id,
            cell,
            section,
            semester,
        } => {
            let timetable_id = match (timetable_id, cell, section) {
                (Some(id), _, _) => id,
                (None, Some((day, period)), Some(section)) => {
                    let filters = FilterSelection::new()
                        .with_section(section)
                        .with_semester(semester)
                        .with_date(today);
                    timetable_slot(service, &filters, day, period)
                        .context("failed to find the timetable slot")?
                }
                _ => anyhow::bail!("pass --timetable-id, or --section with --cell"),
            };
            let entries =
                slot_history(service, timetable_id).context("failed to load the slot history")?;
            println!("Timetable slot {timetable_id}");
            println!("{}", display::history(&entries, threshold));
        }

        Command::Overview { selection } => {
            let mut view = OverviewView::new(filters(&selection, today));
            view.load(service).context("failed to load the daily overview")?;
            println!("{}", display::overview(view.rows(), threshold));
        }

        Command::Roster { command } => run_roster(command, service)?,

        Command::Defaulters {
            selection,
            weeks,
            search,
            notify,
            yes,
        } => {
            let tallies = section_tallies(service, &filters(&selection, today), weeks, today)
                .context("failed to tally attendance")?;
            let mut listed = defaulters(&tallies, threshold);
            if let Some(query) = &search {
                listed.retain(|t| t.matches(query));
            }
            println!("{}", display::defaulters(&listed, threshold));

            if notify && !listed.is_empty() {
                let students = service.students_in_section(selection.section)?;
                let recipients = mailer::recipients(&listed, &students);
                if recipients.is_empty() {
                    println!("None of these students has an email on file.");
                    return Ok(());
                }

                let emails: Vec<&str> = recipients.iter().map(|r| r.email.as_str()).collect();
                println!("Will email the following students: {emails:?}");
                if !yes && !mailer::confirm("Proceed?")? {
                    println!("Emailing canceled!");
                    return Ok(());
                }

                let sent = mailer::send_notices(settings.smtp.as_ref(), &recipients, threshold)?;
                println!("Sent {sent} notices.");
            }
        }
    }

    Ok(())
}

fn run_roster(command: RosterCommand, service: &mut dyn AttendanceService) -> Result<()> {
    match command {
        RosterCommand::List { section } => {
            let mut view = RosterView::new(FilterSelection::new().with_section(section));
            view.load(service)?;
            println!("{}", display::roster(view.students()));
        }

        RosterCommand::Add {
            section,
            roll,
            name,
            email,
        } => {
            let mut view = RosterView::new(FilterSelection::new().with_section(section));
            let mutation = view.submit(&roll, &name, email.as_deref())?;
            view.apply(service, &mutation)?;
            println!("{}", display::roster(view.students()));
        }

        RosterCommand::Update {
            section,
            id,
            roll,
            name,
            email,
        } => {
            let mut view = RosterView::new(FilterSelection::new().with_section(section));
            view.load(service)?;
            let current = view.begin_edit(id)?;
            let mutation = view.submit(
                roll.as_deref().unwrap_or(&current.roll),
                name.as_deref().unwrap_or(&current.name),
                email.as_deref().or(current.email.as_deref()),
            )?;
            view.apply(service, &mutation)?;
            println!("{}", display::roster(view.students()));
        }

        RosterCommand::Remove { section, id, yes } => {
            let mut view = RosterView::new(FilterSelection::new().with_section(section));
            view.load(service)?;
            let mutation = view.delete(id)?;

            let who = view
                .students()
                .iter()
                .find(|s| s.id == id)
                .map(|s| format!("{} ({})", s.full_name, s.roll_number))
                .unwrap_or_else(|| format!("student {id}"));
            let prompt = format!("Remove {who}? This deletes their attendance records too.");
            if !yes && !mailer::confirm(&prompt)? {
                println!("Nothing removed.");
                return Ok(());
            }

            view.apply(service, &mutation)?;
            println!("{}", display::roster(view.students()));
        }

        RosterCommand::Import {
            section,
            file,
            drop_missing,
        } => {
            let entries = roster::read_roster_file(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;

            let mut view = RosterView::new(FilterSelection::new().with_section(section));
            view.load(service)?;
            let plan = roster::plan_sync(view.students(), &entries, section)?;
            if plan.is_empty() {
                println!("Roster is already up to date.");
                return Ok(());
            }

            let report = roster::apply_plan(service, &plan, drop_missing)?;
            println!(
                "Students added: {}, updated: {}, dropped: {}",
                report.added, report.updated, report.dropped
            );
            if !drop_missing && !plan.dropped.is_empty() {
                let rolls: Vec<&str> = plan.dropped.iter().map(|s| s.roll_number.as_str()).collect();
                println!("Not in the file (kept, pass --drop-missing to remove): {rolls:?}");
            }
        }
    }

    Ok(())
}
