//! This module contains the command-line interface [`Cli`] parser for browsing the weekly schedule
//! and attendance of a section.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::BackendKind;
use crate::models::{Id, Period, Weekday};

/// The command line configuration struct, where the command-line interface parser is automatically
/// derived by [`clap::Parser`].
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Settings file. Defaults to `config.toml` in the working directory, if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides the backend chosen in the settings.
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

    /// The different commands available for browsing schedules and attendance.
    #[command(subcommand)]
    pub command: Command,
}

/// The section, semester and date a command works on.
#[derive(Args, Debug, Clone)]
pub struct Selection {
    #[arg(long)]
    pub section: Id,

    #[arg(long, default_value_t = 1)]
    pub semester: u8,

    /// Any date in the week of interest, as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List departments.
    Departments,

    /// List batches, optionally of one department.
    Batches {
        #[arg(long)]
        dept: Option<Id>,
    },

    /// List sections, optionally of one batch.
    Sections {
        #[arg(long)]
        batch: Option<Id>,
    },

    /// Show the reconciled timetable of a week.
    Week {
        #[command(flatten)]
        selection: Selection,

        /// Open the attendance of one cell, e.g. `Tue:3`.
        #[arg(long, value_parser = parse_cell)]
        open: Option<(Weekday, Period)>,
    },

    /// Show the attendance records of one session.
    Session { session_id: Id },

    /// List every session held for one timetable slot, with its attendance.
    SlotHistory {
        /// The slot's timetable id.
        #[arg(long, required_unless_present = "cell")]
        timetable_id: Option<Id>,

        /// Or the slot's cell in a section's timetable, e.g. `Tue:3`.
        #[arg(
            long,
            value_parser = parse_cell,
            requires = "section",
            conflicts_with = "timetable_id"
        )]
        cell: Option<(Weekday, Period)>,

        #[arg(long)]
        section: Option<Id>,

        #[arg(long, default_value_t = 1)]
        semester: u8,
    },

    /// Show the attendance of every period of one day.
    Overview {
        #[command(flatten)]
        selection: Selection,
    },

    /// Manage the students of a section.
    Roster {
        #[command(subcommand)]
        command: RosterCommand,
    },

    /// List students below the attendance threshold.
    Defaulters {
        #[command(flatten)]
        selection: Selection,

        /// Number of weeks, ending with the selected one, to count.
        #[arg(long, default_value_t = 1)]
        weeks: u32,

        /// Only show students whose roll number or name contains this.
        #[arg(long)]
        search: Option<String>,

        /// Email a notice to each listed student.
        #[arg(long)]
        notify: bool,

        /// Send notices without asking for confirmation.
        #[arg(long, requires = "notify")]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum RosterCommand {
    /// List the students of a section.
    List {
        #[arg(long)]
        section: Id,
    },

    /// Add a student to a section.
    Add {
        #[arg(long)]
        section: Id,
        #[arg(long)]
        roll: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
    },

    /// Change a student's details.
    Update {
        #[arg(long)]
        section: Id,
        /// The student's id, as shown by `roster list`.
        #[arg(long)]
        id: Id,
        #[arg(long)]
        roll: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// Remove a student and their attendance records.
    Remove {
        #[arg(long)]
        section: Id,
        #[arg(long)]
        id: Id,
        /// Remove without asking for confirmation.
        #[arg(long)]
        yes: bool,
    },

    /// Sync a section with a `roll_number,full_name,email` CSV file.
    Import {
        #[arg(long)]
        section: Id,
        file: PathBuf,
        /// Also remove students missing from the file.
        #[arg(long)]
        drop_missing: bool,
    },
}

/// Parses a grid coordinate such as `Tue:3` or `wednesday:9`.
pub fn parse_cell(value: &str) -> Result<(Weekday, Period), String> {
    let (day, period) = value
        .split_once(':')
        .ok_or_else(|| format!("expected DAY:PERIOD, got `{value}`"))?;

    let day = day.trim().parse::<Weekday>().map_err(|e| e.to_string())?;
    let period = period
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(Period::new)
        .ok_or_else(|| format!("period must be between 1 and 9, got `{period}`"))?;

    Ok((day, period))
}
