//! Decides which backup [Kind]s are due on a given day.

use chrono::{Datelike, NaiveDate};
use derive_more::Display;

use crate::config::BackupConfig;

/// Category of a backup run.
///
/// The kind determines the granularity of the output folder name:
/// monthly runs share one folder per month, weekly runs get one folder per day.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, clap::ValueEnum)]
pub enum Kind {
    #[display("monthly")]
    Monthly,
    #[display("weekly")]
    Weekly,
}

impl Kind {
    /// Folder name of a run of this kind started on `date`.
    pub fn folder_name(self, date: NaiveDate) -> String {
        match self {
            Kind::Monthly => format!("backup_monthly_{}", date.format("%Y-%m")),
            Kind::Weekly => format!("backup_weekly_{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Backup kinds due on a certain day.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    pub monthly: bool,
    pub weekly: bool,
}

impl Schedule {
    /// Returns whether no run is due at all.
    pub fn is_empty(&self) -> bool {
        !self.monthly && !self.weekly
    }

    /// Due kinds in execution order, monthly first.
    pub fn kinds(&self) -> impl Iterator<Item = Kind> {
        let monthly = self.monthly.then_some(Kind::Monthly);
        let weekly = self.weekly.then_some(Kind::Weekly);
        monthly.into_iter().chain(weekly)
    }
}

/// Returns if `date` is the last calendar day of its month.
pub fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt()
        .is_none_or(|next| next.month() != date.month())
}

/// Determine the [Schedule] for `today`.
///
/// A `forced` kind is always due in addition to whatever the calendar selects.
pub fn decide(today: NaiveDate, config: &BackupConfig, forced: Option<Kind>) -> Schedule {
    let monthly = is_last_day_of_month(today) || forced == Some(Kind::Monthly);
    if monthly {
        log::info!(target: "schedule", "Monthly backup due (last day of month or forced)");
    } else {
        log::info!(target: "schedule", "Skipping monthly backup: not the last day of the month");
    }

    let weekly = today.weekday() == config.weekly_backup_day || forced == Some(Kind::Weekly);
    if weekly {
        log::info!(target: "schedule", "Weekly backup due (configured day {} or forced)", config.weekly_backup_day);
    } else {
        log::info!(target: "schedule", "Skipping weekly backup: today is not {}", config.weekly_backup_day);
    }

    Schedule { monthly, weekly }
}
