use crate::export::{ExportFormat, ExportTarget};
use clap::{Parser, Subcommand};

/// Command-line interface definition for rReplyTracker
/// CLI application to measure email response times with SQLite
#[derive(Parser)]
#[command(
    name = "rreplytracker",
    version = env!("CARGO_PKG_VERSION"),
    about = "Track how fast team mailboxes answer external email, in raw and working hours",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Override the directory holding the per-mailbox JSON exports
    #[arg(global = true, long = "mail-dir")]
    pub mail_dir: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Manage the configuration file (view, check or edit)
    Config {
        #[arg(long = "print", help = "Print the current configuration")]
        print_config: bool,

        #[arg(long = "check", help = "Check configuration file for missing or invalid fields")]
        check: bool,

        #[arg(
            long = "edit",
            help = "Edit the configuration file (default editor: $EDITOR, or nano/notepad)"
        )]
        edit_config: bool,

        #[arg(
            long = "editor",
            help = "Specify the editor to use (vim, nano, or custom path)"
        )]
        editor: Option<String>,
    },

    /// Manage the database (migrations, integrity checks, etc.)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity")]
        check: bool,

        #[arg(long = "vacuum", help = "Optimize the database using VACUUM")]
        vacuum: bool,

        #[arg(long = "info", help = "Show database information")]
        info: bool,
    },

    /// Print the internal audit log
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },

    /// Manage tracked mailboxes
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage out-of-office periods
    Ooo {
        #[command(subcommand)]
        action: OooAction,
    },

    /// Fetch mail, reconcile threads and refresh daily statistics
    Sync {
        #[arg(long, help = "Only sync this tracked user")]
        user: Option<String>,

        #[arg(long, help = "Ignore the last sync time and re-read the lookback window")]
        backfill: bool,

        #[arg(long, value_name = "DAYS", help = "Lookback window in days (default: backfill_days)")]
        lookback: Option<i64>,

        #[arg(long = "dry-run", help = "Reconcile and report without writing")]
        dry_run: bool,
    },

    /// List stored response pairs
    Pairs {
        #[arg(long)]
        user: Option<String>,

        #[arg(long, short, help = "YYYY, YYYY-MM, YYYY-MM-DD or start:end (default: this month)")]
        period: Option<String>,
    },

    /// Exclude a stored pair from statistics
    Exclude {
        thread_id: String,

        /// Reply timestamp (YYYY-MM-DDTHH:MM:SSZ or RFC 3339)
        replied_at: String,

        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Restore a previously excluded pair
    Restore {
        thread_id: String,
        replied_at: String,
    },

    /// Let a pair past the maximum response gap on the next sync
    Whitelist {
        thread_id: String,
        replied_at: String,

        #[arg(long, required_unless_present = "remove")]
        user: Option<String>,

        #[arg(long, default_value = "")]
        note: String,

        #[arg(long, help = "Remove the whitelist entry instead")]
        remove: bool,
    },

    /// List excluded and whitelisted pairs
    Overrides {
        #[arg(long)]
        user: Option<String>,
    },

    /// Show daily statistics and a period summary
    Stats {
        #[arg(long)]
        user: Option<String>,

        #[arg(long, short, help = "YYYY, YYYY-MM, YYYY-MM-DD or start:end (default: this month)")]
        period: Option<String>,
    },

    /// Export pairs or daily statistics
    Export {
        #[arg(long, value_enum, default_value = "pairs")]
        what: ExportTarget,

        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,

        /// Absolute output path
        #[arg(long)]
        file: String,

        #[arg(long, help = "all, YYYY, YYYY-MM, YYYY-MM-DD or start:end")]
        range: Option<String>,

        #[arg(long)]
        user: Option<String>,

        #[arg(long, help = "Overwrite an existing file without asking")]
        force: bool,
    },
}

/// Working-hours options shared by `user add` and `user edit`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ScheduleArgs {
    #[arg(long, help = "Display name")]
    pub name: Option<String>,

    #[arg(long = "function", help = "Team function (e.g. admissions, support)")]
    pub team_function: Option<String>,

    #[arg(long, value_name = "HH:MM", help = "Start of the working day")]
    pub start: Option<String>,

    #[arg(long, value_name = "HH:MM", help = "End of the working day")]
    pub end: Option<String>,

    #[arg(long, value_name = "IANA", help = "Timezone, e.g. America/New_York")]
    pub tz: Option<String>,
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Start tracking a mailbox
    Add {
        email: String,

        #[command(flatten)]
        schedule: ScheduleArgs,

        #[arg(long = "include-weekends", help = "Count Saturdays and Sundays as working days")]
        include_weekends: bool,
    },

    /// Change profile or working hours
    Edit {
        email: String,

        #[command(flatten)]
        schedule: ScheduleArgs,

        #[arg(long = "include-weekends", conflicts_with = "exclude_weekends")]
        include_weekends: bool,

        #[arg(long = "exclude-weekends")]
        exclude_weekends: bool,
    },

    /// List tracked mailboxes
    List {
        #[arg(long, help = "Include deactivated users")]
        all: bool,
    },

    /// Stop syncing a mailbox (data is kept)
    Deactivate { email: String },

    /// Resume syncing a mailbox
    Activate { email: String },
}

#[derive(Subcommand)]
pub enum OooAction {
    /// Add an out-of-office period (inclusive dates)
    Add {
        email: String,
        /// First day (YYYY-MM-DD)
        start: String,
        /// Last day (YYYY-MM-DD)
        end: String,

        #[arg(long = "desc")]
        description: Option<String>,
    },

    /// List out-of-office periods of a user
    List { email: String },

    /// Delete an out-of-office period
    Del {
        email: String,
        start: String,
        end: String,
    },
}
