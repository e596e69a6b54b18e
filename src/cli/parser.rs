use clap::{Args, Parser, Subcommand};

/// Command-line interface definition for campustap
/// Gate scanning, homeroom attendance and clinic workflow on SQLite
#[derive(Parser)]
#[command(
    name = "campustap",
    version = env!("CARGO_PKG_VERSION"),
    about = "Campus gate tap processing, homeroom attendance and clinic visits using SQLite",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    /// Replay at a fixed local time instead of the system clock ("YYYY-MM-DD HH:MM[:SS]")
    #[arg(global = true, long = "at", hide = true)]
    pub at: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Either a scanned code or a raw student id.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct StudentRef {
    /// Scanned badge / QR code
    #[arg(long = "code")]
    pub code: Option<String>,

    /// Student id (bypasses code decoding)
    #[arg(long = "student")]
    pub student: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Show or validate the configuration file
    Config {
        #[arg(long = "print", help = "Print the current configuration")]
        print_config: bool,

        #[arg(long = "check", help = "Validate time fields and thresholds")]
        check: bool,
    },

    /// Print or manage the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },

    /// Decode a scanned code and show the student it resolves to
    Decode {
        /// Raw scanned code
        code: String,
    },

    /// Process a gate tap
    Scan {
        /// Direction of the tap: in | out
        direction: String,

        #[command(flatten)]
        who: StudentRef,

        /// Gatekeeper id
        #[arg(long = "actor")]
        actor: String,
    },

    /// Clinic pass and visit workflow
    Clinic {
        #[command(subcommand)]
        action: ClinicCommand,
    },

    /// List or acknowledge notifications for a recipient
    Notify {
        #[arg(long = "recipient")]
        recipient: String,

        #[arg(long = "unread", help = "Only unread notifications")]
        unread: bool,

        #[arg(long = "read", value_name = "ID", help = "Mark a notification as read")]
        read: Option<i64>,
    },

    /// Print the homeroom attendance ledger for a day
    Attendance {
        /// Date (YYYY-MM-DD), default today
        #[arg(long = "date")]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ClinicCommand {
    /// Teacher issues a clinic pass
    Issue {
        #[arg(long = "teacher")]
        teacher: String,
        #[arg(long = "student")]
        student: String,
        #[arg(long = "reason")]
        reason: String,
    },

    /// Clinic staff scan a student in
    Arrive {
        #[arg(long = "staff")]
        staff: String,
        #[command(flatten)]
        who: StudentRef,
        #[arg(long = "notes", default_value = "")]
        notes: String,
    },

    /// Clinic staff scan a student out (self-discharge)
    Depart {
        #[arg(long = "staff")]
        staff: String,
        #[command(flatten)]
        who: StudentRef,
        #[arg(long = "notes", default_value = "")]
        notes: String,
    },

    /// Approve a pending pass
    Approve {
        #[arg(long = "staff")]
        staff: String,
        #[arg(long = "pass")]
        pass: i64,
        #[arg(long = "notes", default_value = "")]
        notes: String,
    },

    /// Reject a pending pass (reason required)
    Reject {
        #[arg(long = "staff")]
        staff: String,
        #[arg(long = "pass")]
        pass: i64,
        #[arg(long = "reason")]
        reason: String,
    },

    /// Record diagnosis / treatment / action for a visit
    Findings {
        #[arg(long = "staff")]
        staff: String,
        #[arg(long = "visit")]
        visit: i64,
        #[arg(long = "diagnosis", default_value = "")]
        diagnosis: String,
        #[arg(long = "treatment", default_value = "")]
        treatment: String,
        #[arg(long = "action", default_value = "")]
        action: String,
    },

    /// Homeroom teacher approves recorded findings
    TeacherApprove {
        #[arg(long = "teacher")]
        teacher: String,
        #[arg(long = "visit")]
        visit: i64,
    },

    /// Close a visit: completed | sent_home
    Complete {
        #[arg(long = "staff")]
        staff: String,
        #[arg(long = "visit")]
        visit: i64,
        #[arg(long = "outcome", default_value = "completed")]
        outcome: String,
        #[arg(long = "notes", default_value = "")]
        notes: String,
    },
}
