use clap::{Parser, Subcommand, ValueEnum};
use focus_core::clock::local_offset;
use focus_core::error::AppError;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override settings for this run only (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: focus add "Write report" --in 2h
    /// Example: focus add "Tax return" --deadline "2025-12-31 17:00" -d "Federal and state"
    Add {
        title: String,
        #[arg(short = 'd', long)]
        description: Option<String>,
        /// Deadline as "YYYY-MM-DD HH:MM" (local time) or RFC 3339
        #[arg(long, conflicts_with = "within")]
        deadline: Option<String>,
        /// Deadline relative to now, e.g. 90s, 45m, 2h, 1d, 1h30m
        #[arg(long = "in", value_name = "DURATION")]
        within: Option<String>,
    },
    /// Edit a task's title, description or deadline
    ///
    /// Example: focus edit task-01h... --title "Write final report"
    /// Example: focus edit task-01h... --clear-deadline
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short = 'd', long)]
        description: Option<String>,
        #[arg(long, conflicts_with_all = ["within", "clear_deadline"])]
        deadline: Option<String>,
        #[arg(long = "in", value_name = "DURATION", conflicts_with = "clear_deadline")]
        within: Option<String>,
        #[arg(long)]
        clear_deadline: bool,
    },
    /// Complete a task after the honesty check
    ///
    /// Example: focus done task-01h...
    /// Example: focus done task-01h... --yes --proof receipt.png
    Done {
        id: String,
        /// Answer the honesty check with yes
        #[arg(short = 'y', long)]
        yes: bool,
        /// Image file attached as proof
        #[arg(long, value_name = "PATH", conflicts_with = "skip_proof")]
        proof: Option<String>,
        #[arg(long)]
        skip_proof: bool,
    },
    /// Delete a task: pending tasks must convince the judge
    ///
    /// Example: focus delete task-01h... --reason "Duplicate task"
    /// Example: focus delete task-01h... --yes
    Delete {
        id: String,
        /// Reasons submitted to the judge in order, before prompting
        #[arg(long = "reason", value_name = "TEXT")]
        reasons: Vec<String>,
        /// Confirm deleting a completed or failed task
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// List tasks in the recycle bin
    Bin,
    /// Restore a task from the recycle bin
    Restore { id: String },
    /// Permanently delete a task from the recycle bin
    Purge { id: String },
    /// List tasks
    ///
    /// Example: focus list
    /// Example: focus list failed
    List {
        #[arg(value_enum, default_value_t = ListView::All)]
        view: ListView,
    },
    /// Show details of a task
    Show { id: String },
    /// Enforce deadlines continuously and show countdowns
    ///
    /// Example: focus watch
    /// Example: focus watch --ticks 1
    Watch {
        /// Stop after this many sweeps
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Add a task from a spoken command transcript
    ///
    /// Example: focus voice "remind me to call mom in 2 hours"
    Voice {
        #[arg(required = true, num_args = 1..)]
        transcript: Vec<String>,
    },
    /// Show a motivational quote from a mentor
    Quote,
    /// Show usage statistics
    Stats,
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    /// Manage mentors and their quotes
    Mentor {
        #[command(subcommand)]
        action: MentorCommand,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListView {
    All,
    Pending,
    Completed,
    Failed,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the saved settings
    Show,
    /// Save a setting
    ///
    /// Example: focus settings set theme=dark
    Set {
        #[arg(value_name = "KEY=VALUE")]
        assignment: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum MentorCommand {
    /// List mentors
    List,
    /// Add a mentor
    ///
    /// Example: focus mentor add "Serena Williams" --photo serena.jpg
    Add {
        name: String,
        #[arg(long, value_name = "PATH")]
        photo: Option<String>,
    },
    /// Rename a mentor
    Rename { id: String, name: String },
    /// Remove a custom mentor
    Remove { id: String },
    /// Add a manual quote
    QuoteAdd { id: String, quote: String },
    /// Remove a manual quote by its 1-based position
    QuoteRemove { id: String, index: usize },
    /// Make a mentor the active one
    Use { id: String },
}

/// Parse a relative duration such as `45m`, `2h`, `1d` or `1h30m`.
pub fn parse_relative_duration(raw: &str) -> Result<Duration, AppError> {
    let trimmed = raw.trim().to_ascii_lowercase();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("duration cannot be empty"));
    }

    let mut total = Duration::ZERO;
    let mut digits = String::new();

    for ch in trimmed.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }

        let amount: i64 = digits
            .parse()
            .map_err(|_| AppError::invalid_input(format!("invalid duration '{raw}'")))?;
        digits.clear();

        let unit_seconds: i64 = match ch {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            'd' => 86_400,
            'w' => 604_800,
            _ => {
                return Err(AppError::invalid_input(format!(
                    "invalid duration unit '{ch}' in '{raw}'"
                )));
            }
        };
        total = amount
            .checked_mul(unit_seconds)
            .map(Duration::seconds)
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| AppError::invalid_input(format!("duration '{raw}' is too long")))?;
    }

    if !digits.is_empty() {
        return Err(AppError::invalid_input(format!(
            "duration '{raw}' needs a unit (s, m, h, d, w)"
        )));
    }
    if total <= Duration::ZERO {
        return Err(AppError::invalid_input("duration must be positive"));
    }

    Ok(total)
}

/// Parse an absolute deadline: RFC 3339, or local `YYYY-MM-DD HH:MM[:SS]`.
pub fn parse_deadline(raw: &str) -> Result<OffsetDateTime, AppError> {
    let trimmed = raw.trim();
    if let Ok(instant) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(instant);
    }

    let with_seconds = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let without_seconds = format_description!("[year]-[month]-[day] [hour]:[minute]");

    PrimitiveDateTime::parse(trimmed, &with_seconds)
        .or_else(|_| PrimitiveDateTime::parse(trimmed, &without_seconds))
        .map(|local| local.assume_offset(local_offset()))
        .map_err(|_| {
            AppError::invalid_input(format!(
                "invalid deadline '{raw}': expected YYYY-MM-DD HH:MM or RFC 3339"
            ))
        })
}
