mod commands;
mod config;
mod logging;

use anyhow::{Result, bail};
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    cmd_analytics, cmd_dashboard, cmd_export, cmd_import_csv, cmd_login, cmd_logout,
    cmd_profile_goals, cmd_profile_set, cmd_profile_show, cmd_reset, cmd_signup,
    cmd_weight_delete, cmd_weight_history, cmd_weight_log, cmd_weight_show, cmd_whoami,
};
use crate::config::Config;
use heft_core::analytics::{DEFAULT_BINS, MAX_BINS};
use heft_core::metrics::TREND_WINDOW;
use heft_core::service::HeftService;
use heft_core::session::SessionContext;

#[derive(Parser)]
#[command(
    name = "heft",
    version,
    about = "A simple body weight tracker CLI",
    long_about = "Log your weight, watch the trend, and stay on course for your goal.\n\n\
                  Data lives in a local directory (override with HEFT_DATA_DIR)."
)]
struct Cli {
    /// User to act as in single-user mode (default: config `default_user`)
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track body weight
    Weight {
        #[command(subcommand)]
        command: WeightCommands,
    },
    /// Current weight, BMI, goal progress, and trend at a glance
    Dashboard {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Statistics, moving average, and weight distribution over a time range
    Analytics {
        /// Time range: 1M, 3M, 6M, 1Y, All
        #[arg(short, long, default_value = "All")]
        range: String,
        /// Moving average window in entries
        #[arg(short, long, default_value_t = TREND_WINDOW)]
        window: usize,
        /// Number of histogram bins (1-1000)
        #[arg(
            short,
            long,
            default_value_t = DEFAULT_BINS,
            value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_BINS as u64)
        )]
        bins: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// View or edit your profile and goal
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Import data from external sources
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Export the weight log
    Export {
        /// Format: csv, excel (semicolon-separated), json
        #[arg(short, long, default_value = "csv")]
        format: String,
        /// Output path, or '-' for stdout (default: weight_data_YYYYMMDD.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage accounts and login sessions
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
}

#[derive(Subcommand)]
enum WeightCommands {
    /// Log a weight entry
    Log {
        /// Weight value (number)
        value: f64,
        /// Unit: kg or lbs (default: kg)
        #[arg(long, default_value = "kg")]
        unit: String,
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Optional notes
        #[arg(long)]
        notes: Option<String>,
        /// Goal at the time of the entry (default: profile goal)
        #[arg(long)]
        goal: Option<String>,
        /// Overwrite an existing entry for the same date
        #[arg(long)]
        replace: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show weight for a specific date (default: today)
    Show {
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show weight history
    History {
        /// Only the most recent N entries (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the weight entry for a date
    Delete {
        /// Date (YYYY-MM-DD or today/yesterday)
        date: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show your profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update one or more profile fields
    Set {
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Goal: maintenance, cut, bulk, reverse
        #[arg(long)]
        goal: Option<String>,
        /// Target weight
        #[arg(long)]
        target: Option<f64>,
        /// Current weight
        #[arg(long)]
        current: Option<f64>,
        /// Height in cm
        #[arg(long)]
        height: Option<f64>,
        /// Unit for --target and --current: kg or lbs
        #[arg(long, default_value = "kg")]
        unit: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the available goals
    Goals {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ImportCommands {
    /// Import weights from any CSV with a date and a weight column
    Csv {
        /// Path to the CSV file
        file: PathBuf,
        /// Preview import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Create an account (prompts for password and security answer)
    Signup {
        username: String,
        /// Security question (prompted if omitted)
        #[arg(long)]
        question: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log in (prompts for password)
    Login {
        username: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// End the current session
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reset a forgotten password with the security answer
    Reset {
        username: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show who data commands run as
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// The session data commands run under: the persisted login when logins are
/// required, otherwise an anonymous session for `--user` or the default user.
fn session_for(config: &Config, cli_user: Option<&str>) -> Result<SessionContext> {
    if config.require_login {
        let session = config.load_session()?;
        if let (Some(wanted), Some(current)) = (cli_user, session.user()) {
            if wanted != current {
                bail!("--user {wanted} does not match the logged-in user {current}");
            }
        }
        Ok(session)
    } else {
        Ok(SessionContext::anonymous(
            cli_user.unwrap_or(&config.default_user),
        ))
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    logging::init(&config.log_level);
    tracing::debug!(
        backend = %config.backend,
        data_dir = %config.data_dir.display(),
        require_login = config.require_login,
        "loaded config"
    );
    let svc = HeftService::open(config.backend, &config.data_dir)?;
    let session = session_for(&config, cli.user.as_deref())?;
    let user = || session.require_user();

    match cli.command {
        Commands::Weight { command } => {
            let user = user()?;
            match command {
                WeightCommands::Log {
                    value,
                    unit,
                    date,
                    notes,
                    goal,
                    replace,
                    json,
                } => cmd_weight_log(&svc, user, value, &unit, date, notes, goal, replace, json),
                WeightCommands::Show { date, json } => cmd_weight_show(&svc, user, date, json),
                WeightCommands::History { limit, json } => {
                    cmd_weight_history(&svc, user, limit, json)
                }
                WeightCommands::Delete { date, json } => cmd_weight_delete(&svc, user, &date, json),
            }
        }
        Commands::Dashboard { json } => cmd_dashboard(&svc, user()?, json),
        Commands::Analytics {
            range,
            window,
            bins,
            json,
        } => cmd_analytics(&svc, user()?, &range, window, bins, json),
        Commands::Profile { command } => match command {
            ProfileCommands::Show { json } => cmd_profile_show(&svc, user()?, json),
            ProfileCommands::Set {
                name,
                goal,
                target,
                current,
                height,
                unit,
                json,
            } => cmd_profile_set(
                &svc,
                user()?,
                name,
                goal,
                target,
                current,
                height,
                &unit,
                json,
            ),
            ProfileCommands::Goals { json } => cmd_profile_goals(json),
        },
        Commands::Import { command } => match command {
            ImportCommands::Csv {
                file,
                dry_run,
                json,
            } => cmd_import_csv(&svc, user()?, &file, dry_run, json),
        },
        Commands::Export {
            format,
            output,
            json,
        } => cmd_export(&svc, user()?, &format, output, json),
        Commands::Account { command } => match command {
            AccountCommands::Signup {
                username,
                question,
                json,
            } => cmd_signup(&svc, &config, &username, question, json),
            AccountCommands::Login { username, json } => cmd_login(&svc, &config, &username, json),
            AccountCommands::Logout { json } => cmd_logout(&config, json),
            AccountCommands::Reset { username, json } => cmd_reset(&svc, &config, &username, json),
            AccountCommands::Whoami { json } => cmd_whoami(&config, session.user(), json),
        },
    }
}
