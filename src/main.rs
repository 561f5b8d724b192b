use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sprintdesk::config::{resolve_actor, USER_ENV};
use sprintdesk::duplicate::similar_issues_message;
use sprintdesk::error::{CreateOutcome, IssueError};
use sprintdesk::service::{DuplicateConfirmer, FixedAnswer, IssueService};
use sprintdesk::storage::{Storage, DATA_DIR, HISTORY_FILE};
use sprintdesk::types::{Actor, FilterSelection, Issue, IssueDraft, Priority, Status};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser)]
#[command(name = "sd", about = "Sprintdesk - A small issue board", version)]
struct Cli {
    /// Path to the data directory (supports SPRINTDESK_DIR env var)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Acting user (falls back to SPRINTDESK_USER, then the config default)
    #[arg(long, global = true)]
    actor: Option<String>,

    /// Output JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Show debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable command logging to .sprintdesk/command_history.log
    #[arg(long, global = true)]
    no_cmd_logging: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize sprintdesk in current directory
    Init {
        /// Issue prefix (e.g., 'myproject' for myproject-1, myproject-2)
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Create a new issue
    Create {
        /// Issue title
        title: String,

        /// Description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Priority (Low, Medium, High)
        #[arg(short, long)]
        priority: Option<Priority>,

        /// Assignee (defaults to the acting user)
        #[arg(long)]
        assign_to: Option<String>,

        /// Create even if similar issues exist
        #[arg(short, long)]
        yes: bool,
    },

    /// List issues (Done issues are hidden unless --status Done)
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<Status>,

        /// Filter by priority
        #[arg(long)]
        priority: Option<Priority>,
    },

    /// Show issue details
    Show {
        /// Issue ID
        issue_id: String,
    },

    /// Change the status of an issue
    Status {
        /// Issue ID
        issue_id: String,

        /// New status (Open, "In Progress", Done)
        status: Status,
    },

    /// Get statistics
    Stats,

    /// Show quickstart guide
    Quickstart,

    /// Show version information
    Version,
}

fn main() {
    if let Err(e) = run() {
        match e.downcast_ref::<IssueError>() {
            Some(issue_err @ IssueError::InvalidTransition { .. }) => {
                eprintln!("Error: {}", issue_err.user_message());
            }
            _ => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("SPRINTDESK_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    match &cli.command {
        Commands::Init { prefix } => {
            let default_actor = match &cli.actor {
                Some(id) => Some(Actor::new(id.as_str())?.to_string()),
                None => None,
            };
            let storage = Storage::init(PathBuf::from(DATA_DIR), prefix.clone(), default_actor)?;

            // Log command after successful init
            record_command(&cli, storage.data_dir());

            if !cli.json {
                println!(
                    "Initialized sprintdesk with prefix: {}",
                    storage.prefix()
                );
            }
            Ok(())
        }

        Commands::Create {
            title,
            description,
            priority,
            assign_to,
            yes,
        } => {
            let storage = get_storage(&cli.db)?;
            let config = storage.config()?;
            let env_user = env::var(USER_ENV).ok();
            let actor = resolve_actor(cli.actor.as_deref(), env_user.as_deref(), &config)?;
            let data_dir = storage.data_dir().to_path_buf();

            let draft = IssueDraft {
                title: title.clone(),
                description: description.clone(),
                priority: *priority,
                assigned_to: assign_to.clone(),
            };

            let service = IssueService::new(storage);
            let outcome = if *yes {
                service.create(draft, &actor, &mut FixedAnswer(true))?
            } else {
                service.create(draft, &actor, &mut StdinConfirmer)?
            };

            record_command(&cli, &data_dir);

            match outcome {
                CreateOutcome::Created(issue) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&issue)?);
                    } else {
                        println!("Created issue: {}", issue.id);
                    }
                }
                CreateOutcome::Cancelled { similar_titles } => {
                    if cli.json {
                        let body = serde_json::json!({
                            "cancelled": true,
                            "similar": similar_titles,
                        });
                        println!("{}", serde_json::to_string_pretty(&body)?);
                    } else {
                        println!("Cancelled: no issue created");
                    }
                }
            }
            Ok(())
        }

        Commands::List { status, priority } => {
            let storage = get_storage(&cli.db)?;
            record_command(&cli, storage.data_dir());

            let service = IssueService::new(storage);
            let issues = service.list(&FilterSelection::new(*status, *priority))?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&issues)?);
            } else if issues.is_empty() {
                println!("No issues found");
            } else {
                for issue in issues {
                    println!(
                        "{}: {} [{}] (priority: {}, assigned to: {})",
                        issue.id, issue.title, issue.status, issue.priority, issue.assigned_to
                    );
                }
            }
            Ok(())
        }

        Commands::Show { issue_id } => {
            let storage = get_storage(&cli.db)?;
            record_command(&cli, storage.data_dir());

            let service = IssueService::new(storage);
            let issue = service
                .find(issue_id)?
                .ok_or_else(|| anyhow::anyhow!("Issue not found: {}", issue_id))?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&issue)?);
            } else {
                print_issue(&issue);
            }
            Ok(())
        }

        Commands::Status { issue_id, status } => {
            let storage = get_storage(&cli.db)?;
            let data_dir = storage.data_dir().to_path_buf();

            let service = IssueService::new(storage);
            let issue = service
                .find(issue_id)?
                .ok_or_else(|| anyhow::anyhow!("Issue not found: {}", issue_id))?;
            let updated = service.change_status(&issue, *status)?;

            record_command(&cli, &data_dir);

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&updated)?);
            } else {
                println!("Updated issue: {} [{}]", updated.id, updated.status);
            }
            Ok(())
        }

        Commands::Stats => {
            let storage = get_storage(&cli.db)?;
            record_command(&cli, storage.data_dir());

            let stats = IssueService::new(storage).stats()?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Total issues: {}", stats.total);
                println!("Open: {}", stats.open);
                println!("In Progress: {}", stats.in_progress);
                println!("Done: {}", stats.done);
                for (priority, count) in &stats.by_priority {
                    println!("Priority {}: {}", priority, count);
                }
            }
            Ok(())
        }

        Commands::Quickstart => {
            print_quickstart();
            Ok(())
        }

        Commands::Version => {
            println!(
                "sd version {} (built {}, git {})",
                env!("CARGO_PKG_VERSION"),
                env!("BUILD_DATE"),
                built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown")
            );
            Ok(())
        }
    }
}

/// Asks on stdin whether to create past a duplicate warning
struct StdinConfirmer;

impl DuplicateConfirmer for StdinConfirmer {
    fn confirm_duplicates(&mut self, _candidate_title: &str, similar: &[&Issue]) -> bool {
        eprintln!("{}", similar_issues_message(similar));
        eprint!("Create anyway? [y/N] ");
        let _ = io::stderr().flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        }
    }
}

fn print_issue(issue: &Issue) {
    println!("ID: {}", issue.id);
    println!("Title: {}", issue.title);
    println!("Status: {}", issue.status);
    println!("Priority: {}", issue.priority);
    println!("Assigned to: {}", issue.assigned_to);
    println!("Created by: {}", issue.created_by);
    println!("Created at: {}", issue.created_at.to_rfc3339());
    println!("\nDescription:\n{}", issue.description);
}

fn get_storage(db_arg: &Option<PathBuf>) -> Result<Storage> {
    let data_dir = if let Some(db) = db_arg {
        db.clone()
    } else if let Ok(dir) = env::var("SPRINTDESK_DIR") {
        PathBuf::from(dir)
    } else {
        // Search for .sprintdesk directory
        find_data_dir()?
    };

    Storage::open(data_dir).context("Failed to open storage")
}

fn find_data_dir() -> Result<PathBuf> {
    let mut current = env::current_dir()?;

    loop {
        let data_dir = current.join(DATA_DIR);
        if data_dir.is_dir() {
            return Ok(data_dir);
        }

        if !current.pop() {
            anyhow::bail!(
                "No {} directory found. Run 'sd init' to initialize a new board.",
                DATA_DIR
            );
        }
    }
}

fn record_command(cli: &Cli, data_dir: &Path) {
    if cli.no_cmd_logging {
        return;
    }
    if let Err(e) = log_command(data_dir, &env::args().collect::<Vec<_>>()) {
        tracing::debug!(error = %e, "command history not written");
    }
}

/// Log command to command_history.log
fn log_command(data_dir: &Path, args: &[String]) -> Result<()> {
    use std::fs::OpenOptions;

    let log_path = data_dir.join(HISTORY_FILE);
    let timestamp = chrono::Utc::now().to_rfc3339();

    // Skip the binary path and only log the CLI options
    let command_line = args.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open command history log")?;

    writeln!(file, "{} {}", timestamp, command_line)
        .context("Failed to write to command history log")?;

    Ok(())
}

fn print_quickstart() {
    println!(
        r#"sd - A small issue board

GETTING STARTED
  sd init   Initialize sprintdesk in your project
            Creates .sprintdesk/ with a config.yaml
            Auto-detects prefix from directory name (e.g., myapp-1, myapp-2)

  sd init --prefix api --actor you@example.com
            Custom prefix and default acting user

CREATING ISSUES
  sd create "Fix login bug" -d "Steps to reproduce..." -p High
  sd create "Add export" -d "CSV export" -p Low --assign-to bob@example.com

  Every issue needs a title, a description and a priority.
  If existing titles contain the new title you are asked to confirm.
  Pass --yes to skip the question.

VIEWING ISSUES
  sd list                      Open and In Progress issues, newest first
  sd list --status Done        Only Done issues
  sd list --priority High      Filter by priority
  sd show sd-1                 Show issue details
  sd stats                     Counts per status and priority

CHANGING STATUS
  sd status sd-1 "In Progress"
  sd status sd-1 Done

  Open issues must be moved to In Progress before they can be Done.
  Done issues can be reopened.

ACTING USER
    1. --actor flag
    2. $SPRINTDESK_USER environment variable
    3. default-actor in .sprintdesk/config.yaml

DATA LOCATION
  sd automatically discovers your board:
    1. --db /path/to/.sprintdesk flag
    2. $SPRINTDESK_DIR environment variable
    3. .sprintdesk/ in current directory or ancestors
"#
    );
}
