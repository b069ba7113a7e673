//! CLI entry point for the CodeBreaker rescue tracker.

use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::watch;
use tokio::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

use codebreaker_billing::{
    AccessStatus, ActivationOutcome, BillingClient, BillingConfig, EntitlementStore, Plan, UserId,
};
use codebreaker_core::config::{load_section, DEFAULT_FILE_PREFIX};
use codebreaker_core::{PromptStyle, ProblemType, Session, SessionId, Theme};
use codebreaker_store::{FileKv, SessionStore};
use codebreaker_tracker::config::TrackerConfig;
use codebreaker_tracker::SessionTracker;

#[derive(Parser)]
#[command(name = "codebreaker")]
#[command(about = "Get unstuck on coding problems, one timed step at a time")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: codebreaker).
    #[arg(short, long, default_value = DEFAULT_FILE_PREFIX, global = true)]
    config: String,

    /// Override the data directory.
    #[arg(long, global = true)]
    data_dir: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive rescue session.
    Rescue {
        /// Kind of problem: bug, error, concept, design, performance, other.
        #[arg(short, long, default_value = "bug")]
        problem: String,
        /// Strategy to follow (e.g. rubber_duck, bisect).
        #[arg(short, long)]
        strategy: String,
        /// Action steps, in order. Repeat for each step.
        #[arg(long = "step", required = true)]
        steps: Vec<String>,
    },
    /// List stored sessions.
    List,
    /// Print one session as JSON.
    Show { id: u64 },
    /// Delete a session.
    Delete { id: u64 },
    /// Show or update preferences.
    Prefs {
        /// dark, light, or system.
        #[arg(long)]
        theme: Option<String>,
        /// direct, socratic, or guided.
        #[arg(long)]
        prompt_style: Option<String>,
    },
    /// Export sessions and preferences as JSON.
    Export {
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace stored data with an exported snapshot.
    Import { file: PathBuf },
    /// Delete all sessions and preferences.
    Clear {
        /// Confirm deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Show trial / subscription status.
    Status,
    /// Activate a paid subscription.
    Activate {
        /// User id from the identity provider.
        #[arg(long)]
        user: String,
        /// monthly or yearly.
        #[arg(long)]
        plan: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut tracker_config: TrackerConfig = load_section(&cli.config, "tracker")?;
    if let Some(dir) = &cli.data_dir {
        tracker_config.data_dir = dir.clone();
    }
    init_logging(tracker_config.log_json);

    let kv = open_kv(&tracker_config)?;

    match cli.command {
        Command::Rescue {
            ref problem,
            ref strategy,
            ref steps,
        } => {
            let access = current_access(&kv, &tracker_config)?;
            if !access.allows_rescue() {
                anyhow::bail!("Your free trial has ended. Run `codebreaker activate` to subscribe.");
            }
            let problem_type: ProblemType = problem.parse()?;
            let period = Duration::from_millis(tracker_config.refresh_interval_ms);
            let mut tracker =
                SessionTracker::new(SessionStore::new(kv)).with_refresh_ticker(period);
            run_rescue(&mut tracker, problem_type, strategy, steps).await?;
        }
        Command::List => {
            let store = SessionStore::new(kv);
            let sessions = store.list_sessions();
            if sessions.is_empty() {
                println!("No rescue sessions yet.");
            }
            for session in &sessions {
                println!("{}", summary_line(session));
            }
        }
        Command::Show { id } => {
            let store = SessionStore::new(kv);
            let session = store
                .get_session(SessionId(id))
                .with_context(|| format!("Session {id} not found"))?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        Command::Delete { id } => {
            let mut store = SessionStore::new(kv);
            if store.try_delete_session(SessionId(id))? {
                println!("Deleted session {id}");
            } else {
                println!("No session {id}; nothing deleted");
            }
        }
        Command::Prefs {
            ref theme,
            ref prompt_style,
        } => {
            let mut store = SessionStore::new(kv);
            let mut prefs = store.get_preferences();
            if let Some(theme) = theme {
                prefs.theme = theme.parse::<Theme>()?;
            }
            if let Some(style) = prompt_style {
                prefs.default_prompt_style = style.parse::<PromptStyle>()?;
            }
            if theme.is_some() || prompt_style.is_some() {
                store.try_save_preferences(&prefs)?;
            }
            println!("{}", serde_json::to_string_pretty(&prefs)?);
        }
        Command::Export { ref output } => {
            let store = SessionStore::new(kv);
            let snapshot = store.export_data()?;
            match output {
                Some(path) => {
                    std::fs::write(path, snapshot)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{snapshot}"),
            }
        }
        Command::Import { ref file } => {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let mut store = SessionStore::new(kv);
            let summary = store.try_import_data(&text)?;
            match summary.sessions {
                Some(n) => println!("Imported {n} sessions"),
                None => println!("Sessions unchanged"),
            }
            if summary.preferences {
                println!("Imported preferences");
            }
        }
        Command::Clear { yes } => {
            if !yes {
                anyhow::bail!("Refusing to delete all data without --yes");
            }
            let mut store = SessionStore::new(kv);
            store.try_clear_all()?;
            println!("All sessions and preferences deleted");
        }
        Command::Status => match current_access(&kv, &tracker_config)? {
            AccessStatus::Trial { ends_at, days_left } => {
                println!("Free trial: {days_left} day(s) left (ends {ends_at})");
            }
            AccessStatus::Subscribed { plan } => println!("Subscribed ({plan})"),
            AccessStatus::Expired => println!("Free trial ended. Run `codebreaker activate`."),
        },
        Command::Activate { ref user, ref plan } => {
            let plan: Plan = plan.parse()?;
            let user = UserId(user.clone());
            let billing_config: BillingConfig = load_section(&cli.config, "billing")?;
            let client = BillingClient::new(&billing_config)?;

            match client.activate(&user, plan).await? {
                ActivationOutcome::Activated { plan } => {
                    let mut entitlements = EntitlementStore::new(kv);
                    let now = Utc::now();
                    let mut entitlement = entitlements.load_or_start_trial(now)?;
                    entitlement.activate(user, plan, now);
                    entitlements.save(&entitlement)?;
                    println!("Subscription active ({plan}). Thanks for supporting CodeBreaker!");
                }
                ActivationOutcome::Rejected { message } => anyhow::bail!(message),
            }
        }
    }

    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_kv(config: &TrackerConfig) -> anyhow::Result<FileKv> {
    let kv = FileKv::new(&config.data_dir)
        .with_context(|| format!("Failed to open data directory {}", config.data_dir))?;
    Ok(match config.quota_bytes {
        Some(bytes) => kv.with_quota(bytes),
        None => kv,
    })
}

fn current_access(kv: &FileKv, config: &TrackerConfig) -> anyhow::Result<AccessStatus> {
    let mut entitlements = EntitlementStore::new(kv.clone());
    let now = Utc::now();
    let entitlement = entitlements.load_or_start_trial(now)?;
    Ok(entitlement.status(now, config.trial_days))
}

fn summary_line(session: &Session) -> String {
    let status = if session.success { "solved" } else { "open" };
    format!(
        "{:>14}  {:<12} {:<20} {}/{} steps  {}  {}",
        session.id,
        session.problem_type,
        session.selected_strategy,
        session.steps_completed,
        session.action_steps.len(),
        format_duration(session.total_time_spent),
        status
    )
}

fn format_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, text: &str) -> anyhow::Result<String> {
    println!("{text}");
    Ok(lines.next_line().await?.unwrap_or_default().trim().to_string())
}

/// Resolves on the next display tick; never, if there is no ticker.
async fn next_refresh(rx: &mut Option<watch::Receiver<u64>>) {
    if let Some(rx) = rx {
        if rx.changed().await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}

async fn run_rescue(
    tracker: &mut SessionTracker<FileKv>,
    problem_type: ProblemType,
    strategy: &str,
    steps: &[String],
) -> anyhow::Result<()> {
    let session = tracker.create_session(problem_type, strategy, steps.iter().cloned());
    let id = session.id;
    let total = session.action_steps.len();
    println!("Rescue session {id}: {problem_type} via {strategy}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut refresh = tracker.subscribe_refresh();

    for (index, step) in session.action_steps.iter().enumerate() {
        let answer = prompt(
            &mut lines,
            &format!(
                "\nStep {}/{}: {}\n[Enter] start  [s] skip  [q] quit",
                index + 1,
                total,
                step.label
            ),
        )
        .await?;
        match answer.as_str() {
            "q" => {
                let abandoned = tracker.abandon(id)?;
                println!(
                    "Session saved as open after {}.",
                    format_duration(abandoned.total_time_spent)
                );
                return Ok(());
            }
            "s" => continue,
            _ => {}
        }

        tracker.start_step(id, index)?;
        println!("Timing... press Enter when the step is done.");
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    line?;
                    break;
                }
                _ = next_refresh(&mut refresh) => {
                    print!("\r  {}  ", format_duration(tracker.step_elapsed(id, index)));
                    std::io::stdout().flush()?;
                }
            }
        }
        let elapsed = tracker.complete_step(id, index)?;
        println!("\r  Step done in {}", format_duration(elapsed));
    }

    let answer = prompt(&mut lines, "\nDid this get you unstuck? [y/N]").await?;
    let finished = if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
        tracker.mark_success(id)?
    } else {
        tracker.abandon(id)?
    };

    println!(
        "{} {}/{} steps in {}.",
        if finished.success { "Solved!" } else { "Saved." },
        finished.steps_completed,
        total,
        format_duration(finished.total_time_spent)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(65), "01:05");
        assert_eq!(format_duration(3_725), "1:02:05");
    }

    #[test]
    fn test_cli_parses_rescue() {
        let cli = Cli::try_parse_from([
            "codebreaker",
            "rescue",
            "--strategy",
            "rubber_duck",
            "--step",
            "Explain it",
            "--step",
            "Fix it",
        ])
        .unwrap();
        match cli.command {
            Command::Rescue { problem, steps, .. } => {
                assert_eq!(problem, "bug");
                assert_eq!(steps.len(), 2);
            }
            _ => panic!("expected rescue"),
        }
    }
}
