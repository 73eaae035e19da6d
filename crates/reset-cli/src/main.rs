mod server;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use rmcp::{ServiceExt, transport::stdio};
use serde::Serialize;
use uuid::Uuid;

use reset_core::{ActivitySample, ActivitySnapshot, ActivityType, PageMetadata};
use reset_store::{Tracker, resolve_base_dir};

#[derive(Parser)]
#[command(name = "reset", about = "Activity deduplication and focus scoring CLI and MCP server")]
struct Cli {
    /// Data directory (defaults to $RESET_DATA_DIR, then ~/.reset-ai)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio transport
    Serve,

    /// Record a page visit
    Capture {
        url: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        title: Option<String>,
        /// code, document, note, video, email or tab (inferred when omitted)
        #[arg(long = "type")]
        activity_type: Option<String>,
        #[arg(long)]
        scroll: Option<u64>,
        #[arg(long)]
        selection: Option<String>,
        /// Page metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Touch the active context for a URL
    Update {
        url: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        scroll: Option<u64>,
    },

    /// Add dwell time to the active context for a URL
    Duration {
        url: String,
        /// Milliseconds spent on the page
        ms: u64,
        #[arg(long)]
        user: String,
    },

    /// List contexts, most recently visited first
    List {
        #[arg(long)]
        user: String,
        /// Include archived contexts (newest capture first)
        #[arg(long)]
        all: bool,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Mark a context as recovered
    Recover {
        id: String,
        /// Require the context to belong to this user
        #[arg(long)]
        user: Option<String>,
    },

    /// Archive a context
    Archive { id: String },

    /// Work session lifecycle and stats
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Today's Neuro-Flow focus score
    Score {
        #[arg(long)]
        user: String,
    },

    /// Where the user left off before an absence
    Resume {
        #[arg(long)]
        user: String,
        #[arg(long, default_value_t = 0)]
        absence_ms: u64,
    },

    /// Score distraction risk (or context loss with --detect) for a snapshot
    Predict {
        #[arg(long, default_value_t = 0)]
        tab_switches: usize,
        #[arg(long, default_value_t = 0)]
        idle_ms: u64,
        #[arg(long, default_value_t = 0)]
        domains: usize,
        #[arg(long)]
        domain_changed: bool,
        /// Scroll offsets, oldest first, comma separated
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        scroll: Vec<i64>,
        #[arg(long, default_value_t = 0)]
        rereads: u32,
        #[arg(long, default_value_t = 0)]
        session_ms: u64,
        #[arg(long, default_value_t = 0)]
        since_interaction_ms: u64,
        /// Local hour 0-23 (defaults to now)
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
        hour: Option<u32>,
        /// 1 (lenient) to 10 (eager)
        #[arg(long)]
        sensitivity: Option<u8>,
        /// Run context-loss detection instead of distraction prediction
        #[arg(long)]
        detect: bool,
    },

    /// Retry summary generation for unenriched contexts
    Enrich {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Show a user's recovery count and focus score
    Stats {
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Start a session
    Start {
        #[arg(long)]
        user: String,
    },
    /// Complete a session
    End { id: String },
    /// Count an interruption
    Interrupt { id: String },
    /// Count a context-loss event
    Loss { id: String },
    /// Credit recovered time
    Recovered { id: String, seconds: u64 },
    /// Aggregate the last 30 sessions
    Stats {
        #[arg(long)]
        user: String,
    },
}

fn open_tracker(cli: &Cli) -> Result<Tracker> {
    Tracker::open(cli.data_dir.as_deref()).context("failed to open tracker")
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("invalid id '{raw}'"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Serve => cmd_serve(&cli).await,
        Commands::Capture {
            url,
            user,
            session,
            title,
            activity_type,
            scroll,
            selection,
            metadata,
        } => {
            let page_metadata = metadata
                .as_deref()
                .map(serde_json::from_str::<PageMetadata>)
                .transpose()
                .context("invalid --metadata")?;
            let sample = ActivitySample {
                url: url.clone(),
                title: title.clone(),
                activity_type: activity_type.as_deref().map(ActivityType::parse),
                scroll_position: *scroll,
                selected_text: selection.clone(),
                page_metadata,
            };
            let outcome = open_tracker(&cli)?
                .capture_activity(user, session.as_deref(), &sample)
                .context("capture failed")?;
            print_json(&outcome)
        }
        Commands::Update { url, user, scroll } => {
            let id = open_tracker(&cli)?
                .update_activity(user, url, *scroll)
                .context("update failed")?;
            print_json(&serde_json::json!({ "contextId": id }))
        }
        Commands::Duration { url, ms, user } => {
            let applied = open_tracker(&cli)?
                .record_duration(user, url, *ms)
                .context("failed to record duration")?;
            print_json(&serde_json::json!({ "applied": applied }))
        }
        Commands::List { user, all, limit } => {
            let tracker = open_tracker(&cli)?;
            let contexts = if *all {
                tracker.list_contexts(user, *limit)
            } else {
                tracker.list_active_contexts(user, *limit)
            }
            .context("failed to list contexts")?;
            print_json(&contexts)
        }
        Commands::Recover { id, user } => {
            let id = parse_id(id)?;
            let changed = open_tracker(&cli)?
                .mark_recovered(id, user.as_deref())
                .context("recover failed")?;
            print_json(&serde_json::json!({ "contextId": id, "changed": changed }))
        }
        Commands::Archive { id } => {
            let id = parse_id(id)?;
            open_tracker(&cli)?
                .archive_context(id)
                .context("archive failed")?;
            print_json(&serde_json::json!({ "contextId": id, "archived": true }))
        }
        Commands::Session { command } => cmd_session(&cli, command),
        Commands::Score { user } => {
            let score = open_tracker(&cli)?
                .neuro_flow_score(user)
                .context("failed to score")?;
            print_json(&score)
        }
        Commands::Resume { user, absence_ms } => {
            let resume = open_tracker(&cli)?
                .deep_cognitive_resume(user, *absence_ms)
                .context("failed to build resume")?;
            print_json(&resume)
        }
        Commands::Predict {
            tab_switches,
            idle_ms,
            domains,
            domain_changed,
            scroll,
            rereads,
            session_ms,
            since_interaction_ms,
            hour,
            sensitivity,
            detect,
        } => {
            let snapshot = ActivitySnapshot {
                recent_tab_switches: *tab_switches,
                idle_duration_ms: *idle_ms,
                unique_domains: *domains,
                domain_changed: *domain_changed,
                scroll_positions: scroll.clone(),
                reread_count: *rereads,
                session_duration_ms: *session_ms,
                time_since_last_interaction_ms: *since_interaction_ms,
                local_hour: *hour,
            };
            let tracker = open_tracker(&cli)?;
            if *detect {
                print_json(&tracker.detect_context_loss(&snapshot, *sensitivity))
            } else {
                print_json(&tracker.predict_distraction(&snapshot, *sensitivity))
            }
        }
        Commands::Enrich { limit } => {
            let enriched = open_tracker(&cli)?
                .enrich_pending(*limit)
                .context("enrichment failed")?;
            print_json(&serde_json::json!({ "enriched": enriched }))
        }
        Commands::Stats { user } => {
            let stats = open_tracker(&cli)?
                .user_stats(user)
                .context("failed to read user stats")?;
            print_json(&stats)
        }
    }
}

async fn cmd_serve(cli: &Cli) -> Result<()> {
    let base_dir = resolve_base_dir(cli.data_dir.as_deref());
    // Fail fast on an unusable data directory or config before accepting requests.
    Tracker::open(Some(base_dir.as_path())).context("failed to open tracker")?;
    tracing::info!("starting MCP server with data dir {}", base_dir.display());

    let server = server::ResetServer::new(base_dir);
    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;
    service.waiting().await?;
    Ok(())
}

fn cmd_session(cli: &Cli, command: &SessionCommands) -> Result<()> {
    let tracker = open_tracker(cli)?;
    match command {
        SessionCommands::Start { user } => {
            let session = tracker
                .start_session(user)
                .context("failed to start session")?;
            print_json(&session)
        }
        SessionCommands::End { id } => {
            let session = tracker
                .end_session(parse_id(id)?)
                .context("failed to end session")?;
            print_json(&session)
        }
        SessionCommands::Interrupt { id } => {
            let id = parse_id(id)?;
            tracker
                .record_interruption(id)
                .context("failed to record interruption")?;
            print_json(&tracker.store().get_session(id)?)
        }
        SessionCommands::Loss { id } => {
            let id = parse_id(id)?;
            tracker
                .record_context_loss(id)
                .context("failed to record context loss")?;
            print_json(&tracker.store().get_session(id)?)
        }
        SessionCommands::Recovered { id, seconds } => {
            let id = parse_id(id)?;
            tracker
                .record_time_recovered(id, *seconds)
                .context("failed to record recovered time")?;
            print_json(&tracker.store().get_session(id)?)
        }
        SessionCommands::Stats { user } => {
            let stats = tracker
                .session_stats(user)
                .context("failed to read session stats")?;
            print_json(&stats)
        }
    }
}
