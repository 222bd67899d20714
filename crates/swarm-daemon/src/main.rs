//! `agent-swarm`
//!
//! Spawns coding-agent CLIs in the background and reports on them. Every
//! subcommand prints one JSON document on stdout; state lives on disk, so
//! successive invocations see each other's agents.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use swarm_core::config::{load_config, resolve_storage_root};
use swarm_core::{AutomationMode, Config};
use swarm_daemon::agent::{AgentRegistry, RegistryConfig, SpawnRequest};
use swarm_daemon::server::{AgentService, ReadFormat, ReadRequest};

#[derive(Parser, Debug)]
#[command(name = "agent-swarm")]
#[command(version, about = "Run coding-agent CLIs in the background and summarize their work")]
struct Args {
    /// Storage root for agent records
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Mode for spawns that name none ("safe" or "unsafe")
    #[arg(long, global = true)]
    default_mode: Option<AutomationMode>,

    /// Maximum simultaneously running agents
    #[arg(long, global = true)]
    max_concurrent: Option<usize>,

    /// Finished agents kept before the oldest are removed
    #[arg(long, global = true)]
    max_completed: Option<usize>,

    /// Only track agents started in this directory
    #[arg(long, global = true, env = "AGENT_SWARM_CWD_FILTER")]
    cwd_filter: Option<PathBuf>,

    /// Log level filter (e.g. "info", "debug", "warn")
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long, global = true, env = "AGENT_SWARM_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start an agent in the background
    Spawn {
        /// codex, cursor, gemini or claude
        agent_type: String,
        prompt: String,
        /// Working directory for the agent
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// "safe" or "unsafe"
        #[arg(long)]
        mode: Option<String>,
        /// Shorthand for `--mode unsafe`
        #[arg(long = "unsafe")]
        unsafe_mode: bool,
    },
    /// Read an agent's output
    Read {
        agent_id: String,
        #[arg(long, default_value = "summary")]
        format: ReadFormat,
        /// brief, standard or detailed
        #[arg(long)]
        detail_level: Option<String>,
        /// Only events after this index (delta and events formats)
        #[arg(long, default_value_t = 0)]
        since_event: usize,
        /// Priority levels to keep in events output (critical, important, verbose)
        #[arg(long, value_delimiter = ',')]
        priority: Vec<String>,
    },
    /// Stop a running agent
    Stop { agent_id: String },
    /// One-line status for several agents
    Status {
        #[arg(required = true)]
        agent_ids: Vec<String>,
    },
    /// List running and recently finished agents
    List {
        /// Include agents that finished more than an hour ago
        #[arg(long)]
        all: bool,
    },
    /// Report which vendor CLIs are installed
    CheckEnv,
}

impl Args {
    /// Apply command-line overrides on top of file and environment config.
    fn apply_to(&self, config: &mut Config) {
        if let Some(dir) = &self.storage_dir {
            config.storage_dir = Some(dir.clone());
        }
        if let Some(mode) = self.default_mode {
            config.default_mode = Some(mode);
        }
        if let Some(max) = self.max_concurrent {
            config.max_concurrent = max;
        }
        if let Some(max) = self.max_completed {
            config.max_completed = max;
        }
        if let Some(cwd) = &self.cwd_filter {
            config.cwd_filter = Some(cwd.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level.clone_from(level);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(output) => {
            emit(&output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            emit(&serde_json::json!({ "error": format!("{e:#}") }));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<serde_json::Value> {
    let mut config = load_config()?;
    args.apply_to(&mut config);

    let log_filter = format!("swarm_daemon={0},swarm_core={0}", config.log_level);
    swarm_core::tracing_init::init_tracing(&log_filter, args.log_json);

    let root = resolve_storage_root(config.storage_dir.as_deref())?;
    debug!(root = %root.display(), "Resolved storage root");
    let registry = AgentRegistry::open(RegistryConfig::from_config(&config, root))?;
    let service = AgentService::new(registry);

    let output = match args.command {
        Command::Spawn {
            agent_type,
            prompt,
            cwd,
            mode,
            unsafe_mode,
        } => {
            let request = SpawnRequest {
                agent_type,
                prompt,
                cwd,
                mode,
                unsafe_mode: unsafe_mode.then_some(true),
            };
            to_json(&service.spawn(&request).await?)?
        }
        Command::Read {
            agent_id,
            format,
            detail_level,
            since_event,
            priority,
        } => {
            let request = ReadRequest {
                agent_id,
                format,
                detail_level,
                since_event,
                priorities: (!priority.is_empty()).then_some(priority),
            };
            to_json(&service.read(&request).await?)?
        }
        Command::Stop { agent_id } => to_json(&service.stop(&agent_id).await?)?,
        Command::Status { agent_ids } => to_json(&service.status(&agent_ids).await)?,
        Command::List { all } => to_json(&service.list(all).await)?,
        Command::CheckEnv => to_json(&service.check_env().await)?,
    };
    Ok(output)
}

fn to_json(value: &impl Serialize) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

#[allow(clippy::print_stdout)]
fn emit(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}
