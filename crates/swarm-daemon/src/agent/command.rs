//! Vendor command lines and CLI resolution.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use swarm_core::{AgentType, AutomationMode};

use super::error::AgentError;

const PROMPT_PLACEHOLDER: &str = "{prompt}";
const SAFE_AUTOMATION_FLAG: &str = "--full-auto";
const UNSAFE_AUTOMATION_FLAG: &str = "--yolo";

/// Unsafe-automation flag written into a prompt, matched on the lower-cased
/// text. `--yolo-mode` and similar longer flags do not count.
static UNSAFE_FLAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)--\s*yolo(\s|$|[^\w-])").expect("static regex is valid"));

/// Argv template per agent type.
const fn template(agent_type: AgentType) -> &'static [&'static str] {
    match agent_type {
        AgentType::Codex => &["codex", "exec", PROMPT_PLACEHOLDER, "--full-auto", "--json"],
        AgentType::Cursor => &[
            "cursor-agent",
            "-p",
            "--output-format",
            "stream-json",
            PROMPT_PLACEHOLDER,
        ],
        AgentType::Gemini => &["gemini", "-p", PROMPT_PLACEHOLDER, "--output-format", "stream-json"],
        // `--verbose` is required for stream-json in print mode
        AgentType::Claude => &[
            "claude",
            "-p",
            PROMPT_PLACEHOLDER,
            "--output-format",
            "stream-json",
            "--verbose",
        ],
    }
}

/// Executable name looked up on the search path.
pub const fn binary_name(agent_type: AgentType) -> &'static str {
    template(agent_type)[0]
}

pub fn prompt_requests_unsafe(prompt: &str) -> bool {
    UNSAFE_FLAG_RE.is_match(&prompt.to_lowercase())
}

/// Build the argv for `agent_type` running `prompt` under `mode`.
///
/// The prompt is substituted as a single argv element; no shell is involved.
pub fn build_command(
    agent_type: AgentType,
    prompt: &str,
    mode: AutomationMode,
) -> Result<Vec<String>, AgentError> {
    if !mode.is_unsafe() && prompt_requests_unsafe(prompt) {
        return Err(AgentError::UnsafeFlagInPrompt);
    }

    let mut argv: Vec<String> = template(agent_type)
        .iter()
        .map(|part| {
            if *part == PROMPT_PLACEHOLDER {
                prompt.to_string()
            } else {
                (*part).to_string()
            }
        })
        .collect();

    if mode.is_unsafe() {
        apply_unsafe_mode(agent_type, &mut argv);
    } else if argv.iter().any(|arg| arg == UNSAFE_AUTOMATION_FLAG) {
        return Err(AgentError::UnsafeFlagInPrompt);
    }
    Ok(argv)
}

/// Swap `--full-auto` for `--yolo`; codex gets `--yolo` appended when there
/// was nothing to swap. Other CLIs are left as they are.
fn apply_unsafe_mode(agent_type: AgentType, argv: &mut Vec<String>) {
    let mut replaced = false;
    for arg in argv.iter_mut().skip(1) {
        if arg == SAFE_AUTOMATION_FLAG {
            UNSAFE_AUTOMATION_FLAG.clone_into(arg);
            replaced = true;
        }
    }
    if !replaced && agent_type == AgentType::Codex && !argv.iter().any(|a| a == UNSAFE_AUTOMATION_FLAG) {
        argv.push(UNSAFE_AUTOMATION_FLAG.to_string());
    }
}

/// Resolve the CLI for `agent_type` to an absolute path.
///
/// `search_path` is a `PATH`-style list; `None` uses the process `PATH`.
/// The binary is checked for existence and the executable bit, never run.
pub fn resolve_cli(agent_type: AgentType, search_path: Option<&OsStr>) -> Result<PathBuf, AgentError> {
    let binary = binary_name(agent_type);
    let found = match search_path {
        Some(paths) => {
            let cwd = std::env::current_dir().unwrap_or_default();
            which::which_in(binary, Some(paths), cwd)
        }
        None => which::which(binary),
    };
    found.map_err(|_| AgentError::CliNotFound {
        agent_type,
        binary: binary.to_string(),
    })
}

/// Availability of one vendor CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CliStatus {
    pub installed: bool,
    pub path: Option<PathBuf>,
    pub error: Option<String>,
}

pub fn check_cli_available(agent_type: AgentType, search_path: Option<&OsStr>) -> CliStatus {
    match resolve_cli(agent_type, search_path) {
        Ok(path) => CliStatus {
            installed: true,
            path: Some(path),
            error: None,
        },
        Err(e) => CliStatus {
            installed: false,
            path: None,
            error: Some(e.to_string()),
        },
    }
}

pub fn check_all_clis(search_path: Option<&OsStr>) -> BTreeMap<AgentType, CliStatus> {
    AgentType::ALL
        .into_iter()
        .map(|agent_type| (agent_type, check_cli_available(agent_type, search_path)))
        .collect()
}
