#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::panic)] // Integration tests use unwrap for brevity

//! End-to-end tests for the agent registry and service.
//!
//! Fake vendor CLIs are shell scripts in a temp directory that the registry
//! uses as its search path. Each script records its argv next to itself.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use swarm_core::AgentStatus;
use swarm_daemon::agent::{AgentError, AgentRegistry, RegistryConfig, SpawnRequest};
use swarm_daemon::server::{AgentService, ReadFormat, ReadRequest, ReadResponse};
use tempfile::TempDir;

const CODEX_RUN: &str = r#"
echo '{"type":"thread.started","thread_id":"abc"}'
echo '{"type":"turn.started"}'
echo '{"type":"item.completed","item":{"id":"i1","type":"agent_message","text":"done"}}'
echo '{"type":"turn.completed","usage":{"input_tokens":10,"output_tokens":5}}'
"#;

const SLEEPER: &str = "exec sleep 30\n";

struct Fixture {
    _tmp: TempDir,
    root: PathBuf,
    bin: PathBuf,
    project: PathBuf,
}

fn fixture() -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("agents");
    let bin = tmp.path().join("bin");
    let project = tmp.path().join("project");
    for dir in [&bin, &project] {
        std::fs::create_dir_all(dir).unwrap();
    }
    Fixture {
        _tmp: tmp,
        root,
        bin,
        project,
    }
}

fn fake_cli(bin: &Path, name: &str, body: &str) {
    let path = bin.join(name);
    let script = format!("#!/bin/sh\nprintf '%s\\n' \"$@\" > \"$(dirname \"$0\")/argv.txt\"\n{body}");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn recorded_argv(bin: &Path) -> Vec<String> {
    std::fs::read_to_string(bin.join("argv.txt"))
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

fn config(f: &Fixture) -> RegistryConfig {
    RegistryConfig::new(&f.root)
        .with_search_path(f.bin.as_os_str())
        .with_stop_grace(Duration::from_millis(500))
}

fn agent_dirs(root: &Path) -> usize {
    std::fs::read_dir(root).map_or(0, Iterator::count)
}

async fn wait_terminal(registry: &mut AgentRegistry, agent_id: &str) -> AgentStatus {
    for _ in 0..200 {
        let status = registry.get(agent_id).unwrap().status();
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("agent {agent_id} never finished");
}

#[tokio::test]
async fn codex_spawn_runs_to_completion() {
    let f = fixture();
    fake_cli(&f.bin, "codex", CODEX_RUN);
    let mut registry = AgentRegistry::open(config(&f)).unwrap();

    let meta = registry
        .spawn(&SpawnRequest::new("codex", "write hello.txt").with_cwd(&f.project))
        .unwrap();
    assert_eq!(meta.status, AgentStatus::Running);
    assert_eq!(meta.agent_id.len(), 8);

    let on_disk: Value =
        serde_json::from_str(&std::fs::read_to_string(f.root.join(&meta.agent_id).join("meta.json")).unwrap())
            .unwrap();
    assert_eq!(on_disk["mode"], "safe");
    assert_eq!(on_disk["status"], "running");

    assert_eq!(wait_terminal(&mut registry, &meta.agent_id).await, AgentStatus::Completed);
    assert_eq!(
        recorded_argv(&f.bin),
        vec!["exec", "write hello.txt", "--full-auto", "--json"]
    );

    let record = registry.get(&meta.agent_id).unwrap();
    record.poll_output();
    let events = record.events();
    assert_eq!(events.len(), 4);
    let first = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(first["type"], "init");
    assert_eq!(first["session_id"], "abc");
    assert!(record.meta().completed_at.is_some());
}

#[tokio::test]
async fn yolo_prompt_needs_unsafe_mode() {
    let f = fixture();
    fake_cli(&f.bin, "codex", "exit 0\n");
    let mut registry = AgentRegistry::open(config(&f)).unwrap();

    let err = registry
        .spawn(&SpawnRequest::new("codex", "fix bug --yolo"))
        .unwrap_err();
    assert!(matches!(err, AgentError::UnsafeFlagInPrompt));
    assert_eq!(agent_dirs(&f.root), 0);

    let meta = registry
        .spawn(&SpawnRequest::new("codex", "fix bug --yolo").with_mode("unsafe"))
        .unwrap();
    wait_terminal(&mut registry, &meta.agent_id).await;
    let argv = recorded_argv(&f.bin);
    assert!(argv.contains(&"--yolo".to_string()));
    assert!(!argv.contains(&"--full-auto".to_string()));
}

#[tokio::test]
async fn validation_failures_leave_nothing_behind() {
    let f = fixture();
    fake_cli(&f.bin, "codex", "exit 0\n");
    let mut registry = AgentRegistry::open(config(&f)).unwrap();

    let cases = [
        SpawnRequest::new("copilot", "x"),
        SpawnRequest::new("gemini", "x"),
        SpawnRequest::new("codex", "x").with_cwd(f.project.join("missing")),
        SpawnRequest::new("codex", "x").with_mode("reckless"),
    ];
    let errors: Vec<AgentError> = cases.iter().map(|r| registry.spawn(r).unwrap_err()).collect();

    assert!(matches!(errors[0], AgentError::UnknownAgentType(_)));
    assert!(matches!(errors[1], AgentError::CliNotFound { .. }));
    assert!(matches!(errors[2], AgentError::WorkingDirectoryMissing { .. }));
    assert!(matches!(errors[3], AgentError::InvalidMode(_)));
    assert!(errors.iter().all(AgentError::is_validation));
    assert_eq!(agent_dirs(&f.root), 0);
    assert!(registry.list_all().is_empty());
}

#[tokio::test]
async fn launch_failure_rolls_back() {
    let f = fixture();
    let path = f.bin.join("codex");
    std::fs::write(&path, "#!/nonexistent/interpreter\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    let mut registry = AgentRegistry::open(config(&f)).unwrap();

    let err = registry.spawn(&SpawnRequest::new("codex", "x")).unwrap_err();
    assert!(matches!(err, AgentError::SpawnFailed { .. }));
    assert_eq!(agent_dirs(&f.root), 0);
    assert!(registry.list_all().is_empty());
}

#[tokio::test]
async fn concurrency_cap_rejects_then_admits() {
    let f = fixture();
    fake_cli(&f.bin, "gemini", SLEEPER);
    let mut registry = AgentRegistry::open(config(&f).with_max_concurrent(2)).unwrap();

    let a = registry.spawn(&SpawnRequest::new("gemini", "a")).unwrap();
    let b = registry.spawn(&SpawnRequest::new("gemini", "b")).unwrap();
    let err = registry.spawn(&SpawnRequest::new("gemini", "c")).unwrap_err();
    assert!(matches!(err, AgentError::ConcurrencyLimit { limit: 2 }));
    assert_eq!(registry.list_running().len(), 2);

    assert!(registry.stop(&a.agent_id).await);
    let c = registry.spawn(&SpawnRequest::new("gemini", "c")).unwrap();

    for id in [&b.agent_id, &c.agent_id] {
        assert!(registry.stop(id).await);
    }
    assert!(registry.list_running().is_empty());
    assert_eq!(registry.list_completed().len(), 3);
}

#[tokio::test]
async fn stop_is_a_single_transition() {
    let f = fixture();
    fake_cli(&f.bin, "claude", SLEEPER);
    let mut registry = AgentRegistry::open(config(&f)).unwrap();
    let meta = registry.spawn(&SpawnRequest::new("claude", "long task")).unwrap();

    assert!(registry.stop(&meta.agent_id).await);
    let record = registry.get(&meta.agent_id).unwrap();
    assert_eq!(record.status(), AgentStatus::Stopped);
    let stopped_at = record.meta().completed_at;
    assert!(stopped_at.is_some());

    assert!(!registry.stop(&meta.agent_id).await);
    let record = registry.get(&meta.agent_id).unwrap();
    assert_eq!(record.status(), AgentStatus::Stopped);
    assert_eq!(record.meta().completed_at, stopped_at);
}

#[tokio::test]
async fn non_zero_exit_without_result_is_failed() {
    let f = fixture();
    fake_cli(&f.bin, "cursor-agent", "echo 'not json at all'\nexit 2\n");
    let mut registry = AgentRegistry::open(config(&f)).unwrap();
    let meta = registry.spawn(&SpawnRequest::new("cursor", "x")).unwrap();

    assert_eq!(wait_terminal(&mut registry, &meta.agent_id).await, AgentStatus::Failed);
    // Terminal status is stable under repeated refreshes
    for _ in 0..3 {
        assert_eq!(registry.get(&meta.agent_id).unwrap().status(), AgentStatus::Failed);
        assert_eq!(registry.list_completed().len(), 1);
    }
    let record = registry.get(&meta.agent_id).unwrap();
    record.poll_output();
    let raw = serde_json::to_value(&record.events()[0]).unwrap();
    assert_eq!(raw["type"], "raw");
}

/// Scheduler state letter from `/proc/<pid>/stat`, `None` once the pid is gone.
#[cfg(target_os = "linux")]
fn proc_state(pid: u32) -> Option<char> {
    let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    let (_, rest) = stat.rsplit_once(") ")?;
    rest.chars().next()
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn child_outliving_its_result_is_reaped() {
    let f = fixture();
    fake_cli(&f.bin, "codex", &format!("{CODEX_RUN}sleep 0.5\n"));
    let mut registry = AgentRegistry::open(config(&f)).unwrap();
    let meta = registry.spawn(&SpawnRequest::new("codex", "task")).unwrap();
    let pid = meta.pid.unwrap();

    // The result is read while the process is still running
    for _ in 0..100 {
        let record = registry.get(&meta.agent_id).unwrap();
        record.poll_output();
        if record.status().is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(registry.get(&meta.agent_id).unwrap().status(), AgentStatus::Completed);

    for _ in 0..100 {
        registry.list_all();
        if proc_state(pid).is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_ne!(proc_state(pid), Some('Z'), "agent {pid} left as a zombie");
    assert_eq!(registry.get(&meta.agent_id).unwrap().status(), AgentStatus::Completed);
}

#[tokio::test]
async fn records_survive_a_restart() {
    let f = fixture();
    fake_cli(&f.bin, "codex", CODEX_RUN);
    let agent_id = {
        let mut registry = AgentRegistry::open(config(&f)).unwrap();
        let meta = registry.spawn(&SpawnRequest::new("codex", "x")).unwrap();
        wait_terminal(&mut registry, &meta.agent_id).await;
        meta.agent_id
    };

    let mut reopened = AgentRegistry::open(config(&f)).unwrap();
    assert_eq!(reopened.list_all().len(), 1);
    let record = reopened.get(&agent_id).unwrap();
    assert_eq!(record.status(), AgentStatus::Completed);
    assert_eq!(record.events().len(), 0);
    record.poll_output();
    assert_eq!(record.events().len(), 4);
}

#[tokio::test]
async fn service_reads_are_monotonic() {
    let f = fixture();
    fake_cli(
        &f.bin,
        "codex",
        r#"
echo '{"type":"thread.started","thread_id":"m1"}'
sleep 0.2
echo '{"type":"item.completed","item":{"type":"command_execution","command":"cat README.md"}}'
sleep 0.2
echo '{"type":"item.completed","item":{"type":"agent_message","text":"halfway"}}'
sleep 0.2
echo '{"type":"turn.completed","usage":{}}'
"#,
    );
    let service = AgentService::new(AgentRegistry::open(config(&f)).unwrap());
    let spawned = service.spawn(&SpawnRequest::new("codex", "x")).await.unwrap();

    let mut seen: Vec<Value> = Vec::new();
    for _ in 0..100 {
        let ReadResponse::Events(out) = service
            .read(&ReadRequest::new(&spawned.agent_id, ReadFormat::Events))
            .await
            .unwrap()
        else {
            panic!("expected events output");
        };
        let events: Vec<Value> = out.events.iter().map(|e| serde_json::to_value(e).unwrap()).collect();
        assert!(events.len() >= seen.len());
        assert_eq!(&events[..seen.len()], &seen[..]);
        seen = events;
        if out.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(seen.len(), 4);

    let mut delta_request = ReadRequest::new(&spawned.agent_id, ReadFormat::Delta);
    delta_request.since_event = 2;
    let delta = serde_json::to_value(service.read(&delta_request).await.unwrap()).unwrap();
    assert_eq!(delta["new_events_count"], 2);
    assert_eq!(delta["latest_message"], "halfway");
    assert_eq!(delta["mode"], "safe");

    let mut filtered = ReadRequest::new(&spawned.agent_id, ReadFormat::Events);
    filtered.priorities = Some(vec!["critical".to_string()]);
    let ReadResponse::Events(out) = service.read(&filtered).await.unwrap() else {
        panic!("expected events output");
    };
    assert_eq!(out.event_count, 4);
    assert_eq!(out.events.len(), 1);
}

#[tokio::test]
async fn service_summary_status_and_listing() {
    let f = fixture();
    fake_cli(&f.bin, "codex", CODEX_RUN);
    let service = AgentService::new(AgentRegistry::open(config(&f)).unwrap());
    let spawned = service.spawn(&SpawnRequest::new("codex", "x")).await.unwrap();
    assert!(spawned.message.contains("safe mode"));

    let mut status = service.status(&[spawned.agent_id.clone(), "nope0000".to_string()]).await;
    for _ in 0..200 {
        if status.summary.running == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        status = service.status(&[spawned.agent_id.clone(), "nope0000".to_string()]).await;
    }
    assert_eq!(status.summary.completed, 1);
    assert_eq!(status.summary.not_found, 1);
    let json = serde_json::to_value(&status).unwrap();
    assert!(json["agents"][0]["summary"].as_str().unwrap().starts_with("Completed"));
    assert!(json["agents"][1]["error"].as_str().unwrap().contains("not found"));

    let mut request = ReadRequest::new(&spawned.agent_id, ReadFormat::Summary);
    request.detail_level = Some("brief".to_string());
    let brief = serde_json::to_value(service.read(&request).await.unwrap()).unwrap();
    assert_eq!(brief["status"], "completed");
    assert_eq!(brief["mode"], "safe");
    assert!(brief.get("final_message").is_none());

    request.detail_level = Some("standard".to_string());
    let standard = serde_json::to_value(service.read(&request).await.unwrap()).unwrap();
    assert_eq!(standard["final_message"], "done");

    request.detail_level = Some("verbose".to_string());
    assert!(service.read(&request).await.is_err());

    let listing = service.list(false).await;
    assert_eq!(listing.agents.len(), 1);
    assert_eq!(listing.completed_count, 1);
    assert_eq!(listing.filtered, 0);

    let stop = service.stop(&spawned.agent_id).await.unwrap();
    assert_eq!(stop.status, AgentStatus::Completed);
    assert!(stop.message.contains("was not running"));
    assert!(matches!(
        service.stop("nope0000").await,
        Err(AgentError::NotFound(_))
    ));

    let env = service.check_env().await;
    assert!(!env.ready);
    assert_eq!(env.installed.len(), 1);
    assert_eq!(env.missing.len(), 3);
}

#[tokio::test]
async fn concurrent_stops_transition_once() {
    let f = fixture();
    fake_cli(&f.bin, "codex", SLEEPER);
    let service = AgentService::new(AgentRegistry::open(config(&f)).unwrap());
    let spawned = service.spawn(&SpawnRequest::new("codex", "x")).await.unwrap();

    let (first, second) = tokio::join!(service.stop(&spawned.agent_id), service.stop(&spawned.agent_id));
    let messages = [first.unwrap().message, second.unwrap().message];
    assert_eq!(messages.iter().filter(|m| m.contains("has been stopped")).count(), 1);
    assert_eq!(messages.iter().filter(|m| m.contains("was not running")).count(), 1);
}
