//! File paths touched by common shell idioms.

use std::sync::LazyLock;

use regex::Regex;

/// `/bin/zsh -lc "actual command"`
static SHELL_WRAPPER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"-[lc]+\s+["'](.+)["']$"#).expect("static regex is valid"));

static WRITE_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        // cat/echo/printf ... > file
        Regex::new(r#"(?:cat|echo|printf)\s+.*?>\s*["']?([^\s"'|;&]+)"#).expect("static regex is valid"),
        Regex::new(r#"tee\s+(?:-a\s+)?["']?([^\s"'|;&]+)"#).expect("static regex is valid"),
        Regex::new(r#"sed\s+-i\S*\s+.*?["']?([^\s"']+)$"#).expect("static regex is valid"),
    ]
});

static READ_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        // sed -n '1,100p' file
        Regex::new(r#"sed\s+-n\s+["'][^"']+["']\s+["']?([^\s"'|;&>]+)"#).expect("static regex is valid"),
        Regex::new(r#"\b(?:head|tail)\s+(?:-\w+\s+)*(?:\d+\s+)?([^\s"'|;&-][^\s"'|;&]*)"#)
            .expect("static regex is valid"),
    ]
});

/// Paths a shell command reads and writes, best effort.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BashFileOps {
    pub read: Vec<String>,
    pub written: Vec<String>,
}

pub fn extract_file_ops(command: &str) -> BashFileOps {
    let command = SHELL_WRAPPER_RE
        .captures(command)
        .and_then(|caps| caps.get(1))
        .map_or(command, |m| m.as_str());

    BashFileOps {
        read: capture_paths(READ_RES.iter(), command),
        written: capture_paths(WRITE_RES.iter(), command),
    }
}

fn capture_paths<'a>(patterns: impl Iterator<Item = &'a Regex>, command: &str) -> Vec<String> {
    patterns
        .flat_map(|re| re.captures_iter(command))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|path| !path.is_empty() && !path.starts_with('-'))
        .map(String::from)
        .collect()
}
