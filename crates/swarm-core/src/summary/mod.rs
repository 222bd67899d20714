//! Rule-based summarization of canonical events.
//!
//! Summaries are derived on demand and never persisted. They come in three
//! tiers of increasing size, plus incremental deltas, one-line status
//! sentences and priority filtering for raw event reads.

mod aggregate;
mod bash;
mod delta;
mod priority;
mod status_line;
mod tiers;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use aggregate::{AgentSummary, BASH_HISTORY, MAX_MESSAGE_CHARS, summarize_events};
pub use bash::{BashFileOps, extract_file_ops};
pub use delta::{DeltaView, get_delta};
pub use priority::{EventPriority, filter_by_priority};
pub use status_line::MAX_STATUS_WORDS;
pub use tiers::{BriefView, DetailedView, StandardView, TieredSummary};

/// How much of a summary to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Brief,
    #[default]
    Standard,
    Detailed,
}

impl DetailLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Brief => "brief",
            Self::Standard => "standard",
            Self::Detailed => "detailed",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brief" => Ok(Self::Brief),
            "standard" => Ok(Self::Standard),
            "detailed" => Ok(Self::Detailed),
            _ => Err(Error::InvalidDetailLevel(s.to_string())),
        }
    }
}

/// Human-readable elapsed time: whole seconds under a minute, else minutes
/// with one decimal.
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 60 {
        format!("{secs} seconds")
    } else {
        format!("{:.1} minutes", elapsed.as_secs_f64() / 60.0)
    }
}

/// Cut `text` to at most `max` characters, marking the cut with `...`.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn duration_text() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0 seconds");
        assert_eq!(format_duration(Duration::from_millis(59_900)), "59 seconds");
        assert_eq!(format_duration(Duration::from_secs(60)), "1.0 minutes");
        assert_eq!(format_duration(Duration::from_secs(150)), "2.5 minutes");
    }

    #[test]
    fn truncation_is_char_based() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("ééééééé", 5), "éé...");
    }

    #[test]
    fn detail_level_parses_and_defaults_to_standard() {
        assert_eq!("BRIEF".parse::<DetailLevel>().unwrap(), DetailLevel::Brief);
        assert_eq!(DetailLevel::default(), DetailLevel::Standard);
        assert!(matches!(
            "full".parse::<DetailLevel>(),
            Err(Error::InvalidDetailLevel(_))
        ));
    }
}
