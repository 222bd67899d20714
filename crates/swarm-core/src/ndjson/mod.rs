//! NDJSON normalization for the supported agent CLIs.
//!
//! Each CLI writes newline-delimited JSON to stdout in its own shape. This
//! module translates those payloads into one canonical event model,
//! implementing a tolerant reader pattern.

mod blocks;
mod claude;
mod codex;
mod cursor;
mod gemini;
mod normalizer;
mod types;

pub use normalizer::{EventNormalizer, normalize_events};
pub use types::*;
