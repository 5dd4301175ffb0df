//! Unique, DNS-label-safe names for per-test namespaces.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Kubernetes namespace names are RFC 1123 labels.
pub const MAX_LABEL_LEN: usize = 63;
pub const DEFAULT_PREFIX: &str = "zt-test";
const SUFFIX_LEN: usize = 8;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Lowercase alphanumerics and single hyphens, no leading or trailing
/// hyphen, at most [`MAX_LABEL_LEN`] characters.
pub fn sanitize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    out.truncate(MAX_LABEL_LEN);
    out.trim_end_matches('-').to_owned()
}

/// Short hex suffix that differs between calls, even within one process.
pub fn unique_suffix(seed: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let input = format!("{seed}:{}:{nanos}:{n}", std::process::id());
    blake3::hash(input.as_bytes()).to_hex()[..SUFFIX_LEN].to_owned()
}

/// `<prefix>-<YYYYMMDD-HHMMSS>-<suffix>`, with the prefix shortened as
/// needed so the whole name fits in one label.
pub fn test_namespace<Tz>(prefix: &str, now: &DateTime<Tz>, suffix: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let tail = sanitize_label(&format!("{}-{suffix}", now.format("%Y%m%d-%H%M%S")));
    let mut head = sanitize_label(prefix);
    if head.is_empty() {
        head = DEFAULT_PREFIX.to_owned();
    }
    let room = MAX_LABEL_LEN.saturating_sub(tail.len() + 1);
    head.truncate(room);
    let head = head.trim_end_matches('-');
    if head.is_empty() {
        tail
    } else {
        format!("{head}-{tail}")
    }
}
