//! Semantic-version parsing and comparison for package versions.
//!
//! Package authors frequently write `v1.2` or `1` in `metadata.version`, so
//! parsing is lenient about a leading `v` and missing minor/patch parts before
//! handing off to strict SemVer.

use semver::{Version, VersionReq};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("failed parsing semantic version '{input}': {source}")]
    Parse {
        input: String,
        #[source]
        source: semver::Error,
    },
    #[error("failed parsing semantic version constraint '{input}': {source}")]
    Constraint {
        input: String,
        #[source]
        source: semver::Error,
    },
}

pub fn parse_version(input: &str) -> Result<Version, VersionError> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    let core_end = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, rest) = trimmed.split_at(core_end);
    let padded = match core.matches('.').count() {
        0 if !core.is_empty() => format!("{core}.0.0{rest}"),
        1 => format!("{core}.0{rest}"),
        _ => trimmed.to_owned(),
    };

    Version::parse(&padded).map_err(|source| VersionError::Parse {
        input: input.to_owned(),
        source,
    })
}

/// Compare two versions by SemVer precedence. Build metadata is ignored and
/// a pre-release sorts below its release.
pub fn compare_versions(left: &str, right: &str) -> Result<Ordering, VersionError> {
    let l = parse_version(left)?;
    let r = parse_version(right)?;
    Ok(precedence(&l, &r))
}

fn precedence(l: &Version, r: &Version) -> Ordering {
    (l.major, l.minor, l.patch)
        .cmp(&(r.major, r.minor, r.patch))
        .then_with(|| l.pre.cmp(&r.pre))
}

/// Returns `true` when `next` stays inside the compatible range anchored at
/// `previous`: caret (`^`) for major >= 1, tilde (`~`) for major 0.
pub fn breaking_change_allowed(previous: &str, next: &str) -> Result<bool, VersionError> {
    let prev = parse_version(previous)?;
    let next = parse_version(next)?;

    let op = if prev.major == 0 { '~' } else { '^' };
    // Comparators reject build metadata.
    let mut constraint = format!("{op}{}.{}.{}", prev.major, prev.minor, prev.patch);
    if !prev.pre.is_empty() {
        constraint.push('-');
        constraint.push_str(prev.pre.as_str());
    }
    let req = VersionReq::parse(&constraint).map_err(|source| VersionError::Constraint {
        input: constraint.clone(),
        source,
    })?;
    Ok(req.matches(&next))
}
