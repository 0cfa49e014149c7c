//! Simple path-spec parsing.
//!
//! A spec is either an exact record path (`/blog/first.md`) or a single-level
//! wildcard pattern (`/blog/*.md`, `/blog/*`) matching records by directory
//! prefix and optional file extension. Wildcards are only valid in the final
//! segment; anything else is rejected.

use crate::error::{Error, Result};

/// A parsed path spec, ready for SQL translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPredicate {
    /// Match the record path exactly.
    Exact(String),
    /// Match records directly under `prefix`, optionally restricted to one
    /// file extension (including the leading dot).
    Pattern {
        prefix: String,
        extension: Option<String>,
    },
}

/// Parse one path spec string into a [`PathPredicate`].
pub fn parse_path_spec(spec: &str) -> Result<PathPredicate> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(Error::InvalidPathSpec("empty spec".to_string()));
    }
    if !spec.starts_with('/') {
        return Err(Error::InvalidPathSpec(format!(
            "spec must start with '/': {}",
            spec
        )));
    }

    if !spec.contains('*') {
        return Ok(PathPredicate::Exact(spec.to_string()));
    }

    // Wildcard form: "<prefix>/*" or "<prefix>/*.<ext>"
    let slash = spec.rfind('/').unwrap_or(0);
    let (dir, file) = (&spec[..slash], &spec[slash + 1..]);
    if dir.contains('*') {
        return Err(Error::InvalidPathSpec(format!(
            "wildcards are only allowed in the final segment: {}",
            spec
        )));
    }

    let rest = file.strip_prefix('*').ok_or_else(|| {
        Error::InvalidPathSpec(format!("pattern segment must start with '*': {}", spec))
    })?;
    if rest.contains('*') {
        return Err(Error::InvalidPathSpec(format!(
            "only one wildcard is allowed: {}",
            spec
        )));
    }

    let extension = if rest.is_empty() {
        None
    } else if rest.starts_with('.') {
        Some(rest.to_string())
    } else {
        return Err(Error::InvalidPathSpec(format!(
            "pattern suffix must be an extension like '.md': {}",
            spec
        )));
    };

    Ok(PathPredicate::Pattern {
        prefix: dir.to_string(),
        extension,
    })
}
