//! Origin normalization, privacy scoping, and reconciliation.
//!
//! Resolution runs before any index access and may fail fast with
//! [`Error::PermissionDenied`]. It never mutates the caller's filter; the
//! resolved value is an explicit, immutable [`ResolvedOrigins`] consumed by
//! the query and count paths.

use crate::error::{Error, Result};
use crate::models::{OneOrMany, Permissions, PRIVATE_ORIGIN};

/// Effective scan scope for a record query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginScope {
    /// No origin filter; scan every indexed site except the private origin.
    AllExceptPrivate,
    /// No origin filter, caller may read private; scan default index targets.
    IndexTargets,
    /// Explicit origin set, already normalized.
    Origins(Vec<String>),
}

/// Output of resolving a filter's origin value against caller permissions.
#[derive(Debug, Clone)]
pub struct ResolvedOrigins {
    pub scope: OriginScope,
    /// Canonical requested origins in first-request order, when the filter
    /// named origins explicitly. Duplicates are collapsed here.
    pub requested: Option<Vec<String>>,
}

/// Canonical form of an origin identifier.
pub fn normalize_origin(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_ascii_lowercase()
}

/// Canonical form of a link target URL. Origins are case-normalized
/// separately; link paths stay case-sensitive.
pub fn normalize_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Resolve the filter's origin value into an effective scan scope.
///
/// Fails with [`Error::PermissionDenied`] when the caller explicitly names
/// the private origin without holding the capability to see it.
pub fn resolve_origins(
    origin: Option<&OneOrMany<String>>,
    permissions: Permissions,
) -> Result<ResolvedOrigins> {
    let exclude_private = !permissions.read_private;

    let Some(value) = origin else {
        let scope = if exclude_private {
            OriginScope::AllExceptPrivate
        } else {
            OriginScope::IndexTargets
        };
        return Ok(ResolvedOrigins {
            scope,
            requested: None,
        });
    };

    let mut normalized: Vec<String> = Vec::new();
    for raw in value.as_slice() {
        let origin = normalize_origin(raw);
        if exclude_private && origin == PRIVATE_ORIGIN {
            return Err(Error::PermissionDenied(origin));
        }
        if !normalized.contains(&origin) {
            normalized.push(origin);
        }
    }

    Ok(ResolvedOrigins {
        scope: OriginScope::Origins(normalized.clone()),
        requested: Some(normalized),
    })
}

/// Requested origins absent from the indexed set, in request order.
pub fn missed_origins(requested: &[String], indexed: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|origin| !indexed.contains(origin))
        .cloned()
        .collect()
}

/// Human-friendly title fallback derived from an origin.
///
/// Strips the scheme and shortens long hex keys to `abcdef..xy` so callers
/// always get something displayable for untitled sites.
pub fn friendly_title(origin: &str) -> String {
    let host = origin
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(origin);
    if host.len() >= 32 && host.bytes().all(|b| b.is_ascii_hexdigit()) {
        format!("{}..{}", &host[..6], &host[host.len() - 2..])
    } else {
        host.to_string()
    }
}
