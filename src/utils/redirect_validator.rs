//! Post-login redirect resolution.
//!
//! The `state` parameter is round-tripped through the browser, so the return
//! path it carries is attacker-influenced. Relative targets are always resolved
//! against the configured application origin and only contribute a path and
//! query; absolute targets must be on the allow-list.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Query parameters consumed by the callback that must never reach the redirect
const CALLBACK_PARAMS: &[&str] = &["code", "state"];

// Allowed schemes for absolute redirect targets
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Upper bound on relative redirect targets
pub const MAX_REDIRECT_LENGTH: usize = 2048;

// Control characters and backslashes have no business in a return path
static SUSPICIOUS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x1F\x7F]|\\").expect("static regex is valid"));

/// What to do when the return path from `state` is not acceptable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UntrustedRedirect {
    /// Fail the callback with the generic error response
    #[default]
    #[serde(rename = "reject")]
    Reject,
    /// Ignore the return path and use the configured default
    #[serde(rename = "fallback")]
    FallbackToDefault,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RedirectError {
    #[error("redirect target is not a valid URL: {0}")]
    InvalidUrl(String),
    #[error("redirect scheme '{0}' is not allowed")]
    DisallowedScheme(String),
    #[error("redirect origin '{0}' is not trusted")]
    UntrustedOrigin(String),
    #[error("redirect target is {0} characters long")]
    TooLong(usize),
    #[error("redirect target contains a forbidden pattern")]
    SuspiciousPattern,
}

/// Which absolute redirect targets are acceptable
#[derive(Debug, Clone, Default)]
pub struct RedirectPolicy {
    allowed_origins: Vec<String>,
    untrusted: UntrustedRedirect,
}

impl RedirectPolicy {
    /// Build a policy from configured origins such as `https://app.example.com`.
    /// Entries that are not absolute URLs are skipped with a warning.
    #[must_use]
    pub fn new(allowed_origins: &[String], untrusted: UntrustedRedirect) -> Self {
        let allowed_origins = allowed_origins
            .iter()
            .filter_map(|entry| match Url::parse(entry.trim()) {
                Ok(url) if url.origin().is_tuple() => Some(url.origin().ascii_serialization()),
                _ => {
                    warn!("Ignoring invalid allowed redirect origin: {entry}");
                    None
                }
            })
            .collect();

        Self {
            allowed_origins,
            untrusted,
        }
    }

    #[must_use]
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    fn allows_origin(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}

/// Remove every `code` and `state` query parameter, dropping the query
/// entirely when nothing else remains.
pub fn strip_callback_params(url: &mut Url) {
    let remaining: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .filter(|(key, _)| !CALLBACK_PARAMS.contains(&key.as_str()))
        .collect();
    replace_query(url, &remaining);
}

/// Compute where the browser goes after a successful login.
///
/// `decoded_return` comes from the `state` parameter and is untrusted;
/// `default_return` comes from configuration. The request URL must already be
/// anchored on the configured application origin.
///
/// # Errors
///
/// Returns an error if the chosen target cannot be used and the policy says
/// to reject rather than fall back.
pub fn resolve_redirect_target(
    request_url: &Url,
    decoded_return: Option<&str>,
    default_return: &str,
    policy: &RedirectPolicy,
) -> Result<Url, RedirectError> {
    let mut cleaned = request_url.clone();
    strip_callback_params(&mut cleaned);

    let Some(target) = decoded_return else {
        return resolve_target(cleaned, default_return, request_url, policy, true);
    };

    match resolve_target(cleaned, target, request_url, policy, false) {
        Ok(url) => Ok(url),
        Err(e) if policy.untrusted == UntrustedRedirect::FallbackToDefault => {
            warn!("Ignoring return path from state ({e}), using default '{default_return}'");
            resolve_redirect_target(request_url, None, default_return, policy)
        }
        Err(e) => Err(e),
    }
}

fn resolve_target(
    cleaned: Url,
    target: &str,
    request_url: &Url,
    policy: &RedirectPolicy,
    trusted_source: bool,
) -> Result<Url, RedirectError> {
    let resolved = if target.starts_with('/') {
        merge_relative_target(cleaned, target)?
    } else {
        validate_absolute_target(target, request_url, policy, trusted_source)?
    };
    debug!("Resolved post-login redirect to {resolved}");
    Ok(resolved)
}

/// Replace the cleaned URL's path with the target's and append the target's
/// query parameters after the ones already present.
fn merge_relative_target(mut cleaned: Url, target: &str) -> Result<Url, RedirectError> {
    if target.len() > MAX_REDIRECT_LENGTH {
        warn!("Excessively long redirect target: {} characters", target.len());
        return Err(RedirectError::TooLong(target.len()));
    }

    // Only the path can be abused to name another host; the query is carried
    // over as data
    let path = target.split(['?', '#']).next().unwrap_or_default();
    if path.starts_with("//") || has_suspicious_pattern(path) {
        warn!("Suspicious redirect target rejected: {target:?}");
        return Err(RedirectError::SuspiciousPattern);
    }

    let resolved = cleaned
        .join(target)
        .map_err(|e| RedirectError::InvalidUrl(e.to_string()))?;

    cleaned.set_path(resolved.path());

    let mut pairs: Vec<(String, String)> = cleaned.query_pairs().into_owned().collect();
    pairs.extend(resolved.query_pairs().into_owned());
    replace_query(&mut cleaned, &pairs);

    Ok(cleaned)
}

fn validate_absolute_target(
    target: &str,
    request_url: &Url,
    policy: &RedirectPolicy,
    trusted_source: bool,
) -> Result<Url, RedirectError> {
    let parsed = Url::parse(target).map_err(|e| {
        warn!("Failed to parse redirect target '{target}': {e}");
        RedirectError::InvalidUrl(e.to_string())
    })?;

    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        warn!("Invalid scheme '{}' in redirect target", parsed.scheme());
        return Err(RedirectError::DisallowedScheme(parsed.scheme().to_string()));
    }

    if trusted_source {
        return Ok(parsed);
    }

    let origin = parsed.origin().ascii_serialization();
    if origin == request_url.origin().ascii_serialization() || policy.allows_origin(&origin) {
        Ok(parsed)
    } else {
        warn!("Redirect to untrusted origin blocked: {origin}");
        Err(RedirectError::UntrustedOrigin(origin))
    }
}

/// Check the raw target and its percent-decoded variants
fn has_suspicious_pattern(target: &str) -> bool {
    if SUSPICIOUS_PATTERN.is_match(target) {
        return true;
    }

    let Ok(decoded) = urlencoding::decode(target) else {
        return false;
    };
    if SUSPICIOUS_PATTERN.is_match(&decoded) || decoded.starts_with("//") {
        return true;
    }

    // double encoding
    urlencoding::decode(&decoded)
        .is_ok_and(|twice| SUSPICIOUS_PATTERN.is_match(&twice) || twice.starts_with("//"))
}

fn replace_query(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
}
