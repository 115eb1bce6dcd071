//! # Callback URL Validation
//!
//! Heuristic filter applied before a callback URL is persisted. This is not
//! an RFC 3986 validator: exotic but valid URLs may be rejected, obviously
//! malformed strings must be.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// URLs with this many characters or more are rejected.
pub const MAX_URL_RUNE_COUNT: usize = 2083;

/// URLs of this many bytes or fewer are rejected.
pub const MIN_URL_LEN: usize = 3;

/// Optional http(s) scheme, a dotted host, then a path/query/fragment suffix
/// drawn from a restricted character set.
const URL_PATTERN: &str =
    r"^(?:https?://)?[0-9A-Za-z_.-]+(?:\.[0-9A-Za-z_.-]+)+[0-9A-Za-z_\-.~:/?#\[\]@!$&'()*+,;=]+$";

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(URL_PATTERN).expect("URL_PATTERN is a valid regex"));

/// Check whether `candidate` is usable as a callback URL.
pub fn is_url(candidate: &str) -> bool {
    if candidate.is_empty()
        || candidate.chars().count() >= MAX_URL_RUNE_COUNT
        || candidate.len() <= MIN_URL_LEN
        || candidate.starts_with('.')
    {
        return false;
    }

    // "host:port" without a scheme: borrow http:// for structural parsing only
    let structural = if candidate.contains(':') && !candidate.contains("://") {
        format!("http://{}", candidate)
    } else {
        candidate.to_string()
    };

    let Some((host, path)) = split_host_and_path(&structural) else {
        return false;
    };

    if host.starts_with('.') {
        return false;
    }
    if host.is_empty() && !path.is_empty() && !path.contains('.') {
        return false;
    }

    URL_REGEX.is_match(candidate)
}

/// Returns `(host, path)`, or `None` when the string cannot be parsed at all.
///
/// A scheme-less reference (`example.com/hook`) has no host and the whole
/// string, up to the query or fragment, as its path.
fn split_host_and_path(raw: &str) -> Option<(String, String)> {
    match Url::parse(raw) {
        Ok(parsed) => Some((
            parsed.host_str().unwrap_or_default().to_string(),
            parsed.path().to_string(),
        )),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let end = raw.find(['?', '#']).unwrap_or(raw.len());
            Some((String::new(), raw[..end].to_string()))
        }
        Err(_) => None,
    }
}
