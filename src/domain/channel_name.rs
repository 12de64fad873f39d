//! Channel name validation and wildcard expansion.
//!
//! Channel names are `/`-separated paths (`/topic0`, `/chat/room1`).
//! Subscriptions may end in a wildcard segment: `/*` matches exactly one
//! trailing segment, `/**` matches one or more. Wildcards are only legal
//! as the final segment; publish names must be fully concrete.
//!
//! Matching works by expansion rather than scanning: [`wild_names`]
//! computes every wildcard pattern that covers a concrete name, so the
//! router resolves subscribers with a handful of map lookups instead of
//! walking all channels.

use crate::error::BrokerError;

/// Characters allowed in a channel segment besides ASCII alphanumerics.
const EXTRA_SEGMENT_CHARS: &[char] = &['-', '_', '!', '~', '(', ')', '$', '@'];

/// Returns `true` if `segment` is a non-empty run of allowed characters.
fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || EXTRA_SEGMENT_CHARS.contains(&c))
}

/// Validates a channel name, optionally permitting a trailing wildcard.
///
/// Accepted shapes: `/seg(/seg)*` with an optional single trailing `/`,
/// or (when `allow_wildcards` is set) a final `*` or `**` segment —
/// including the bare patterns `/*` and `/**`.
fn is_valid_name(name: &str, allow_wildcards: bool) -> bool {
    let Some(rest) = name.strip_prefix('/') else {
        return false;
    };
    if rest.is_empty() {
        return false;
    }

    let mut segments: Vec<&str> = rest.split('/').collect();

    // A single trailing slash is tolerated, but only after a concrete
    // segment ("/a/b/" yes, "/a/*/" no).
    if segments.len() > 1 && segments.last() == Some(&"") {
        segments.pop();
        if matches!(segments.last(), Some(&"*") | Some(&"**")) {
            return false;
        }
    }

    match segments.split_last() {
        None => false,
        Some((last, init)) => {
            let tail_ok = match *last {
                "*" | "**" => allow_wildcards,
                segment => is_valid_segment(segment),
            };
            tail_ok && init.iter().copied().all(is_valid_segment)
        }
    }
}

/// Validates a concrete channel name used as a publish target.
///
/// # Errors
///
/// Returns [`BrokerError::ChannelInvalid`] if `name` is empty, contains
/// disallowed characters or empty segments, or uses a wildcard.
pub fn validate_publish_name(name: &str) -> Result<(), BrokerError> {
    if is_valid_name(name, false) {
        Ok(())
    } else {
        Err(BrokerError::ChannelInvalid(name.to_string()))
    }
}

/// Validates a channel name or pattern used as a subscription target.
///
/// # Errors
///
/// Returns [`BrokerError::ChannelInvalid`] if `name` is empty, contains
/// disallowed characters or empty segments, or places a wildcard
/// anywhere but the final segment.
pub fn validate_subscribe_name(name: &str) -> Result<(), BrokerError> {
    if is_valid_name(name, true) {
        Ok(())
    } else {
        Err(BrokerError::ChannelInvalid(name.to_string()))
    }
}

/// Returns `true` if `name` ends in a `*` or `**` segment.
#[must_use]
pub fn is_wildcard(name: &str) -> bool {
    matches!(name.rsplit('/').next(), Some("*" | "**"))
}

/// Returns `true` for protocol control channels (`/meta/...`).
#[must_use]
pub fn is_meta_channel(name: &str) -> bool {
    name.starts_with("/meta/")
}

/// Returns every wildcard pattern covering the concrete name.
///
/// For `/a/b/c` this is `["/a/b/*", "/a/b/**", "/a/**", "/**"]`: the
/// single-segment pattern at the same depth, then the multi-segment
/// patterns from the deepest prefix up to the root. Names that are
/// themselves wildcards (or empty) expand to nothing.
#[must_use]
pub fn wild_names(name: &str) -> Vec<String> {
    let mut segments: Vec<&str> = name.split('/').collect();
    let last = segments.pop();

    if name.is_empty() || matches!(last, Some("*" | "**")) {
        return Vec::new();
    }

    let mut prefix = String::with_capacity(name.len());
    let mut doubles = Vec::with_capacity(segments.len());
    for segment in &segments {
        prefix.push_str(segment);
        prefix.push('/');
        doubles.push(format!("{prefix}**"));
    }

    let mut patterns = Vec::with_capacity(doubles.len() + 1);
    patterns.push(format!("{prefix}*"));
    doubles.reverse();
    patterns.extend(doubles);
    patterns
}
