//! Topic helpers: root sanitizing, wildcard matching and lobby topic parsing.
//!
//! Topics are `/`-separated segments. In patterns, `+` stands for exactly one
//! segment and `#` (only as the last segment) for any remaining segments.

use crate::error::{TopicError, TransportError};

/// Characters that would corrupt the topic tree if they appeared in the root.
const RESERVED: &[char] = &['\\', '/', '.', '#', '$', '+', '_'];

/// Builds the topic root from a raw prefix: reserved characters become `-` and a
/// trailing `/` is appended.
///
/// ```
/// use lobbyvisor::transport::topic::root_topic;
///
/// assert_eq!(root_topic("spacehack"), "spacehack/");
/// assert_eq!(root_topic("ci/run_42"), "ci-run-42/");
/// ```
pub fn root_topic(prefix: &str) -> String {
    let mut root: String = prefix
        .chars()
        .map(|c| if RESERVED.contains(&c) { '-' } else { c })
        .collect();
    root.push('/');
    root
}

/// Returns `true` if `topic` matches `pattern`.
pub fn matches(pattern: &str, topic: &str) -> bool {
    let mut topic_segments = topic.split('/');
    for p in pattern.split('/') {
        if p == "#" {
            return true;
        }
        match topic_segments.next() {
            Some(t) if p == "+" || p == t => {}
            _ => return false,
        }
    }
    topic_segments.next().is_none()
}

/// Checks a subscription pattern: no empty pattern, wildcards only as whole
/// segments, `#` only last.
pub fn validate_pattern(pattern: &str) -> Result<(), TransportError> {
    let invalid = || TransportError::InvalidTopic {
        topic: pattern.to_string(),
    };
    if pattern.is_empty() {
        return Err(invalid());
    }
    let segments: Vec<&str> = pattern.split('/').collect();
    for (i, seg) in segments.iter().enumerate() {
        let wildcard_inside = seg.len() > 1 && (seg.contains('+') || seg.contains('#'));
        let hash_not_last = *seg == "#" && i + 1 != segments.len();
        if wildcard_inside || hash_not_last {
            return Err(invalid());
        }
    }
    Ok(())
}

/// Checks a publish topic: non-empty and free of wildcards.
pub fn validate_topic(topic: &str) -> Result<(), TransportError> {
    if topic.is_empty() || topic.contains(['+', '#']) {
        return Err(TransportError::InvalidTopic {
            topic: topic.to_string(),
        });
    }
    Ok(())
}

/// Extracts the player identifier from a `<player>/<action>` topic.
pub fn player_segment<'a>(topic: &'a str, action: &str) -> Result<&'a str, TopicError> {
    match topic.split_once('/') {
        Some((player, rest)) if !player.is_empty() && rest == action => Ok(player),
        _ => Err(TopicError::UnknownPlayerSegment {
            topic: topic.to_string(),
        }),
    }
}
