// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! NATS-style subjects: dot-separated tokens, `*` matches one token and a
//! trailing `>` matches one or more.

use crate::BusError;

/// Checks a subject (or pattern, when `wildcards` is set).
pub fn validate(subject: &str, wildcards: bool) -> Result<(), BusError> {
    let invalid = || BusError::InvalidSubject(subject.to_owned());
    if subject.is_empty() || subject.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let tokens: Vec<&str> = subject.split('.').collect();
    for (i, token) in tokens.iter().enumerate() {
        match *token {
            "" => return Err(invalid()),
            "*" if wildcards => {}
            ">" if wildcards && i + 1 == tokens.len() => {}
            t if t.contains(['*', '>']) => return Err(invalid()),
            _ => {}
        }
    }
    Ok(())
}

/// True when `subject` matches `pattern`.
pub fn matches(pattern: &str, subject: &str) -> bool {
    let mut subject_tokens = subject.split('.');
    for p in pattern.split('.') {
        match (p, subject_tokens.next()) {
            (">", Some(_)) => return true,
            ("*", Some(_)) => {}
            (p, Some(s)) if p == s => {}
            _ => return false,
        }
    }
    subject_tokens.next().is_none()
}

/// Joins the tokens after the first `skip` with `/`, giving a scene path.
///
/// `suffix_path("meshcat.transformations.drone.arm", 2)` is `drone/arm`.
pub fn suffix_path(subject: &str, skip: usize) -> String {
    subject.split('.').skip(skip).collect::<Vec<_>>().join("/")
}
