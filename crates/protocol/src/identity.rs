//! Identity composition and parsing.
//!
//! Every managed record is addressed by a single opaque string built from one
//! or more path segments, for example `"<repository>:<secret_name>"` or
//! `"<owner>/<repository>/<property>"`. This module builds those strings and
//! splits them back into their segments.
//!
//! # Examples
//!
//! ```
//! use hubform_protocol::identity::{compose, parse_two};
//!
//! let id = compose(&["my-repo", "API_KEY"], ':');
//! assert_eq!(id, "my-repo:API_KEY");
//!
//! let (repo, name) = parse_two(&id, ':').unwrap();
//! assert_eq!((repo, name), ("my-repo", "API_KEY"));
//! ```

use crate::error::{ProtocolError, Result};

/// Separator used by two-part identities such as `<repository>:<name>`.
pub const TWO_PART_SEPARATOR: char = ':';

/// Separator used by import identifiers and path-like identities.
pub const PATH_SEPARATOR: char = '/';

/// Joins identity segments with the given separator.
#[must_use]
pub fn compose(parts: &[&str], separator: char) -> String {
    let mut buf = [0; 4];
    parts.join(&*separator.encode_utf8(&mut buf))
}

/// Splits an identity into exactly `expected` non-empty segments.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidIdentity`] if the number of segments does
/// not match or any segment is empty.
pub fn parse(id: &str, separator: char, expected: usize) -> Result<Vec<&str>> {
    let parts: Vec<&str> = id.split(separator).collect();
    if parts.len() != expected || parts.iter().any(|p| p.is_empty()) {
        return Err(ProtocolError::InvalidIdentity {
            id: id.to_string(),
            expected: format!("{expected} non-empty segments separated by '{separator}'"),
        });
    }
    Ok(parts)
}

/// Splits a two-segment identity.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidIdentity`] unless `id` is exactly two
/// non-empty segments.
pub fn parse_two(id: &str, separator: char) -> Result<(&str, &str)> {
    let parts = parse(id, separator, 2)?;
    Ok((parts[0], parts[1]))
}

/// Splits a three-segment identity.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidIdentity`] unless `id` is exactly three
/// non-empty segments.
pub fn parse_three(id: &str, separator: char) -> Result<(&str, &str, &str)> {
    let parts = parse(id, separator, 3)?;
    Ok((parts[0], parts[1], parts[2]))
}

/// Splits at the first separator only, for identities whose last segment may
/// itself contain the separator (label names, for instance).
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidIdentity`] if the separator is missing or
/// either side is empty.
pub fn split_first(id: &str, separator: char) -> Result<(&str, &str)> {
    match id.split_once(separator) {
        Some((head, tail)) if !head.is_empty() && !tail.is_empty() => Ok((head, tail)),
        _ => Err(ProtocolError::InvalidIdentity {
            id: id.to_string(),
            expected: format!("<prefix>{separator}<rest>"),
        }),
    }
}

/// A repository addressed as `owner/name`.
///
/// # Examples
///
/// ```
/// use hubform_protocol::identity::FullName;
///
/// let full = FullName::parse("rust-lang/rust").unwrap();
/// assert_eq!(full.owner, "rust-lang");
/// assert_eq!(full.name, "rust");
/// assert_eq!(full.to_string(), "rust-lang/rust");
///
/// assert!(FullName::parse("invalid").is_err());
/// assert!(FullName::parse("too/many/slashes").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullName {
    /// The repository owner (user or organization).
    pub owner: String,
    /// The repository name.
    pub name: String,
}

impl FullName {
    /// Parses the `owner/name` form.
    ///
    /// # Errors
    ///
    /// Returns an error if the string does not contain exactly one `/` or
    /// either side is empty.
    pub fn parse(s: &str) -> Result<Self> {
        let (owner, name) = parse_two(s.trim(), PATH_SEPARATOR).map_err(|_| {
            ProtocolError::InvalidIdentity {
                id: s.to_string(),
                expected: "'owner/repo'".to_string(),
            }
        })?;
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for FullName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn compose_single_segment() {
        assert_eq!(compose(&["only"], ':'), "only");
    }

    #[test]
    fn compose_three_segments() {
        assert_eq!(
            compose(&["octo-org", "hello-world", "team"], PATH_SEPARATOR),
            "octo-org/hello-world/team"
        );
    }

    #[test]
    fn compose_accepts_multibyte_separators() {
        assert_eq!(compose(&["a", "b"], '→'), "a→b");
        assert_eq!(compose(&[], ':'), "");
    }

    #[test]
    fn parse_rejects_wrong_segment_count() {
        assert!(parse_two("a:b:c", ':').is_err());
        assert!(parse_two("a", ':').is_err());
        assert!(parse_three("a/b", '/').is_err());
    }

    #[test]
    fn parse_rejects_empty_segments() {
        assert!(parse_two(":b", ':').is_err());
        assert!(parse_two("a:", ':').is_err());
        assert!(parse_three("a//c", '/').is_err());
    }

    #[test]
    fn parse_error_names_the_identity() {
        let err = parse_two("broken", ':').unwrap_err();
        assert!(err.to_string().contains("'broken'"));
    }

    #[test]
    fn split_first_keeps_separator_in_tail() {
        assert_eq!(
            split_first("repo/team/backlog", '/').unwrap(),
            ("repo", "team/backlog")
        );
        assert!(split_first("repo/", '/').is_err());
        assert!(split_first("repo", '/').is_err());
    }

    #[test]
    fn full_name_trims_whitespace() {
        let full = FullName::parse("  owner/repo ").unwrap();
        assert_eq!(full.owner, "owner");
        assert_eq!(full.name, "repo");
    }

    proptest! {
        #[test]
        fn compose_then_parse_returns_segments(
            parts in proptest::collection::vec("[A-Za-z0-9_.-]{1,16}", 1..5)
        ) {
            let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
            let id = compose(&refs, ':');
            let parsed = parse(&id, ':', refs.len()).unwrap();
            prop_assert_eq!(parsed, refs);
        }

        #[test]
        fn parse_with_wrong_count_always_fails(
            parts in proptest::collection::vec("[a-z]{1,8}", 1..5),
            extra in 1usize..3,
        ) {
            let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
            let id = compose(&refs, '/');
            prop_assert!(parse(&id, '/', refs.len() + extra).is_err());
        }
    }
}
