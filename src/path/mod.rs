//! Znode path helpers.
//!
//! Paths are absolute, `/`-separated, with no empty, `.` or `..` segments.
//! Everything here is pure string manipulation; nothing talks to the server.


use crate::PathError;

pub const PATH_SEPARATOR: char = '/';

/// Validates the provided znode path string.
///
/// Returns the given path on success so it can be used inline.
pub fn validate_path(path: &str) -> std::result::Result<&str, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if !path.starts_with(PATH_SEPARATOR) {
        return Err(PathError::MissingLeadingSlash);
    }
    if path.len() == 1 {
        // the root
        return Ok(path);
    }
    if path.ends_with(PATH_SEPARATOR) {
        return Err(PathError::TrailingSlash);
    }

    let chars: Vec<char> = path.chars().collect();
    let invalid = |reason: &'static str, index: usize| PathError::Invalid {
        path: path.to_string(),
        reason,
        index,
    };
    let is_segment_end = |i: usize| i + 1 == chars.len() || chars[i + 1] == PATH_SEPARATOR;

    for i in 1..chars.len() {
        let c = chars[i];
        let last = chars[i - 1];

        if c == '\u{0}' {
            return Err(invalid("null character not allowed", i));
        } else if c == PATH_SEPARATOR && last == PATH_SEPARATOR {
            return Err(invalid("empty node name specified", i));
        } else if c == '.' && last == '.' {
            if i >= 2 && chars[i - 2] == PATH_SEPARATOR && is_segment_end(i) {
                return Err(invalid("relative paths not allowed", i));
            }
        } else if c == '.' {
            if last == PATH_SEPARATOR && is_segment_end(i) {
                return Err(invalid("relative paths not allowed", i));
            }
        } else if is_forbidden_char(c) {
            return Err(invalid("invalid character", i));
        }
    }

    Ok(path)
}

fn is_forbidden_char(c: char) -> bool {
    matches!(c,
        '\u{1}'..='\u{1f}'
        | '\u{7f}'..='\u{9f}'
        | '\u{e000}'..='\u{f8ff}'
        | '\u{fff0}'..='\u{ffff}')
}

/// Splits a validated path into its non-empty segments. `/` yields no segment.
pub fn split(path: &str) -> std::result::Result<Vec<&str>, PathError> {
    validate_path(path)?;
    Ok(path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()).collect())
}

/// Joins a parent path and a child name with exactly one separator.
///
/// `make_path("/", "a") == "/a"`, `make_path("/a/", "/b") == "/a/b"`.
pub fn make_path(
    parent: &str,
    child: &str,
) -> String {
    let parent = parent.trim_end_matches(PATH_SEPARATOR);
    let child = child.trim_start_matches(PATH_SEPARATOR);
    format!("{parent}{PATH_SEPARATOR}{child}")
}

/// Given a full path, return the node name: `/one/two/three` gives `three`.
/// The root path gives an empty name.
pub fn node_from_path(path: &str) -> std::result::Result<&str, PathError> {
    validate_path(path)?;
    Ok(path.rsplit(PATH_SEPARATOR).next().unwrap_or_default())
}

/// Parent of a path, or `None` for the root.
pub fn parent_path(path: &str) -> std::result::Result<Option<&str>, PathError> {
    validate_path(path)?;
    if path.len() == 1 {
        return Ok(None);
    }
    match path.rfind(PATH_SEPARATOR) {
        Some(0) => Ok(Some("/")),
        Some(idx) => Ok(Some(&path[..idx])),
        None => Ok(None),
    }
}

/// Every path from the first level down to `path` itself, shortest first.
///
/// `ancestors("/a/b/c") == ["/a", "/a/b", "/a/b/c"]`
pub fn ancestors(path: &str) -> std::result::Result<Vec<String>, PathError> {
    let mut current = String::new();
    let mut out = Vec::new();
    for segment in split(path)? {
        current.push(PATH_SEPARATOR);
        current.push_str(segment);
        out.push(current.clone());
    }
    Ok(out)
}
