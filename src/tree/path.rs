//! Slash-separated content paths

use crate::{Error, Result};

/// Split a path into its segments, rejecting malformed paths
///
/// A valid path is non-empty, has no leading or trailing slash, no empty,
/// `.` or `..` segment and no NUL byte.
pub fn split(path: &str) -> Result<Vec<&str>> {
    if path.is_empty() {
        return Err(Error::InvalidPath("empty path".into()));
    }
    if path.contains('\0') {
        return Err(Error::InvalidPath(format!("{:?} contains NUL", path)));
    }
    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments {
        match *segment {
            "" => return Err(Error::InvalidPath(format!("{:?} has an empty segment", path))),
            "." | ".." => {
                return Err(Error::InvalidPath(format!(
                    "{:?} has a relative segment",
                    path
                )))
            }
            _ => {}
        }
    }
    Ok(segments)
}

/// Join a parent path (possibly the root, `""`) with a child name
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// True if `path` lies strictly below `ancestor`
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_valid() {
        assert_eq!(split("a").unwrap(), vec!["a"]);
        assert_eq!(split("a/b c/d.txt").unwrap(), vec!["a", "b c", "d.txt"]);
    }

    #[test]
    fn test_split_rejects_malformed() {
        for bad in ["", "/a", "a/", "a//b", "./a", "a/../b", "a\0b"] {
            let err = split(bad).unwrap_err();
            assert!(err.is_structural(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_join_and_descendant() {
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a/b", "c"), "a/b/c");
        assert!(is_descendant("a/b", "a"));
        assert!(!is_descendant("ab", "a"));
        assert!(!is_descendant("a", "a"));
    }
}
