//! Lexical path cleaning
//!
//! Cleaning never touches the filesystem: symlinks are not resolved and the
//! result for a relative input stays relative.

/// Return the shortest path equivalent to `path` by purely lexical processing.
///
/// Repeated separators collapse, `.` components are dropped, and each `..`
/// removes the preceding non-`..` component. A `..` directly under the root
/// is dropped. An empty result becomes `.` (or `/` for an absolute input).
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Clean a request path as if it were rooted, so it cannot climb above the root.
///
/// The result always starts with `/`; the root itself is `/`.
pub fn confine(path: &str) -> String {
    clean_path(&format!("/{path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", ".")]
    #[case(".", ".")]
    #[case("/", "/")]
    #[case("./foo/../bar", "bar")]
    #[case("a//b/./c/", "a/b/c")]
    #[case("../../x", "../../x")]
    #[case("a/../..", "..")]
    #[case("/../etc", "/etc")]
    #[case("/site/", "/site")]
    #[case("/srv/data", "/srv/data")]
    fn test_clean_path(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(clean_path(input), expected);
    }

    #[test]
    fn test_confine_stays_under_root() {
        assert_eq!(confine("../../etc/passwd"), "/etc/passwd");
        assert_eq!(confine(""), "/");
        assert_eq!(confine("docs/./a.txt"), "/docs/a.txt");
        assert_eq!(confine("/docs/../.."), "/");
    }
}
