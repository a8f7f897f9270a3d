use std::sync::OnceLock;

use regex::Regex;

/// Name used when nothing usable is left of the input
pub const PLACEHOLDER: &str = "untitled";

/// Most filesystems cap a path component at 255 bytes, keep room for an extension
const MAX_BYTES: usize = 200;

/// Path separators, characters Windows refuses in file names, control characters
/// and whitespace. Any run of them becomes a single space.
static UNSAFE_RUN: OnceLock<Regex> = OnceLock::new();

fn unsafe_run() -> &'static Regex {
    UNSAFE_RUN.get_or_init(|| {
        Regex::new(r#"[\s/\\:*?"<>|\p{Cc}]+"#).expect("unsafe characters pattern is valid")
    })
}

/// Turn an untrusted title into a single file name component.
///
/// The result never contains a path separator, never is `.` or `..`,
/// and is never empty: [`PLACEHOLDER`] is returned instead.
pub fn sanitize(name: &str) -> String {
    let cleaned = unsafe_run().replace_all(name, " ");
    let cleaned = trim(&cleaned);
    let cleaned = trim(truncate(cleaned, MAX_BYTES));

    if cleaned.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Leading dots hide files, trailing dots and spaces are dropped by Windows
fn trim(s: &str) -> &str {
    s.trim_matches(|c| c == ' ' || c == '.')
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }

    let end = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= max)
        .last()
        .unwrap_or(0);
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_path_separators() {
        for title in ["AC/DC - Live", "..\\..\\etc\\passwd", "a/b\\c/d", "/"] {
            let name = sanitize(title);
            assert!(!name.contains('/'), "{name:?}");
            assert!(!name.contains('\\'), "{name:?}");
        }
        assert_eq!(sanitize("AC/DC - Live"), "AC DC - Live");
    }

    #[test]
    fn is_deterministic() {
        let title = "Best of 2023: \"Top\" 10 <clips> | part 1?";
        assert_eq!(sanitize(title), sanitize(title));
        assert_eq!(sanitize(title), "Best of 2023 Top 10 clips part 1");
    }

    #[test]
    fn collapses_whitespace_and_control_characters() {
        assert_eq!(sanitize("  line\none\t\ttwo\u{7}  "), "line one two");
    }

    #[test]
    fn empty_or_dot_names_become_the_placeholder() {
        assert_eq!(sanitize(""), PLACEHOLDER);
        assert_eq!(sanitize("   "), PLACEHOLDER);
        assert_eq!(sanitize("."), PLACEHOLDER);
        assert_eq!(sanitize(".."), PLACEHOLDER);
        assert_eq!(sanitize("/?*"), PLACEHOLDER);
    }

    #[test]
    fn keeps_unicode_titles() {
        assert_eq!(sanitize("ホロライブ 歌枠"), "ホロライブ 歌枠");
        assert_eq!(sanitize(".hidden"), "hidden");
    }

    #[test]
    fn truncates_on_a_char_boundary() {
        let title = "é".repeat(150);
        let name = sanitize(&title);
        assert!(name.len() <= MAX_BYTES);
        assert!(name.chars().all(|c| c == 'é'));
        assert_eq!(name.chars().count(), 100);
    }
}
