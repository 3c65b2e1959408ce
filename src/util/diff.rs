use std::collections::HashMap;
use std::ops::RangeInclusive;
use tracing::trace;

/// Lines added or modified per file, as read from a unified diff
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangedLines {
    files: HashMap<String, Vec<RangeInclusive<u32>>>,
}

impl ChangedLines {
    /// Parse `+++ b/<path>` headers and `@@ -a,b +c,d @@` hunk headers
    pub fn parse(diff: &str) -> Self {
        let mut files: HashMap<String, Vec<RangeInclusive<u32>>> = HashMap::new();
        let mut current: Option<String> = None;

        for line in diff.lines() {
            if let Some(target) = line.strip_prefix("+++ ") {
                let target = target.split('\t').next().unwrap_or(target).trim();
                current = if target == "/dev/null" {
                    None
                } else {
                    Some(target.strip_prefix("b/").unwrap_or(target).to_string())
                };
                continue;
            }
            let (Some(file), Some(hunk)) = (current.as_ref(), line.strip_prefix("@@ ")) else {
                continue;
            };
            if let Some(range) = parse_hunk(hunk) {
                trace!("Changed lines {:?} in {}", range, file);
                files.entry(file.clone()).or_default().push(range);
            }
        }

        Self { files }
    }

    pub fn contains(&self, file: &str, line: u32) -> bool {
        self.files
            .get(file)
            .is_some_and(|ranges| ranges.iter().any(|range| range.contains(&line)))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// New-side range of a hunk header body (`-a,b +c,d @@ ...`)
fn parse_hunk(hunk: &str) -> Option<RangeInclusive<u32>> {
    let new_side = hunk.split_whitespace().find_map(|part| part.strip_prefix('+'))?;
    let (start, count) = match new_side.split_once(',') {
        Some((start, count)) => (start.parse::<u32>().ok()?, count.parse::<u32>().ok()?),
        None => (new_side.parse::<u32>().ok()?, 1),
    };
    if count == 0 {
        return None;
    }
    // Ranges past u32::MAX cannot be real line numbers
    let end = start.checked_add(count - 1)?;
    Some(start..=end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const DIFF: &str = indoc! {"
        diff --git a/src/a.rs b/src/a.rs
        index 1111111..2222222 100644
        --- a/src/a.rs
        +++ b/src/a.rs
        @@ -10,0 +11,3 @@ fn main() {
        +    let a = 1;
        +    let b = 2;
        +    let c = 3;
        @@ -40 +43 @@
        -old
        +new
        @@ -50,2 +52,0 @@
        -gone
        -gone
        diff --git a/src/b.rs b/src/b.rs
        deleted file mode 100644
        --- a/src/b.rs
        +++ /dev/null
        @@ -1,2 +0,0 @@
        -x
        -y
    "};

    #[test]
    fn test_parse_added_range() {
        let changed = ChangedLines::parse(DIFF);
        assert!(!changed.contains("src/a.rs", 10));
        assert!(changed.contains("src/a.rs", 11));
        assert!(changed.contains("src/a.rs", 13));
        assert!(!changed.contains("src/a.rs", 14));
    }

    #[test]
    fn test_parse_single_line_hunk() {
        let changed = ChangedLines::parse(DIFF);
        assert!(changed.contains("src/a.rs", 43));
        assert!(!changed.contains("src/a.rs", 52));
    }

    #[test]
    fn test_deleted_file_is_skipped() {
        let changed = ChangedLines::parse(DIFF);
        assert_eq!(changed.file_count(), 1);
        assert!(!changed.contains("src/b.rs", 1));
    }

    #[test]
    fn test_hunk_past_last_line_is_skipped() {
        let changed = ChangedLines::parse("+++ b/a\n@@ -1 +4294967295,2 @@\n@@ -1 +3 @@\n");
        assert!(!changed.contains("a", u32::MAX));
        assert!(changed.contains("a", 3));

        let changed = ChangedLines::parse("+++ b/a\n@@ -1 +4294967295 @@\n");
        assert!(changed.contains("a", u32::MAX));
    }

    #[test]
    fn test_empty_diff() {
        let changed = ChangedLines::parse("");
        assert_eq!(changed, ChangedLines::default());
    }
}
