//! Structural formatting for plain-text model output.
//!
//! Models behind the workflow engine frequently emit code, tables and
//! `Key: value` listings without any markdown. `format_content` rewrites those
//! shapes into markdown before the text reaches a renderer. Every stage is a
//! pure `&str -> String` pass over lines.

mod code;
mod list;
mod schema;
mod spacing;
mod table;

pub use code::wrap_code_blocks;
pub use list::format_structured_lists;
pub use schema::format_schema_blocks;
pub use spacing::normalize_spacing;
pub use table::format_pipe_tables;

pub(crate) const FENCE: &str = "```";

/// Run every formatting stage in order
pub fn format_content(text: &str) -> String {
    let text = wrap_code_blocks(text);
    let text = format_schema_blocks(&text);
    let text = format_pipe_tables(&text);
    let text = format_structured_lists(&text);
    normalize_spacing(&text)
}

/// Check if a line opens or closes a fenced block
pub(crate) fn is_fence_line(line: &str) -> bool {
    line.trim_start().starts_with(FENCE)
}

/// Tracks whether a line-by-line scan is inside a fenced block
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: bool,
}

impl FenceTracker {
    /// Observe the next line. Returns true if the line is a fence marker or
    /// sits inside a fenced block.
    pub(crate) fn observe(&mut self, line: &str) -> bool {
        if is_fence_line(line) {
            self.open = !self.open;
            return true;
        }
        self.open
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(format_content(""), "");
        assert_eq!(format_content("\n\n  \n"), "");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(format_content("Hel"), "Hel");
        assert_eq!(format_content("Hello"), "Hello");
        assert_eq!(
            format_content("First paragraph.\n\nSecond paragraph."),
            "First paragraph.\n\nSecond paragraph."
        );
    }

    #[test]
    fn test_fence_tracker() {
        let mut fences = FenceTracker::default();
        assert!(!fences.observe("text"));
        assert!(fences.observe("```rust"));
        assert!(fences.is_open());
        assert!(fences.observe("let x = 1;"));
        assert!(fences.observe("  ```"));
        assert!(!fences.is_open());
        assert!(!fences.observe("after"));
    }

    #[test]
    fn test_detected_code_gets_fenced_and_spaced() {
        let input = "Here is the function:\nfunction add(a, b) {\n    return a + b;\n}\nThat is all.";
        assert_eq!(
            format_content(input),
            "Here is the function:\n\n```javascript\nfunction add(a, b) {\n    return a + b;\n}\n```\n\nThat is all."
        );
    }

    #[test]
    fn test_existing_fence_skips_code_detection() {
        let input = "```\nx\n```\nconst a = 1;\nconst b = 2;\nconst c = 3;";
        let out = format_content(input);
        assert_eq!(out.matches(FENCE).count(), 2);
        assert!(out.ends_with("const a = 1;\nconst b = 2;\nconst c = 3;"));
    }

    #[test]
    fn test_table_then_text() {
        let input = "Results:\n| a | b |\n| 1 | 2 |\nDone";
        assert_eq!(
            format_content(input),
            "Results:\n\n| a | b |\n| --- | --- |\n| 1 | 2 |\n\nDone"
        );
    }

    #[test]
    fn test_mixed_content_is_idempotent() {
        let inputs = [
            "Summary\nName: Alice\nRole: Admin\n| id | name |\n| 1 | a |\nend",
            "# Title\nSome text\n## Part\n- Status: ok",
            "Code follows\nimport os\nimport sys\nprint(os.name)\nbye",
            "TABLE: users COLUMNS:\n- id | uuid\n- email | text\n",
            "Plain prose with no structure at all.",
        ];
        for input in inputs {
            let once = format_content(input);
            let twice = format_content(&once);
            assert_eq!(twice, once, "input {:?}", input);
        }
    }

    #[test]
    fn test_streaming_prefixes_never_panic() {
        let full = "TABLE: orders COLUMNS:\n- id | int\n- total | numeric\n\nName: x\n| a | b |\n|---|---|\nconst q = 1;\nconst r = 2;\nlet s = 3;\n## Done ✓";
        let mut end = 0;
        while end <= full.len() {
            if full.is_char_boundary(end) {
                let _ = format_content(&full[..end]);
            }
            end += 1;
        }
    }
}
