//! Close markdown constructs left open by a truncated stream.
//!
//! The visible buffer is a growing prefix of the final reply, so a bold marker
//! or code fence is often opened before its closer arrives. Rendering such a
//! prefix as-is makes the rest of the message flicker between styles. The
//! repair is a counting heuristic: literal asterisks inside code can fool it,
//! and that is accepted.

const FENCE: &str = "```";

/// Marker counts gathered in a single pass
#[derive(Debug, Default, PartialEq, Eq)]
struct MarkerCounts {
    bold: usize,
    italic: usize,
    inline_code: usize,
    fences: usize,
}

impl MarkerCounts {
    fn scan(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut counts = MarkerCounts {
            bold: text.matches("**").count(),
            ..Default::default()
        };

        // Italic markers are asterisks with no asterisk on either side
        for (i, &b) in bytes.iter().enumerate() {
            if b != b'*' {
                continue;
            }
            let prev_star = i > 0 && bytes[i - 1] == b'*';
            let next_star = bytes.get(i + 1) == Some(&b'*');
            if !prev_star && !next_star {
                counts.italic += 1;
            }
        }

        // Backticks come in runs: three or more form fences, shorter runs
        // are inline code unless they sit inside an open fence
        let mut in_fence = false;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != b'`' {
                i += 1;
                continue;
            }
            let start = i;
            while i < bytes.len() && bytes[i] == b'`' {
                i += 1;
            }
            let run = i - start;
            if run >= FENCE.len() {
                let fences = run / FENCE.len();
                counts.fences += fences;
                if fences % 2 == 1 {
                    in_fence = !in_fence;
                }
            } else if !in_fence {
                counts.inline_code += run;
            }
        }

        counts
    }
}

/// Append closers for any marker with an odd count.
///
/// Closers go in a fixed order: bold, italic, inline code, fence. Input whose
/// markers are all paired comes back unchanged.
pub fn repair_markdown(text: &str) -> String {
    let counts = MarkerCounts::scan(text);
    let mut out = String::with_capacity(text.len() + 8);
    out.push_str(text);

    if counts.bold % 2 == 1 {
        out.push_str("**");
    }
    if counts.italic % 2 == 1 {
        out.push('*');
    }
    if counts.inline_code % 2 == 1 {
        out.push('`');
    }
    if counts.fences % 2 == 1 {
        out.push('\n');
        out.push_str(FENCE);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_plain_text_unchanged() {
        assert_eq!(repair_markdown(""), "");
        assert_eq!(repair_markdown("Hello"), "Hello");
        assert_eq!(repair_markdown("line one\nline two"), "line one\nline two");
    }

    #[test]
    fn test_unclosed_bold() {
        assert_eq!(repair_markdown("This is **important"), "This is **important**");
    }

    #[test]
    fn test_odd_bold_appends_exactly_closer() {
        for text in ["**a", "**a** and **b", "x ** y", "****a**"] {
            let repaired = repair_markdown(text);
            assert_eq!(repaired, format!("{}**", text), "input {:?}", text);
            assert_eq!(repaired.matches("**").count() % 2, 0);
        }
    }

    #[test]
    fn test_unclosed_italic() {
        assert_eq!(repair_markdown("an *emphatic"), "an *emphatic*");
        // Asterisks inside a bold pair are not italics
        assert_eq!(repair_markdown("**bold** text"), "**bold** text");
    }

    #[test]
    fn test_unclosed_inline_code() {
        assert_eq!(repair_markdown("run `cargo"), "run `cargo`");
        assert_eq!(repair_markdown("run `cargo` now"), "run `cargo` now");
    }

    #[test]
    fn test_unclosed_fence() {
        assert_eq!(
            repair_markdown("```rust\nfn main() {"),
            "```rust\nfn main() {\n```"
        );
    }

    #[test]
    fn test_fence_backticks_are_not_inline_code() {
        let closed = "```\ncode\n```";
        assert_eq!(repair_markdown(closed), closed);
    }

    #[test]
    fn test_backticks_inside_open_fence_ignored() {
        assert_eq!(
            repair_markdown("```js\nconst s = `a"),
            "```js\nconst s = `a\n```"
        );
    }

    #[test]
    fn test_closers_in_fixed_order() {
        assert_eq!(repair_markdown("**a *b `c"), "**a *b `c***`");
        assert_eq!(
            repair_markdown("**note** ```py\nx = *y"),
            "**note** ```py\nx = *y*\n```"
        );
    }

    #[test]
    fn test_idempotent_on_paired_input() {
        let inputs = [
            "plain",
            "**bold** and *italic* and `code`",
            "```sql\nSELECT 1;\n```\n\nDone.",
            "**a** *b* `c` ```\nd\n```",
        ];
        for input in inputs {
            let once = repair_markdown(input);
            assert_eq!(once, input);
            assert_eq!(repair_markdown(&once), once);
        }
    }

    #[test]
    fn test_handles_multibyte_text() {
        assert_eq!(repair_markdown("**héllo 🌍"), "**héllo 🌍**");
        assert_eq!(repair_markdown("`ü"), "`ü`");
    }
}
