//! Fence bare code that the model emitted as plain lines

use super::FENCE;
use regex::Regex;
use std::sync::LazyLock;

/// Minimum number of code-like lines before a run is fenced
const MIN_CODE_RUN: usize = 3;

/// How far past a non-code line to look for an indented continuation
const CONTINUATION_LOOKAHEAD: usize = 2;

/// Patterns matched against a trimmed line
static CODE_LINE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // JavaScript / TypeScript
        r"^(const|let|var|function|class|import|export|return|if|for|while|async|await)\s",
        // Python
        r"^(def|class|import|from|return|if|for|while|async|await)\s",
        // Java / C#
        r"^(public|private|protected|static|void|int|String)\s",
        // Go / Swift
        r"^(func|var|let|const|import|package|type|struct)\s",
        // SQL
        r"(?i)^(SELECT|INSERT|UPDATE|DELETE|CREATE|ALTER|DROP)\s",
        // Lone brackets
        r"^[{}\[\]()]$",
        // Statement terminators and block delimiters
        r"[{};]$",
        // Bare function call
        r"^\w+\(.*\)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+\s*=").unwrap());

static TAG_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^<\w+.*>").unwrap());
static TAG_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</\w+>$").unwrap());

/// Language tags keyed by the first line's leading keyword, first match wins
static LANGUAGE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (
            r"^((const|let|var|function|class|import|export|async|await)\b|=>)",
            "javascript",
        ),
        (r"^(def|class|import|from|print)\b|^if __name__", "python"),
        (r"^(public|private|protected|static|void|int|String|class)\b", "java"),
        (r"(?i)^(SELECT|INSERT|UPDATE|DELETE|CREATE|ALTER|DROP)\b", "sql"),
    ]
    .into_iter()
    .filter_map(|(p, lang)| Regex::new(p).ok().map(|re| (re, lang)))
    .collect()
});

fn is_indented(line: &str) -> bool {
    (line.starts_with("    ") || line.starts_with('\t')) && !line.trim().is_empty()
}

/// Check if a single line looks like source code
pub(crate) fn is_code_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    if is_indented(line) {
        return true;
    }
    if CODE_LINE_PATTERNS.iter().any(|re| re.is_match(trimmed)) {
        return true;
    }
    // Compact assignment such as `x=1`
    if !trimmed.contains(' ') && ASSIGNMENT.is_match(trimmed) {
        return true;
    }
    TAG_OPEN.is_match(trimmed) && TAG_CLOSE.is_match(trimmed)
}

/// Guess a fence language from the first line of a block
pub(crate) fn detect_language(line: &str) -> &'static str {
    let trimmed = line.trim();
    if let Some((_, lang)) = LANGUAGE_PATTERNS.iter().find(|(re, _)| re.is_match(trimmed)) {
        return lang;
    }
    if TAG_OPEN.is_match(trimmed) && TAG_CLOSE.is_match(trimmed) {
        return "jsx";
    }
    ""
}

/// A run of lines that may become a fenced block
#[derive(Default)]
struct CodeRun<'a> {
    lines: Vec<&'a str>,
    code_lines: usize,
}

impl<'a> CodeRun<'a> {
    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Emit the run, fenced if it is long enough
    fn flush_into(&mut self, out: &mut Vec<String>) {
        if self.lines.is_empty() {
            return;
        }
        if self.code_lines >= MIN_CODE_RUN {
            out.push(format!("{}{}", FENCE, detect_language(self.lines[0])));
            out.extend(self.lines.iter().map(|l| l.to_string()));
            out.push(FENCE.to_string());
        } else {
            out.extend(self.lines.iter().map(|l| l.to_string()));
        }
        self.lines.clear();
        self.code_lines = 0;
    }
}

/// Wrap runs of code-like lines in fenced blocks.
///
/// Does nothing when the text already contains a fence. Short runs are left
/// exactly as they were.
pub fn wrap_code_blocks(text: &str) -> String {
    if text.contains(FENCE) {
        return text.to_string();
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let mut out = Vec::with_capacity(lines.len());
    let mut run = CodeRun::default();

    for (i, line) in lines.iter().enumerate() {
        if is_code_line(line) {
            run.lines.push(line);
            run.code_lines += 1;
            continue;
        }

        if !run.is_empty() {
            let continues = lines
                .iter()
                .skip(i + 1)
                .take(CONTINUATION_LOOKAHEAD)
                .any(|next| is_indented(next));
            if continues {
                run.lines.push(line);
                continue;
            }
            run.flush_into(&mut out);
        }
        out.push(line.to_string());
    }
    run.flush_into(&mut out);

    out.join("\n")
}
