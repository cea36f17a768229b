//! Blank-line normalization around headings and fenced blocks

use super::is_fence_line;

fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes)
        && line[hashes..]
            .chars()
            .next()
            .is_some_and(char::is_whitespace)
}

/// Put blank lines around headings and fences, collapse blank runs outside
/// fences, and trim the result. Fenced content is copied verbatim.
pub fn normalize_spacing(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_fence = false;
    // The next content line outside a fence needs a blank line before it
    let mut pending_blank = false;

    fn push_blank(out: &mut Vec<&str>) {
        if out.last().is_some_and(|l| !l.trim().is_empty()) {
            out.push("");
        }
    }

    for line in text.split('\n') {
        if is_fence_line(line) {
            if in_fence {
                out.push(line);
                pending_blank = true;
            } else {
                push_blank(&mut out);
                out.push(line);
                pending_blank = false;
            }
            in_fence = !in_fence;
            continue;
        }

        if in_fence {
            out.push(line);
            continue;
        }

        if line.trim().is_empty() {
            push_blank(&mut out);
            continue;
        }

        if pending_blank || is_heading(line) {
            push_blank(&mut out);
        }
        out.push(line);
        pending_blank = is_heading(line);
    }

    out.join("\n").trim().to_string()
}
