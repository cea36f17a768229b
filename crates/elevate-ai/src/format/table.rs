//! Turn pipe-delimited lines into markdown tables

use super::FenceTracker;

fn is_table_row(line: &str) -> bool {
    line.matches('|').count() >= 2
}

/// Check if a line is already a header separator such as `| --- | :-: |`
fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains('|')
        && trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
}

/// Number of cells in a row, ignoring outer pipes
fn cell_count(line: &str) -> usize {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').count()
}

fn separator_for(line: &str) -> String {
    format!("|{}", " --- |".repeat(cell_count(line)))
}

fn push_blank(out: &mut Vec<String>) {
    if out.last().is_some_and(|l| !l.trim().is_empty()) {
        out.push(String::new());
    }
}

/// Add separators and spacing to pipe tables outside fenced blocks.
///
/// The first row of a table is treated as its header. A table ends at the
/// first line without two pipes.
pub fn format_pipe_tables(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 4);
    let mut fences = FenceTracker::default();
    let mut in_table = false;

    for (i, line) in lines.iter().enumerate() {
        let fenced = fences.observe(line);
        let row = !fenced && is_table_row(line);

        match (row, in_table) {
            (true, false) => {
                in_table = true;
                push_blank(&mut out);
                out.push(line.to_string());
                let has_separator = lines.get(i + 1).is_some_and(|next| is_separator_row(next));
                if !has_separator {
                    out.push(separator_for(line));
                }
            }
            (true, true) => out.push(line.to_string()),
            (false, _) => {
                if in_table {
                    in_table = false;
                    if !line.trim().is_empty() {
                        out.push(String::new());
                    }
                }
                out.push(line.to_string());
            }
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_after_first_line() {
        let input = "| Name | Age |\n| Bob | 42 |\nafter";
        assert_eq!(
            format_pipe_tables(input),
            "| Name | Age |\n| --- | --- |\n| Bob | 42 |\n\nafter"
        );
    }

    #[test]
    fn test_table_ends_at_first_non_pipe_line() {
        let input = "intro\na | b | c\n1 | 2 | 3\nnot a row\n4 | 5 | 6";
        let out = format_pipe_tables(input);
        assert_eq!(
            out,
            "intro\n\na | b | c\n| --- | --- | --- |\n1 | 2 | 3\n\nnot a row\n\n4 | 5 | 6\n| --- | --- | --- |"
        );
    }

    #[test]
    fn test_existing_separator_not_duplicated() {
        let input = "| a | b |\n|---|:---:|\n| 1 | 2 |";
        assert_eq!(format_pipe_tables(input), input);
    }

    #[test]
    fn test_rows_inside_fence_ignored() {
        let input = "```\n| a | b |\n```";
        assert_eq!(format_pipe_tables(input), input);
    }

    #[test]
    fn test_single_pipe_is_not_a_table() {
        let input = "either this | or that";
        assert_eq!(format_pipe_tables(input), input);
    }

    #[test]
    fn test_cell_count_ignores_outer_pipes() {
        assert_eq!(cell_count("| a | b |"), 2);
        assert_eq!(cell_count("a | b | c"), 3);
        assert_eq!(cell_count("|a|b|c"), 3);
    }

    #[test]
    fn test_reformatting_is_stable() {
        let once = format_pipe_tables("text\n| x | y |\n| 1 | 2 |\nmore");
        assert_eq!(format_pipe_tables(&once), once);
    }
}
