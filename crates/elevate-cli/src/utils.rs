//! Shared helpers for the terminal client

use std::path::Path;

use anyhow::{Context, bail};
use elevate_ai::{Attachment, mime_for_path};

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Read a file from disk as an attachment
pub fn load_attachment(path: &Path) -> anyhow::Result<Attachment> {
    let Some(mime) = mime_for_path(path) else {
        bail!("unsupported file type: {}", path.display());
    };
    let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let attachment = Attachment::new(name, mime, data);
    attachment.validate()?;
    Ok(attachment)
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()))
}

/// Turns successive snapshots into text that can be appended to a terminal.
///
/// Snapshots carry repair closers and get restructured by the formatter, so
/// only the prefix two consecutive snapshots agree on is printed. Once a
/// snapshot rewrites text that is already on screen, printing stops and the
/// final rendering is shown in full.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    previous: String,
    shown: String,
    diverged: bool,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to append for a new snapshot, if any
    pub fn update(&mut self, snapshot: &str) -> Option<String> {
        let stable = common_prefix_len(&self.previous, snapshot);
        self.previous = snapshot.to_string();

        if self.diverged {
            return None;
        }
        if !snapshot[..stable].starts_with(self.shown.as_str()) {
            self.diverged = true;
            return None;
        }

        let delta = &snapshot[self.shown.len()..stable];
        self.shown.push_str(delta);
        (!delta.is_empty()).then(|| delta.to_string())
    }

    /// Remaining text once the reply is complete
    pub fn finish(&mut self, rendered: &str) -> String {
        let out = match rendered.strip_prefix(self.shown.as_str()) {
            Some(rest) if !self.diverged => rest.to_string(),
            _ if self.shown.is_empty() => rendered.to_string(),
            _ => format!("\n\n{}", rendered),
        };
        self.previous = rendered.to_string();
        self.shown = rendered.to_string();
        out
    }
}
