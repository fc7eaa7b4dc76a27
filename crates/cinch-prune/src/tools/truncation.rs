//! Tool output truncation, applied when a result is produced.
//!
//! This is the first line of defense against oversized tool output: a
//! result is cut down once, before it ever enters history. Pruning later
//! works on whatever size the block has by then.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ContentBlock;
use crate::context::estimator;

/// Default cap on a single tool result, in characters.
pub const DEFAULT_TOOL_OUTPUT_MAX_CHARS: usize = 200_000;

/// Cap on a tool error message, in characters.
pub const TOOL_ERROR_MAX_CHARS: usize = 400;

const TAIL_MARKER: &str = "... (truncated) ";
const HEAD_MARKER: &str = "\n\n... (truncated)";
const HEAD_TAIL_SEPARATOR: &str = "\n...\n";

/// Which part of an oversized output survives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TruncationMode {
    /// Keep the end. Build and test logs put the interesting part last.
    #[default]
    Tail,
    /// Keep the start.
    Head,
    /// Keep half the budget from each end.
    HeadTail,
}

/// Result of [`truncate_tool_output`].
#[derive(Debug, Clone, PartialEq)]
pub struct Truncated {
    pub content: Vec<ContentBlock>,
    pub truncated: bool,
    /// Estimated size of the input, in characters.
    pub original_chars: usize,
}

/// Cut tool output down to roughly `max_chars` characters of text.
///
/// Text blocks are joined with newlines and cut according to `mode`; media
/// and structured blocks are kept unchanged after the text. Output with no
/// text blocks is returned as-is.
pub fn truncate_tool_output(
    content: &[ContentBlock],
    max_chars: usize,
    mode: TruncationMode,
) -> Truncated {
    let original_chars = estimator::estimate_blocks(content);
    let unchanged = || Truncated {
        content: content.to_vec(),
        truncated: false,
        original_chars,
    };

    if original_chars <= max_chars {
        return unchanged();
    }

    let (texts, others): (Vec<&ContentBlock>, Vec<&ContentBlock>) = content
        .iter()
        .partition(|b| matches!(b, ContentBlock::Text { .. }));
    if texts.is_empty() {
        return unchanged();
    }

    let full = texts
        .iter()
        .filter_map(|b| b.as_text())
        .collect::<Vec<_>>()
        .join("\n");

    let text = match mode {
        TruncationMode::Tail => format!("{TAIL_MARKER}{}", last_chars(&full, max_chars)),
        TruncationMode::Head => format!("{}{HEAD_MARKER}", first_chars(&full, max_chars)),
        TruncationMode::HeadTail => {
            let head = max_chars / 2;
            let tail = max_chars - head;
            format!(
                "{}{HEAD_TAIL_SEPARATOR}{}",
                first_chars(&full, head),
                last_chars(&full, tail)
            )
        }
    };

    let mut out = Vec::with_capacity(others.len() + 1);
    out.push(ContentBlock::text(text));
    out.extend(others.into_iter().cloned());

    Truncated {
        content: out,
        truncated: true,
        original_chars,
    }
}

/// Append a "showing N of M characters" notice to the last text block, or
/// add one if there is none.
pub fn add_truncation_notice(
    mut content: Vec<ContentBlock>,
    original_chars: usize,
    kept_chars: usize,
) -> Vec<ContentBlock> {
    let notice =
        format!("\n\n[Tool output truncated: showing {kept_chars} of {original_chars} characters]");

    let last_text = content
        .iter_mut()
        .rev()
        .find_map(|b| match b {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        });
    match last_text {
        Some(text) => text.push_str(&notice),
        None => content.push(ContentBlock::text(notice)),
    }
    content
}

/// Reduce an error to its first non-empty line, capped at
/// [`TOOL_ERROR_MAX_CHARS`] with an ellipsis.
pub fn truncate_error_message(error: &str) -> String {
    let Some(first) = error.trim().lines().next().map(str::trim) else {
        return String::new();
    };
    if first.chars().count() > TOOL_ERROR_MAX_CHARS {
        format!("{}…", first_chars(first, TOOL_ERROR_MAX_CHARS))
    } else {
        first.to_string()
    }
}

fn first_chars(text: &str, n: usize) -> &str {
    let end = text.char_indices().nth(n).map_or(text.len(), |(i, _)| i);
    text.get(..end).unwrap_or(text)
}

fn last_chars(text: &str, n: usize) -> &str {
    let total = text.chars().count();
    let skip = total.saturating_sub(n);
    let start = text.char_indices().nth(skip).map_or(text.len(), |(i, _)| i);
    text.get(start..).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MediaKind;

    fn numbered(n: usize) -> String {
        (0..n).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn short_output_untouched() {
        let content = vec![ContentBlock::text("ok")];
        let out = truncate_tool_output(&content, 100, TruncationMode::Tail);
        assert!(!out.truncated);
        assert_eq!(out.content, content);
        assert_eq!(out.original_chars, 2);
    }

    #[test]
    fn tail_keeps_the_end() {
        let text = numbered(1_000);
        let out =
            truncate_tool_output(&[ContentBlock::text(text.clone())], 50, TruncationMode::Tail);
        assert!(out.truncated);
        assert_eq!(out.original_chars, text.len());
        let kept = out.content[0].as_text().unwrap();
        assert!(kept.starts_with("... (truncated) "));
        assert!(kept.ends_with("line 999"));
        assert_eq!(kept.chars().count(), TAIL_MARKER.len() + 50);
    }

    #[test]
    fn head_keeps_the_start() {
        let input = [ContentBlock::text(numbered(1_000))];
        let out = truncate_tool_output(&input, 20, TruncationMode::Head);
        let kept = out.content[0].as_text().unwrap();
        assert!(kept.starts_with("line 0\nline 1"));
        assert!(kept.ends_with("\n\n... (truncated)"));
    }

    #[test]
    fn head_tail_splits_budget() {
        let text = format!("{}{}", "a".repeat(500), "b".repeat(500));
        let out = truncate_tool_output(&[ContentBlock::text(text)], 11, TruncationMode::HeadTail);
        assert_eq!(out.content[0].as_text(), Some("aaaaa\n...\nbbbbbb"));
    }

    #[test]
    fn text_blocks_joined_and_media_kept_after() {
        let content = vec![
            ContentBlock::media(MediaKind::Image, "shot.png"),
            ContentBlock::text("x".repeat(300)),
            ContentBlock::text("y".repeat(300)),
        ];
        let out = truncate_tool_output(&content, 1_000, TruncationMode::Tail);
        assert!(out.truncated);
        assert_eq!(out.original_chars, 8_600);
        assert_eq!(out.content.len(), 2);
        assert!(out.content[0].as_text().unwrap().contains("x\ny"));
        assert_eq!(out.content[1], ContentBlock::media(MediaKind::Image, "shot.png"));
    }

    #[test]
    fn media_only_output_is_returned_as_is() {
        let content = vec![ContentBlock::media(MediaKind::Video, "clip")];
        let out = truncate_tool_output(&content, 10, TruncationMode::Tail);
        assert!(!out.truncated);
        assert_eq!(out.content, content);
    }

    #[test]
    fn cuts_on_char_boundaries() {
        let text = "ü".repeat(100);
        let out = truncate_tool_output(&[ContentBlock::text(text)], 10, TruncationMode::Head);
        assert!(out.content[0].as_text().unwrap().starts_with(&"ü".repeat(10)));
    }

    #[test]
    fn notice_goes_on_last_text_block() {
        let content = vec![
            ContentBlock::text("first"),
            ContentBlock::text("second"),
            ContentBlock::media(MediaKind::Audio, ""),
        ];
        let out = add_truncation_notice(content, 900, 11);
        assert_eq!(
            out[1].as_text(),
            Some("second\n\n[Tool output truncated: showing 11 of 900 characters]")
        );
        assert_eq!(out[0].as_text(), Some("first"));
    }

    #[test]
    fn notice_added_when_no_text_block() {
        let out = add_truncation_notice(vec![ContentBlock::media(MediaKind::Image, "")], 9, 8);
        assert_eq!(out.len(), 2);
        assert!(out[1].as_text().unwrap().contains("showing 8 of 9"));
    }

    #[test]
    fn error_message_first_line_only() {
        assert_eq!(truncate_error_message("  boom\nstack\ntrace "), "boom");
        assert_eq!(truncate_error_message("   \n  "), "");
        assert_eq!(truncate_error_message(""), "");
    }

    #[test]
    fn long_error_message_gets_ellipsis() {
        let msg = truncate_error_message(&"e".repeat(1_000));
        assert_eq!(msg.chars().count(), TOOL_ERROR_MAX_CHARS + 1);
        assert!(msg.ends_with('…'));
    }

    #[test]
    fn mode_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(TruncationMode::HeadTail).unwrap(),
            "head-tail"
        );
        assert_eq!(TruncationMode::default(), TruncationMode::Tail);
    }
}
