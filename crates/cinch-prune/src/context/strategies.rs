//! Block-level pruning strategies: soft-trim and hard-clear.
//!
//! Tool results are the single largest context consumer in any agent loop.
//! A `read_file` can inject 30KB; a `grep` can return hundreds of lines.
//! Once the model has processed them, most of that content is dead weight.
//!
//! - **Soft-trim** keeps the head and tail of a large text block and
//!   appends a notice with the exact character counts kept.
//! - **Hard-clear** replaces a block with a fixed placeholder.
//!
//! Both are pure and idempotent. Neither decides *when* it should run; that
//! is the [pruner](super::pruner)'s job.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ContentBlock;
use crate::context::estimator;

/// Separator placed between the kept head and tail.
pub const TRIM_SEPARATOR: &str = "\n...\n";

/// Prefix of the notice appended to soft-trimmed text.
///
/// Both the notice writer and the "already trimmed?" check reference this
/// constant so they can't drift out of sync.
pub const TRIM_NOTICE_PREFIX: &str = "\n\n[Tool result trimmed: kept ";

/// Default placeholder written by hard-clear.
pub const DEFAULT_PLACEHOLDER: &str = "[Old tool result content cleared]";

/// Per-block soft-trim shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SoftTrimConfig {
    /// Blocks longer than this many characters are trimmed.
    pub max_chars: usize,
    /// Characters kept from the start.
    pub head_chars: usize,
    /// Characters kept from the end.
    pub tail_chars: usize,
}

impl Default for SoftTrimConfig {
    fn default() -> Self {
        Self {
            max_chars: 4_000,
            head_chars: 1_500,
            tail_chars: 1_500,
        }
    }
}

/// Hard-clear behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct HardClearConfig {
    /// Whether hard-clearing is enabled.
    pub enabled: bool,
    /// Text that replaces a cleared block.
    pub placeholder: String,
}

impl Default for HardClearConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

impl HardClearConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Soft-trim `text` to its head and tail.
///
/// Returns `None` when the text is within `max_chars`, already carries a
/// trim notice, or would not get shorter.
pub fn soft_trim(text: &str, config: &SoftTrimConfig) -> Option<String> {
    let total = text.chars().count();
    if total <= config.max_chars || is_soft_trimmed(text) {
        return None;
    }

    let head_chars = config.head_chars.min(total);
    let tail_chars = config.tail_chars.min(total - head_chars);
    let kept = head_chars + tail_chars;

    let head_end = byte_offset(text, head_chars);
    let tail_start = byte_offset(text, total - tail_chars);
    let head = text.get(..head_end).unwrap_or_default();
    let tail = text.get(tail_start..).unwrap_or_default();

    let trimmed = format!(
        "{head}{TRIM_SEPARATOR}{tail}{TRIM_NOTICE_PREFIX}{kept} of {total} chars \
         (first {head_chars}, last {tail_chars}).]"
    );

    if trimmed.chars().count() >= total {
        return None;
    }
    Some(trimmed)
}

/// Soft-trim a block. Only text blocks are trimmed; media and structured
/// blocks are left for hard-clear.
pub fn soft_trim_block(block: &ContentBlock, config: &SoftTrimConfig) -> Option<ContentBlock> {
    block
        .as_text()
        .and_then(|text| soft_trim(text, config))
        .map(ContentBlock::text)
}

/// Whether `text` is the output of [`soft_trim`].
///
/// A trailing notice alone is not enough: tool output can end with
/// notice-shaped text. The notice's `kept K` count must also account for
/// exactly the characters in front of it.
pub fn is_soft_trimmed(text: &str) -> bool {
    let Some(idx) = text.rfind(TRIM_NOTICE_PREFIX) else {
        return false;
    };
    let Some(notice) = text.get(idx + TRIM_NOTICE_PREFIX.len()..) else {
        return false;
    };
    if !notice.ends_with(".]") || notice.contains('\n') {
        return false;
    }
    let Some(kept) = notice
        .split_once(" of ")
        .and_then(|(kept, _)| kept.parse::<usize>().ok())
    else {
        return false;
    };
    let body = text.get(..idx).unwrap_or_default();
    body.chars().count() == kept + TRIM_SEPARATOR.chars().count()
}

/// Replace `block` with `placeholder`.
///
/// Returns `None` when the block already is the placeholder or is not
/// larger than it, so clearing never grows content.
pub fn hard_clear(block: &ContentBlock, placeholder: &str) -> Option<ContentBlock> {
    if block.as_text() == Some(placeholder) {
        return None;
    }
    if estimator::estimate_block(block) <= placeholder.chars().count() {
        return None;
    }
    Some(ContentBlock::text(placeholder))
}

/// Byte offset of the `n`-th character of `text` (or its length).
fn byte_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MediaKind;

    fn config() -> SoftTrimConfig {
        SoftTrimConfig {
            max_chars: 4_000,
            head_chars: 1_500,
            tail_chars: 1_500,
        }
    }

    #[test]
    fn soft_trim_keeps_head_and_tail() {
        let text = format!("{}{}{}", "h".repeat(1_500), "m".repeat(7_000), "t".repeat(1_500));
        let trimmed = soft_trim(&text, &config()).unwrap();

        assert!(trimmed.starts_with(&format!("{}{TRIM_SEPARATOR}t", "h".repeat(1_500))));
        assert!(!trimmed.contains("mmm"));
        assert!(trimmed.contains("kept 3000 of 10000 chars"));
        assert!(trimmed.ends_with("(first 1500, last 1500).]"));
    }

    #[test]
    fn small_text_not_trimmed() {
        assert!(soft_trim(&"x".repeat(100), &config()).is_none());
        assert!(soft_trim(&"x".repeat(4_000), &config()).is_none());
    }

    #[test]
    fn soft_trim_is_idempotent() {
        let once = soft_trim(&"x".repeat(10_000), &config()).unwrap();
        assert!(soft_trim(&once, &config()).is_none());
    }

    #[test]
    fn already_trimmed_text_is_skipped_even_if_long() {
        let tight = SoftTrimConfig {
            max_chars: 100,
            head_chars: 60,
            tail_chars: 39,
        };
        let once = soft_trim(&"y".repeat(1_000), &tight).unwrap();
        assert!(once.chars().count() > tight.max_chars);
        assert!(is_soft_trimmed(&once));
        assert!(soft_trim(&once, &tight).is_none());
    }

    #[test]
    fn notice_shaped_suffix_does_not_block_trimming() {
        let text = format!(
            "{}{TRIM_NOTICE_PREFIX}3000 of 10000 chars (first 1500, last 1500).]",
            "w".repeat(100_000)
        );
        assert!(!is_soft_trimmed(&text));

        let trimmed = soft_trim(&text, &config()).unwrap();
        assert!(trimmed.chars().count() < 4_000);
        assert!(trimmed.contains(&format!("of {} chars", text.chars().count())));
        assert!(is_soft_trimmed(&trimmed));
        assert!(soft_trim(&trimmed, &config()).is_none());
    }

    #[test]
    fn malformed_notice_is_not_trimmed_marker() {
        assert!(!is_soft_trimmed(&format!("abc{TRIM_NOTICE_PREFIX}lots of chars.]")));
        assert!(!is_soft_trimmed(&format!("abc{TRIM_NOTICE_PREFIX}3 of 9 chars")));
    }

    #[test]
    fn trim_that_would_grow_is_refused() {
        let tight = SoftTrimConfig {
            max_chars: 100,
            head_chars: 60,
            tail_chars: 39,
        };
        assert!(soft_trim(&"z".repeat(101), &tight).is_none());
    }

    #[test]
    fn soft_trim_respects_char_boundaries() {
        let cfg = SoftTrimConfig {
            max_chars: 10,
            head_chars: 2,
            tail_chars: 2,
        };
        let text = "αβγδεζηθικλμνξοπρστυφχψω".repeat(10);
        let trimmed = soft_trim(&text, &cfg).unwrap();
        assert!(trimmed.starts_with("αβ\n...\nψω"));
        assert!(trimmed.contains("kept 4 of 240 chars"));
    }

    #[test]
    fn soft_trim_block_ignores_media() {
        let media = ContentBlock::media(MediaKind::Image, "img");
        assert!(soft_trim_block(&media, &config()).is_none());
        let text = ContentBlock::text("q".repeat(5_000));
        assert!(soft_trim_block(&text, &config()).is_some());
    }

    #[test]
    fn hard_clear_replaces_content() {
        let block = ContentBlock::text("x".repeat(100_000));
        let cleared = hard_clear(&block, "[Cleared]").unwrap();
        assert_eq!(cleared, ContentBlock::text("[Cleared]"));
    }

    #[test]
    fn hard_clear_is_idempotent() {
        let cleared = ContentBlock::text("[Cleared]");
        assert!(hard_clear(&cleared, "[Cleared]").is_none());
    }

    #[test]
    fn hard_clear_never_grows_content() {
        assert!(hard_clear(&ContentBlock::text("ok"), "[Cleared]").is_none());
    }

    #[test]
    fn hard_clear_handles_media_and_structured() {
        let media = ContentBlock::media(MediaKind::Video, "clip");
        assert_eq!(
            hard_clear(&media, "[gone]"),
            Some(ContentBlock::text("[gone]"))
        );
        let data = ContentBlock::structured(serde_json::json!({"rows": vec![1; 200]}));
        assert_eq!(hard_clear(&data, "[gone]"), Some(ContentBlock::text("[gone]")));
    }
}
