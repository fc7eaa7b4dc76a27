//! Cheap size estimates for content blocks and messages.
//!
//! Nothing here runs a tokenizer. Text is measured in characters and
//! converted to tokens with a fixed ratio; media payloads get a fixed
//! large estimate because their real cost is unknowable without decoding;
//! structured data is serialized once and measured as text.

use crate::{ContentBlock, MediaKind, Message};

/// Characters per token used for every chars/tokens conversion.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimated character cost of an image payload.
pub const IMAGE_CHAR_ESTIMATE: usize = 8_000;
/// Estimated character cost of an audio payload.
pub const AUDIO_CHAR_ESTIMATE: usize = 4_000;
/// Estimated character cost of a video payload.
pub const VIDEO_CHAR_ESTIMATE: usize = 10_000;

/// Framing overhead per message (role marker, JSON wrapping).
const MESSAGE_OVERHEAD_CHARS: usize = 20;
/// Framing overhead per assistant tool call.
const TOOL_CALL_OVERHEAD_CHARS: usize = 50;

/// Unit an estimate is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Chars,
    Tokens,
}

/// Estimate a single block in characters.
pub fn estimate_block(block: &ContentBlock) -> usize {
    match block {
        ContentBlock::Text { text } => text.chars().count(),
        ContentBlock::Media { kind, .. } => media_char_estimate(*kind),
        ContentBlock::Structured { data } => serde_json::to_string(data)
            .map(|s| s.chars().count())
            .unwrap_or(0),
    }
}

/// Estimate a single block in the requested unit.
pub fn estimate_block_in(block: &ContentBlock, unit: SizeUnit) -> usize {
    let chars = estimate_block(block);
    match unit {
        SizeUnit::Chars => chars,
        SizeUnit::Tokens => chars_to_tokens(chars),
    }
}

/// Sum of [`estimate_block`] over a slice of blocks.
pub fn estimate_blocks(blocks: &[ContentBlock]) -> usize {
    blocks.iter().map(estimate_block).sum()
}

/// Fixed estimate for a media payload of the given kind.
pub fn media_char_estimate(kind: MediaKind) -> usize {
    match kind {
        MediaKind::Image => IMAGE_CHAR_ESTIMATE,
        MediaKind::Audio => AUDIO_CHAR_ESTIMATE,
        MediaKind::Video => VIDEO_CHAR_ESTIMATE,
    }
}

/// Estimate a whole message in characters, including framing overhead and
/// any assistant tool calls.
pub fn estimate_message(msg: &Message) -> usize {
    let mut total = msg.role.as_str().len() + MESSAGE_OVERHEAD_CHARS;
    total += estimate_blocks(&msg.content);

    if let Some(ref calls) = msg.tool_calls {
        for call in calls {
            total += call.name.chars().count()
                + call.arguments.chars().count()
                + TOOL_CALL_OVERHEAD_CHARS;
        }
    }

    total
}

/// Estimate a whole history in characters.
pub fn estimate_history(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message).sum()
}

/// Convert a character count to tokens, rounding up.
pub fn chars_to_tokens(chars: usize) -> usize {
    chars.div_ceil(CHARS_PER_TOKEN)
}

/// Convert a token-based context window to its character equivalent.
pub fn tokens_to_chars(tokens: usize) -> usize {
    tokens.saturating_mul(CHARS_PER_TOKEN)
}
