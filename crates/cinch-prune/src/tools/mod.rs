//! Tool-side helpers for producing results that are cheap to keep in
//! history.
//!
//! # Submodules
//!
//! - [`truncation`]: cut oversized tool output once, when it is produced,
//!   with a notice telling the model how much it is seeing.

pub mod truncation;

pub use truncation::{
    DEFAULT_TOOL_OUTPUT_MAX_CHARS, TOOL_ERROR_MAX_CHARS, Truncated, TruncationMode,
    add_truncation_notice, truncate_error_message, truncate_tool_output,
};
