//! Filter Fragment Builders
//!
//! Converts overlay elements (text, stickers) into FFmpeg filtergraph
//! fragments, with the escaping and font resolution that makes them safe
//! against user-provided content.

mod escape;
mod fonts;
mod sticker;
mod text;

pub use escape::{escape_drawtext_text, escape_filter_path, escape_filter_value};
pub use fonts::FontResolver;
pub use sticker::build_sticker_chain;
pub use text::build_drawtext_filter;
