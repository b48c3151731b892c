//! Timeline Model Definitions
//!
//! Defines the read-only timeline snapshot consumed at export time:
//! tracks of media/audio/text/sticker elements with independent timing
//! and trims. The export pipeline never mutates these structures; the
//! editing session owns them.

mod models;

pub use models::*;
