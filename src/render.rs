//! Report rendering core: issues plus configuration in, markdown out.

pub mod comment;
pub mod context;
pub mod error;
pub mod glyph;
pub mod line;
pub mod template;
