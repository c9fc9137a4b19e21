//! Data models for psi-tagger

pub mod image;
pub mod tag_value;

pub use image::{Image, ImageRecord, TagMap};
pub use tag_value::{BooleanLiterals, TagValue, ABSENT_REPR};
