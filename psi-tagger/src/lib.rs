//! psi-tagger: per-user image tags and tagger consensus
//!
//! Users attach tags to images extracted from post-storm aerial archives.
//! Raw tag text is normalized into booleans, integers or free text; the
//! consensus check reports whether all taggers agree on every non-text tag.

pub mod config;
pub mod consensus;
pub mod db;
pub mod error;
pub mod models;
pub mod store;

pub use consensus::{ConsensusState, DisagreementThreshold, TagRules, TagSummary};
pub use error::{TagError, TagResult};
pub use models::{BooleanLiterals, Image, ImageRecord, TagMap, TagValue};
pub use store::TagStore;
