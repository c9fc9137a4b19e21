//! psi-collect: storm imagery catalog reader and archive downloader
//!
//! Lists the storms published on the NOAA emergency-response imagery site,
//! filters storms and their `.tar` archives by pattern, and downloads the
//! selected archives into a local cache with a cancellable retry loop.

pub mod archive;
pub mod catalog;
pub mod error;
pub mod progress;
pub mod retry;

pub use archive::{fetch_with_retry, ArchiveFetcher, ArchiveRef, HttpArchiveFetcher, LocalArchive, MemberRef};
pub use catalog::{CatalogSource, HttpCatalogSource, Storm, StormCatalog};
pub use error::{CollectError, CollectResult};
