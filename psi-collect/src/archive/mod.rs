//! Archive references, downloads and member indexes

pub mod archive_ref;
pub mod fetcher;
pub mod local;

pub use archive_ref::ArchiveRef;
pub use fetcher::HttpArchiveFetcher;
pub use local::{LocalArchive, MemberRef};

use crate::error::CollectResult;
use crate::retry::retry_with_fixed_delay;
use async_trait::async_trait;
use psi_common::events::{EventBus, PsiEvent};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Placeholder for missing dates and labels
pub const UNKNOWN: &str = "Unknown";

/// Materializes remote archives in a local directory
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Download `archive` into `dest_dir`
    ///
    /// An existing file of the same name is kept unless `overwrite` is set.
    async fn fetch(&self, archive: &ArchiveRef, dest_dir: &Path, overwrite: bool) -> CollectResult<LocalArchive>;
}

/// Fetch with a fixed pause between failed attempts until success or cancel
pub async fn fetch_with_retry<F: ArchiveFetcher + ?Sized>(
    fetcher: &F,
    archive: &ArchiveRef,
    dest_dir: &Path,
    overwrite: bool,
    delay: Duration,
    cancel: &CancellationToken,
    events: &EventBus,
) -> CollectResult<LocalArchive> {
    let file_name = archive.tar_name();

    retry_with_fixed_delay(
        &file_name,
        delay,
        cancel,
        || fetcher.fetch(archive, dest_dir, overwrite),
        |attempt, err| {
            events.emit_lossy(PsiEvent::DownloadRetrying {
                file_name: file_name.clone(),
                attempt,
                error: err.to_string(),
                retry_in_secs: delay.as_secs(),
            });
        },
    )
    .await
}
