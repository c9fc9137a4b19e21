//! HTTP archive download with progress events

use super::{ArchiveFetcher, ArchiveRef, LocalArchive};
use crate::error::{CollectError, CollectResult};
use async_trait::async_trait;
use psi_common::config::CollectorConfig;
use psi_common::events::{EventBus, PsiEvent};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const USER_AGENT: &str = concat!("psi-collect/", env!("CARGO_PKG_VERSION"));

/// Streams archives into the local cache
pub struct HttpArchiveFetcher {
    http_client: reqwest::Client,
    events: EventBus,
}

impl HttpArchiveFetcher {
    pub fn new(config: &CollectorConfig, events: EventBus) -> CollectResult<Self> {
        // No overall timeout: archives run to several gigabytes
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CollectError::Network(e.to_string()))?;

        Ok(Self { http_client, events })
    }

    async fn download(&self, archive: &ArchiveRef, target: &Path) -> CollectResult<u64> {
        let file_name = archive.tar_name();
        let part_path = partial_path(target);

        let mut response = self
            .http_client
            .get(&archive.url)
            .send()
            .await
            .map_err(|e| CollectError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::HttpStatus {
                status: status.as_u16(),
                url: archive.url.clone(),
            });
        }

        let total_bytes = response.content_length();
        self.events.emit_lossy(PsiEvent::DownloadStarted {
            file_name: file_name.clone(),
            total_bytes,
            timestamp: psi_common::time::now(),
        });

        let mut file = tokio::fs::File::create(&part_path).await?;
        let mut bytes_received: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            bytes_received += chunk.len() as u64;
            self.events.emit_lossy(PsiEvent::DownloadProgress {
                file_name: file_name.clone(),
                bytes_received,
                total_bytes,
            });
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&part_path, target).await?;
        Ok(bytes_received)
    }
}

#[async_trait]
impl ArchiveFetcher for HttpArchiveFetcher {
    async fn fetch(&self, archive: &ArchiveRef, dest_dir: &Path, overwrite: bool) -> CollectResult<LocalArchive> {
        tokio::fs::create_dir_all(dest_dir).await?;
        let target = dest_dir.join(archive.tar_name());

        if !overwrite && tokio::fs::try_exists(&target).await? {
            tracing::info!(path = %target.display(), "Archive already exists, skipping download");
            return Ok(LocalArchive::for_ref(target, archive));
        }

        tracing::info!(url = %archive.url, path = %target.display(), "Downloading archive");
        let bytes = self.download(archive, &target).await?;

        self.events.emit_lossy(PsiEvent::DownloadCompleted {
            file_name: archive.tar_name(),
            path: target.display().to_string(),
            bytes,
            timestamp: psi_common::time::now(),
        });
        tracing::info!(path = %target.display(), bytes, "Download complete");

        Ok(LocalArchive::for_ref(target, archive))
    }
}

/// `NAME.tar` → `NAME.tar.part`
fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
