//! Downloaded archive on disk and its member index

use super::{ArchiveRef, UNKNOWN};
use crate::error::{CollectError, CollectResult};
use once_cell::sync::OnceCell;
use serde::Serialize;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "tif", "tiff", "png"];

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One file inside an archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRef {
    /// Path inside the archive
    pub path: PathBuf,
    pub size: u64,
    /// Label of the archive the member came from
    pub label: String,
    /// Date of the archive the member came from
    pub date: String,
}

impl MemberRef {
    pub fn is_image(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
            .unwrap_or(false)
    }
}

/// Handle to a `.tar` file in the local cache
///
/// The member index is read on first request and kept for the lifetime of
/// the handle. Gzip-compressed archives are recognised by their magic bytes,
/// whatever the file is named.
#[derive(Debug)]
pub struct LocalArchive {
    path: PathBuf,
    label: String,
    date: String,
    members: OnceCell<Vec<MemberRef>>,
}

impl LocalArchive {
    /// Handle for an archive with no catalog metadata
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            label: UNKNOWN.to_string(),
            date: UNKNOWN.to_string(),
            members: OnceCell::new(),
        }
    }

    /// Handle carrying the label and date of the archive it was fetched from
    pub fn for_ref(path: impl Into<PathBuf>, archive: &ArchiveRef) -> Self {
        Self {
            label: archive.label.clone(),
            date: archive.date.clone(),
            ..Self::open(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Regular-file members, in archive order
    pub fn list_members(&self) -> CollectResult<&[MemberRef]> {
        self.members
            .get_or_try_init(|| self.read_members())
            .map(Vec::as_slice)
    }

    /// Image members only
    pub fn image_members(&self) -> CollectResult<Vec<&MemberRef>> {
        Ok(self.list_members()?.iter().filter(|m| m.is_image()).collect())
    }

    fn read_members(&self) -> CollectResult<Vec<MemberRef>> {
        let archive_error = |e: std::io::Error| {
            CollectError::Archive(format!("{}: {}", self.path.display(), e))
        };

        let mut archive = tar::Archive::new(open_archive(&self.path)?);

        let mut members = Vec::new();
        for entry in archive.entries().map_err(archive_error)? {
            let entry = entry.map_err(archive_error)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let path = entry.path().map_err(archive_error)?.into_owned();
            members.push(MemberRef {
                path,
                size: entry.size(),
                label: self.label.clone(),
                date: self.date.clone(),
            });
        }

        tracing::debug!(archive = %self.path.display(), count = members.len(), "Indexed archive members");
        Ok(members)
    }
}

/// Open a tar stream, decompressing on the fly if the file is gzipped
fn open_archive(path: &Path) -> io::Result<Box<dyn Read>> {
    let mut file = File::open(path)?;

    let mut magic = [0u8; 2];
    let is_gzip = match file.read_exact(&mut magic) {
        Ok(()) => magic == GZIP_MAGIC,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(e),
    };
    file.seek(SeekFrom::Start(0))?;

    if is_gzip {
        Ok(Box::new(GzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(file))
    }
}
