//! Download progress rendering
//!
//! Turns the collector's [`PsiEvent`]s into terminal lines: a carriage-return
//! updated percentage while bytes arrive, a final "done" line per archive and
//! a notice before each retry.

use std::io::{self, Write};

use psi_common::events::PsiEvent;
use tokio::sync::broadcast::{self, error::RecvError};

/// Write progress lines until every event sender is gone
///
/// Returns the writer so callers (and tests) can inspect what was written.
/// Lagged events are skipped; the next event redraws the line.
pub async fn render_progress<W: Write>(mut rx: broadcast::Receiver<PsiEvent>, mut out: W) -> io::Result<W> {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Progress renderer lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        tracing::trace!(event = event.event_type(), "Rendering event");
        write_event(&mut out, &event)?;
        out.flush()?;
    }

    Ok(out)
}

fn write_event<W: Write>(out: &mut W, event: &PsiEvent) -> io::Result<()> {
    match event {
        PsiEvent::DownloadProgress {
            file_name,
            bytes_received,
            total_bytes: Some(total),
        } if *total > 0 => write!(
            out,
            "\r{}: {:>3}% ({}/{} bytes)",
            file_name,
            bytes_received * 100 / total,
            bytes_received,
            total
        ),
        PsiEvent::DownloadProgress {
            file_name,
            bytes_received,
            ..
        } => write!(out, "\r{}: {} bytes", file_name, bytes_received),
        PsiEvent::DownloadCompleted { file_name, bytes, .. } => {
            writeln!(out, "\r{}: done ({} bytes)", file_name, bytes)
        }
        PsiEvent::DownloadRetrying {
            file_name,
            retry_in_secs,
            error,
            ..
        } => writeln!(
            out,
            "\n{}: {}; will retry download in {} seconds...",
            file_name, error, retry_in_secs
        ),
        _ => Ok(()),
    }
}
