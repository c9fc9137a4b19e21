//! Progress lines rendered from download events

use psi_collect::progress::render_progress;
use psi_common::events::{EventBus, PsiEvent};

const FILE: &str = "20180915a_RGB.tar";

fn progress(bytes_received: u64, total_bytes: Option<u64>) -> PsiEvent {
    PsiEvent::DownloadProgress {
        file_name: FILE.to_string(),
        bytes_received,
        total_bytes,
    }
}

#[tokio::test]
async fn test_done_line_written_before_renderer_returns() {
    let bus = EventBus::new(16);
    let renderer = tokio::spawn(render_progress(bus.subscribe(), Vec::new()));

    bus.emit_lossy(progress(1024, Some(4096)));
    bus.emit_lossy(progress(4096, Some(4096)));
    bus.emit_lossy(PsiEvent::DownloadCompleted {
        file_name: FILE.to_string(),
        path: format!("/cache/Florence/{}", FILE),
        bytes: 4096,
        timestamp: psi_common::time::now(),
    });
    drop(bus);

    let out = String::from_utf8(renderer.await.unwrap().unwrap()).unwrap();
    assert!(out.starts_with("\r20180915a_RGB.tar:  25% (1024/4096 bytes)"));
    assert!(out.ends_with("\r20180915a_RGB.tar: done (4096 bytes)\n"));
}

#[tokio::test]
async fn test_unknown_length_and_retry_lines() {
    let bus = EventBus::new(16);
    let renderer = tokio::spawn(render_progress(bus.subscribe(), Vec::new()));

    bus.emit_lossy(progress(512, None));
    bus.emit_lossy(PsiEvent::DownloadRetrying {
        file_name: FILE.to_string(),
        attempt: 1,
        error: "connection reset".to_string(),
        retry_in_secs: 10,
    });
    bus.emit_lossy(PsiEvent::ConsensusEvaluated {
        image: "full/a.jpg".to_string(),
        state: "agreement".to_string(),
        timestamp: psi_common::time::now(),
    });
    drop(bus);

    let out = String::from_utf8(renderer.await.unwrap().unwrap()).unwrap();
    assert_eq!(
        out,
        "\r20180915a_RGB.tar: 512 bytes\n20180915a_RGB.tar: connection reset; will retry download in 10 seconds...\n"
    );
}
