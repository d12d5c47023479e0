use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use tileboard_core::TileId;
use tileboard_image::{sniff_data_uri, trim_to_budget, Budget};

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// What a finished background job should be applied to. The generation
/// must still match when the result arrives, otherwise it is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BackgroundTarget {
    Canvas { generation: u64 },
    Tile { id: TileId, generation: u64 },
}

/// Request sent from the UI thread to the I/O worker.
pub(crate) enum IoRequest {
    /// Read an image file and shrink it to `budget`.
    LoadImageFile {
        target: BackgroundTarget,
        path: PathBuf,
        budget: Budget,
    },
    /// Download an image and shrink it to `budget`.
    FetchImageUrl {
        target: BackgroundTarget,
        url: String,
        budget: Budget,
    },
    /// Write `content` (an export document) to `path`.
    WriteFile { path: PathBuf, content: String },
}

/// Response sent from the I/O worker back to the UI thread.
pub(crate) enum IoResponse {
    BackgroundReady {
        target: BackgroundTarget,
        result: Result<String, String>,
    },
    FileWritten {
        path: PathBuf,
        result: Result<(), String>,
    },
}

/// Spawn a dedicated I/O worker thread.
///
/// Returns the send-side for requests and the receive-side for responses.
/// The thread runs until the request sender is dropped. `on_response` is
/// called after each reply so the UI can wake up.
pub(crate) fn spawn_io_worker(
    on_response: impl Fn() + Send + 'static,
) -> (mpsc::Sender<IoRequest>, mpsc::Receiver<IoResponse>) {
    let (req_tx, req_rx) = mpsc::channel::<IoRequest>();
    let (resp_tx, resp_rx) = mpsc::channel::<IoResponse>();

    std::thread::Builder::new()
        .name("io-worker".into())
        .spawn(move || {
            debug!("IO worker thread started");
            let client = match reqwest::blocking::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
            {
                Ok(client) => Some(client),
                Err(e) => {
                    error!("IO worker: HTTP client unavailable: {e}");
                    None
                }
            };
            while let Ok(request) = req_rx.recv() {
                let response = match request {
                    IoRequest::LoadImageFile {
                        target,
                        path,
                        budget,
                    } => IoResponse::BackgroundReady {
                        target,
                        result: load_image_file(&path, &budget),
                    },
                    IoRequest::FetchImageUrl {
                        target,
                        url,
                        budget,
                    } => IoResponse::BackgroundReady {
                        target,
                        result: match client.as_ref() {
                            Some(client) => fetch_image(client, &url, &budget),
                            None => Err("no HTTP client".to_string()),
                        },
                    },
                    IoRequest::WriteFile { path, content } => {
                        let result = std::fs::write(&path, &content).map_err(|e| {
                            error!("IO worker: failed to write {}: {e}", path.display());
                            e.to_string()
                        });
                        IoResponse::FileWritten { path, result }
                    }
                };
                if resp_tx.send(response).is_err() {
                    break;
                }
                on_response();
            }
            debug!("IO worker thread exiting");
        })
        .expect("Failed to spawn IO worker thread");

    (req_tx, resp_rx)
}

fn load_image_file(path: &std::path::Path, budget: &Budget) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| {
        warn!("IO worker: failed to read {}: {e}", path.display());
        e.to_string()
    })?;
    encode_background(&bytes, budget)
}

fn fetch_image(
    client: &reqwest::blocking::Client,
    url: &str,
    budget: &Budget,
) -> Result<String, String> {
    let bytes = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.bytes())
        .map_err(|e| {
            warn!("IO worker: fetching {url} failed: {e}");
            e.to_string()
        })?;
    info!("IO worker: fetched {} bytes from {url}", bytes.len());
    encode_background(&bytes, budget)
}

fn encode_background(bytes: &[u8], budget: &Budget) -> Result<String, String> {
    let uri = sniff_data_uri(bytes).map_err(|e| e.to_string())?;
    trim_to_budget(&uri, budget).map_err(|e| {
        warn!("IO worker: re-encoding failed: {e}");
        e.to_string()
    })
}
