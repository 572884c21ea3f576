use serde::Deserialize;
use tokio::sync::mpsc;

use crate::models::{ProgressEvent, UpdateAsset};

/// Payload of the backend's fatal `error` event. The type tag is opaque to
/// this layer and passed through to the UI unchanged.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackendErrorPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub technical: String,
}

/// Receiving halves of the four inbound backend streams. Each stream owns a
/// disjoint slice of session state; they are demultiplexed exactly once when
/// the orchestrator spawns.
pub struct EventStreams {
    pub game_progress: mpsc::Receiver<ProgressEvent>,
    pub update_available: mpsc::Receiver<UpdateAsset>,
    pub update_progress: mpsc::Receiver<ProgressEvent>,
    pub errors: mpsc::Receiver<BackendErrorPayload>,
}

/// Sending halves handed to the backend binding layer.
#[derive(Clone)]
pub struct EventPublisher {
    pub game_progress: mpsc::Sender<ProgressEvent>,
    pub update_available: mpsc::Sender<UpdateAsset>,
    pub update_progress: mpsc::Sender<ProgressEvent>,
    pub errors: mpsc::Sender<BackendErrorPayload>,
}

const STREAM_DEPTH: usize = 64;

/// Builds the four event channels connecting a backend to one orchestrator.
pub fn event_channels() -> (EventPublisher, EventStreams) {
    let (game_tx, game_rx) = mpsc::channel(STREAM_DEPTH);
    let (avail_tx, avail_rx) = mpsc::channel(STREAM_DEPTH);
    let (update_tx, update_rx) = mpsc::channel(STREAM_DEPTH);
    let (error_tx, error_rx) = mpsc::channel(STREAM_DEPTH);
    (
        EventPublisher {
            game_progress: game_tx,
            update_available: avail_tx,
            update_progress: update_tx,
            errors: error_tx,
        },
        EventStreams {
            game_progress: game_rx,
            update_available: avail_rx,
            update_progress: update_rx,
            errors: error_rx,
        },
    )
}
