//! Session orchestration core for the HyPrism launcher.
//!
//! The crate sits between a UI shell and an installation/runtime backend.
//! It owns the session aggregate (identity, branch/version selection,
//! install facts, pipeline phase, progress, errors) and serializes every
//! change to it through a single task: user commands, backend events, poll
//! ticks and async completions all become [`services::session_state::Transition`]
//! values applied by one pure reducer. UI layers observe the result through
//! a watch channel and never mutate state directly.
//!
//! ```no_run
//! # fn demo(backend: hyprism_session::SharedBackend) {
//! use hyprism_session::{event_channels, Orchestrator};
//!
//! let (publisher, streams) = event_channels();
//! // `publisher` goes to the backend binding layer.
//! let session = Orchestrator::spawn(backend, streams);
//! session.play("Steve");
//! # let _ = publisher;
//! # }
//! ```

pub mod backend;
pub mod errors;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

pub use backend::{GameBackend, SharedBackend};
pub use errors::{ErrorKind, ErrorRecord, LauncherError, Result};
pub use events::{event_channels, BackendErrorPayload, EventPublisher, EventStreams};
pub use models::{
    Branch, DownloadProgress, InstalledVersion, NewsItem, PipelinePhase, ProgressEvent,
    UpdateAsset, VersionSelector,
};
pub use orchestrator::{Command, Orchestrator, SessionHandle};
pub use services::{NewsService, SessionState};
