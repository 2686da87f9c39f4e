//! Hearth - voice and proximity triggered conversational assistant
//!
//! This library provides the core functionality for the hearth daemon:
//! - Activation arbitration across concurrent trigger sources
//! - Streaming response pipeline with serialized speech output
//! - Voice capture, wake word gating, STT, TTS
//! - Proximity sensor polling over a serial link
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Trigger sources                      │
//! │   Voice listener │ Sensor poller │ POST /api/text   │
//! └────────────────────┬────────────────────────────────┘
//!                      │ TriggerEvent
//! ┌────────────────────▼────────────────────────────────┐
//! │            Arbiter (session state machine)          │
//! └────────────────────┬────────────────────────────────┘
//!                      │ accepted query
//! ┌────────────────────▼────────────────────────────────┐
//! │   Response pipeline                                  │
//! │   inference → history → {SSE stream, speech gate}   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod arbiter;
pub mod config;
pub mod daemon;
pub mod db;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod session;
pub mod speech;
pub mod triggers;

pub use arbiter::Arbiter;
pub use config::Config;
pub use daemon::Daemon;
pub use db::{DbConn, DbPool, Exchange, HistoryRepo, Settings, SettingsRepo};
pub use error::{Error, Result};
pub use inference::Inference;
pub use pipeline::{Pipeline, ReplyRx};
pub use session::{Session, SessionHandle, SessionState, TriggerEvent};
pub use speech::{SpeechDevice, SpeechGate, SpeechJob};
