//! HTTP and WebSocket client for the radio automation backend.
//!
//! Provides the [`Transport`](transport::Transport) seam and its reqwest
//! implementation, typed REST wrappers with degraded-auth read handling,
//! the push-channel message parser, WebSocket connection setup, and
//! reconnect backoff.

pub mod api;
pub mod client;
pub mod folder_compat;
pub mod messages;
pub mod reconnect;
pub mod transport;

pub use api::{ApiError, RadioApi};
pub use client::{ClientError, LiveClient, LiveConnection};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport, TransportError};
