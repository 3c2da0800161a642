//! Session layer between `reolink-api` and CLI consumers.
//!
//! - **[`Client`]**: Facade owning one camera session.
//!   [`connect()`](Client::connect) opens the transport and logs in;
//!   [`Client::oneshot()`] wraps a single request cycle for CLI use.
//!
//! - **[`Session`]**: Authenticated executor. Logs in on demand and
//!   retries a batch once after re-login when the camera reports the
//!   token as expired.
//!
//! - **[`DerivedCache`]**: Session-scoped state (abilities, link info,
//!   ports, device time) shared by the [`System`] and [`Network`] facets.
//!   Wiped on disconnect; abilities are also dropped on logout.
//!
//! - **[`DeviceTimezone`]**: Fixed offset plus the camera's DST rule,
//!   used to turn the device wall clock into an absolute time.

pub mod cache;
pub mod client;
pub mod config;
mod devices;
pub mod error;
pub mod model;
pub mod network;
pub mod session;
pub mod system;
pub mod timezone;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{DerivedCache, DeviceTime};
pub use client::Client;
pub use config::{ClientConfig, Credentials, TlsVerification};
pub use error::CoreError;
pub use model::{IrState, PtzOp, StreamKind};
pub use network::{Network, synthesize_rtsp_url};
pub use session::Session;
pub use system::System;
pub use timezone::{DeviceTimezone, DstWindow};

// Protocol types callers see in return values.
pub use reolink_api::ConnectionState;
pub use reolink_api::models::{
    Abilities, AbilityValue, AiDetection, AiState, ChannelStatus, ChannelStatusList, DevInfo,
    IrLights, LocalLink, NetPort,
};
