//! Sidecar runtime for phi-core device adapters.
//!
//! An adapter sidecar is a local helper process that phi-core connects to
//! over a Unix domain socket. This crate provides the three layers between
//! the socket and adapter code:
//!
//! - [`UdsServer`] / [`SidecarRuntime`]: single-client framed transport
//!   with non-blocking I/O, driven by `poll_once(timeout)` from the owning
//!   program's loop (no background threads),
//! - [`SidecarDispatcher`]: decodes request envelopes into typed requests,
//!   routes them through a [`SidecarHandlers`] callback set (synthesizing
//!   `NotImplemented` replies for absent handlers), and exposes the typed
//!   outbound event publishers,
//! - [`SidecarAdapter`] / [`SidecarHost`]: trait-based convenience layer
//!   that forwards requests to overridable adapter methods and answers the
//!   bootstrap with the adapter's descriptor.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use phi_adapter_sidecar::{ShutdownFlag, SidecarDispatcher, SidecarHandlers};
//! use phi_adapter_protocol::{CmdResponse, ScalarValue};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut dispatcher = SidecarDispatcher::new("/tmp/phi-adapter-example.sock");
//!     dispatcher.set_handlers(SidecarHandlers {
//!         on_channel_invoke: Some(Box::new(|invoke| {
//!             CmdResponse::success(invoke.value.clone().unwrap_or(ScalarValue::Null))
//!         })),
//!         ..Default::default()
//!     });
//!     dispatcher.start()?;
//!
//!     let shutdown = ShutdownFlag::new();
//!     shutdown.install()?;
//!     while !shutdown.is_set() {
//!         dispatcher.poll_once(Duration::from_millis(250))?;
//!     }
//!     dispatcher.stop();
//!     Ok(())
//! }
//! ```

mod adapter;
mod config;
mod dispatcher;
mod error;
mod request;
mod runtime;
mod signals;
mod socket;

pub use adapter::{AdapterFactory, AdapterRegistry, SidecarAdapter, SidecarHost};
pub use config::{SOCKET_PATH_ENV, default_socket_path, resolve_socket_path};
pub use dispatcher::{SidecarDispatcher, SidecarHandlers};
pub use error::{TransportError, TransportResult};
pub use request::{
    AdapterActionInvokeRequest, AdapterDescriptor, BootstrapRequest, ChannelInvokeRequest,
    DeviceEffectInvokeRequest, DeviceNameUpdateRequest, SceneInvokeRequest, SidecarRequest,
    UnknownRequest, methods,
};
pub use runtime::SidecarRuntime;
pub use signals::ShutdownFlag;
pub use socket::{TransportEvent, UdsServer};
