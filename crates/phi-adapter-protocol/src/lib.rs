//! Wire contract for phi-core adapter sidecars.
//!
//! This crate defines everything that crosses the sidecar socket:
//!
//! - the binary frame header ([`FrameHeader`], [`MessageType`]) that wraps
//!   every message,
//! - the hand-written JSON micro-codec ([`json`]) used on the hot path;
//!   the protocol emits a small fixed set of shapes, so a general parser is
//!   deliberately not pulled in,
//! - the scalar value model ([`ScalarValue`]) for channel values and error
//!   parameters,
//! - command/action reply types ([`CmdResponse`], [`ActionResponse`]),
//! - the domain value catalog ([`catalog`]): devices, channels, rooms,
//!   groups, scenes, adapter descriptors, and their enums and flag sets.
//!
//! # Wire format
//!
//! Each frame is a fixed little-endian header followed by a UTF-8 JSON
//! payload. Request payloads are JSON envelopes with `method`, optional
//! `cmdId`, and optional `payload`; replies start with
//! `"kind":"cmdResult"` or `"kind":"actionResult"`, events with
//! `"kind":"<eventName>"`.

pub mod catalog;
pub mod color;
mod error;
mod frame;
pub mod json;
mod types;
mod value;

pub use error::{JsonError, JsonResult};
pub use frame::{
    FRAME_HEADER_LEN, FRAME_MAGIC, FrameHeader, MessageType, PROTOCOL_LABEL, PROTOCOL_VERSION,
};
pub use types::{
    ActionResponse, ActionResultType, CmdId, CmdResponse, CmdStatus, CorrelationId, ExternalId,
    JsonText,
};
pub use value::{ScalarList, ScalarValue, append_scalar_list, decode_scalar, decode_scalar_list};
