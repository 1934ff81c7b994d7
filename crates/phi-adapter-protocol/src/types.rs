//! Core identifiers and command/action response types.

use crate::value::{ScalarList, ScalarValue};

/// Command id assigned by phi-core; echoed back in replies.
pub type CmdId = u64;

/// Opaque frame-pairing tag carried in the header.
pub type CorrelationId = u64;

/// Adapter-scoped stable string identity for devices, channels, rooms,
/// groups, and scenes.
pub type ExternalId = String;

/// UTF-8 encoded JSON text for dynamic/extension fields where first-class
/// members are not practical.
pub type JsonText = String;

/// Command completion status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CmdStatus {
    #[default]
    Success = 0,
    Failure = 1,
    Timeout = 2,
    NotSupported = 3,
    InvalidArgument = 4,
    Busy = 5,
    TemporarilyOffline = 6,
    NotAuthorized = 7,
    NotImplemented = 8,
    InternalError = 255,
}

/// Result payload type of an adapter action reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActionResultType {
    #[default]
    None = 0,
    Boolean = 1,
    Integer = 2,
    Float = 3,
    String = 4,
    StringList = 5,
}

/// Reply to a command request (`kind=cmdResult` on the wire).
///
/// A zero `id` or `ts_ms` is filled in by the dispatcher: the id from the
/// inbound `cmdId`, the timestamp from the wall clock at send time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CmdResponse {
    pub id: CmdId,
    pub status: CmdStatus,
    pub error: String,
    pub error_params: ScalarList,
    pub error_context: String,
    pub final_value: ScalarValue,
    pub ts_ms: i64,
}

impl CmdResponse {
    /// Successful reply carrying the value the command settled on.
    pub fn success(final_value: ScalarValue) -> Self {
        Self {
            final_value,
            ..Self::default()
        }
    }

    /// Failed reply with a status and a diagnostic message.
    pub fn failure(status: CmdStatus, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            ..Self::default()
        }
    }
}

/// Reply to an adapter action request (`kind=actionResult` on the wire).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionResponse {
    pub id: CmdId,
    pub status: CmdStatus,
    pub error: String,
    pub error_params: ScalarList,
    pub error_context: String,
    pub result_type: ActionResultType,
    pub result_value: ScalarValue,
    pub ts_ms: i64,
}

impl ActionResponse {
    /// Successful reply carrying a typed result value.
    pub fn success(result_type: ActionResultType, result_value: ScalarValue) -> Self {
        Self {
            result_type,
            result_value,
            ..Self::default()
        }
    }

    /// Failed reply with a status and a diagnostic message.
    pub fn failure(status: CmdStatus, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmd_status_wire_values() {
        assert_eq!(CmdStatus::Success as u8, 0);
        assert_eq!(CmdStatus::NotImplemented as u8, 8);
        assert_eq!(CmdStatus::InternalError as u8, 255);
    }

    #[test]
    fn response_defaults() {
        let response = CmdResponse::default();
        assert_eq!(response.id, 0);
        assert_eq!(response.status, CmdStatus::Success);
        assert_eq!(response.final_value, ScalarValue::Null);
        assert_eq!(response.ts_ms, 0);

        let action = ActionResponse::default();
        assert_eq!(action.result_type, ActionResultType::None);
    }

    #[test]
    fn response_constructors() {
        let ok = CmdResponse::success(ScalarValue::Float(0.5));
        assert_eq!(ok.status, CmdStatus::Success);
        assert_eq!(ok.final_value, ScalarValue::Float(0.5));

        let err = CmdResponse::failure(CmdStatus::Busy, "device is busy");
        assert_eq!(err.status, CmdStatus::Busy);
        assert_eq!(err.error, "device is busy");

        let action = ActionResponse::success(ActionResultType::String, "done".into());
        assert_eq!(action.result_type, ActionResultType::String);
    }
}
