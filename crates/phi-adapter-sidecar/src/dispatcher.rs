//! Request/response dispatcher.
//!
//! Routes inbound `Request` frames through the JSON codec onto typed
//! handlers and serializes replies and events back out. Handlers live in a
//! [`SidecarHandlers`] record; any slot may be left empty, in which case the
//! dispatcher synthesizes a `NotImplemented` reply for methods that carry a
//! command id.
//!
//! Replies are transmitted synchronously while the frame is being handled,
//! so a response can never reorder with respect to the request that produced
//! it. The reply frame carries the command id (not the inbound header
//! correlation id) as its correlation id, and `cmdId` is emitted as a JSON
//! string for wire compatibility with peers that cannot represent 64-bit
//! numbers.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use phi_adapter_protocol::catalog::{Channel, Device, Group, Room, Scene, append_channel_list};
use phi_adapter_protocol::{
    ActionResponse, CmdId, CmdResponse, CmdStatus, CorrelationId, FrameHeader, MessageType,
    ScalarValue, append_scalar_list, json,
};

use crate::error::TransportResult;
use crate::request::{
    AdapterActionInvokeRequest, AdapterDescriptor, BootstrapRequest, ChannelInvokeRequest,
    DeviceEffectInvokeRequest, DeviceNameUpdateRequest, SceneInvokeRequest, SidecarRequest,
    UnknownRequest,
};
use crate::runtime::SidecarRuntime;
use crate::socket::TransportEvent;

/// Callback set used by [`SidecarDispatcher`]. Every slot is optional;
/// request slots without a handler produce a default `NotImplemented`
/// reply.
#[derive(Default)]
pub struct SidecarHandlers {
    /// Called when phi-core connects to the sidecar socket.
    pub on_connected: Option<Box<dyn FnMut()>>,
    /// Called when phi-core disconnects.
    pub on_disconnected: Option<Box<dyn FnMut()>>,
    /// Called on malformed request payloads.
    pub on_protocol_error: Option<Box<dyn FnMut(&str)>>,
    /// Called on `sync.adapter.bootstrap`; fire-and-forget, no reply.
    pub on_bootstrap: Option<Box<dyn FnMut(&BootstrapRequest)>>,
    /// Called on `cmd.channel.invoke`.
    pub on_channel_invoke: Option<Box<dyn FnMut(&ChannelInvokeRequest) -> CmdResponse>>,
    /// Called on `cmd.adapter.action.invoke`.
    pub on_adapter_action_invoke:
        Option<Box<dyn FnMut(&AdapterActionInvokeRequest) -> ActionResponse>>,
    /// Called on `cmd.device.name.update`.
    pub on_device_name_update: Option<Box<dyn FnMut(&DeviceNameUpdateRequest) -> CmdResponse>>,
    /// Called on `cmd.device.effect.invoke`.
    pub on_device_effect_invoke: Option<Box<dyn FnMut(&DeviceEffectInvokeRequest) -> CmdResponse>>,
    /// Called on `cmd.scene.invoke`.
    pub on_scene_invoke: Option<Box<dyn FnMut(&SceneInvokeRequest) -> CmdResponse>>,
    /// Called for request methods without a typed builder.
    pub on_unknown_request: Option<Box<dyn FnMut(&UnknownRequest)>>,
}

/// Typed IPC dispatcher for adapter sidecars.
pub struct SidecarDispatcher {
    runtime: SidecarRuntime,
    handlers: SidecarHandlers,
}

impl SidecarDispatcher {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            runtime: SidecarRuntime::new(socket_path),
            handlers: SidecarHandlers::default(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        self.runtime.socket_path()
    }

    pub fn is_client_connected(&self) -> bool {
        self.runtime.is_client_connected()
    }

    /// Replaces the active callback set.
    pub fn set_handlers(&mut self, handlers: SidecarHandlers) {
        self.handlers = handlers;
    }

    pub fn handlers_mut(&mut self) -> &mut SidecarHandlers {
        &mut self.handlers
    }

    /// Starts the IPC listener.
    pub fn start(&mut self) -> TransportResult<()> {
        self.runtime.start()
    }

    /// Stops the IPC listener and closes the current connection.
    pub fn stop(&mut self) {
        self.runtime.stop();
    }

    /// Runs one event-loop step: polls the transport, then routes every
    /// event through the handler set. Request frames of any other message
    /// type are ignored.
    pub fn poll_once(&mut self, timeout: Duration) -> TransportResult<()> {
        let mut events = Vec::new();
        let poll_result = self.runtime.poll_once(timeout, &mut events);
        for event in events {
            match event {
                TransportEvent::Connected => {
                    if let Some(handler) = self.handlers.on_connected.as_mut() {
                        handler();
                    }
                }
                TransportEvent::Disconnected => {
                    if let Some(handler) = self.handlers.on_disconnected.as_mut() {
                        handler();
                    }
                }
                TransportEvent::Frame { header, payload } => {
                    if header.kind() == Some(MessageType::Request) {
                        self.handle_request_frame(&header, &payload);
                    }
                }
            }
        }
        poll_result
    }

    /// Raw transport poll for callers that route frames themselves.
    pub(crate) fn poll_events(
        &mut self,
        timeout: Duration,
        events: &mut Vec<TransportEvent>,
    ) -> TransportResult<()> {
        self.runtime.poll_once(timeout, events)
    }

    /// Decodes and dispatches one request frame. Returns false when the
    /// payload failed to decode or the reply failed to send; decode
    /// failures invoke the protocol-error handler and keep the connection.
    pub fn handle_request_frame(&mut self, header: &FrameHeader, payload: &[u8]) -> bool {
        let request = match SidecarRequest::decode(header, payload) {
            Ok(request) => request,
            Err(error) => {
                let message = format!("Invalid request JSON: {error}");
                warn!(detail = %message, "dropping undecodable request frame");
                if let Some(handler) = self.handlers.on_protocol_error.as_mut() {
                    handler(&message);
                }
                return false;
            }
        };
        self.dispatch_request(request)
    }

    fn dispatch_request(&mut self, request: SidecarRequest) -> bool {
        match request {
            SidecarRequest::Bootstrap(bootstrap) => {
                debug!(
                    adapter_id = bootstrap.adapter_id,
                    plugin_type = %bootstrap.adapter.plugin_type,
                    "bootstrap received"
                );
                if let Some(handler) = self.handlers.on_bootstrap.as_mut() {
                    handler(&bootstrap);
                }
                true
            }
            SidecarRequest::ChannelInvoke(invoke) => {
                let mut response = match self.handlers.on_channel_invoke.as_mut() {
                    Some(handler) => handler(&invoke),
                    None => default_cmd_response(
                        invoke.cmd_id,
                        "Channel invoke handler not registered",
                    ),
                };
                if response.id == 0 {
                    response.id = invoke.cmd_id;
                }
                self.send_cmd_reply(response)
            }
            SidecarRequest::AdapterActionInvoke(invoke) => {
                let mut response = match self.handlers.on_adapter_action_invoke.as_mut() {
                    Some(handler) => handler(&invoke),
                    None => default_action_response(
                        invoke.cmd_id,
                        "Adapter action handler not registered",
                    ),
                };
                if response.id == 0 {
                    response.id = invoke.cmd_id;
                }
                self.send_action_reply(response)
            }
            SidecarRequest::DeviceNameUpdate(update) => {
                let mut response = match self.handlers.on_device_name_update.as_mut() {
                    Some(handler) => handler(&update),
                    None => default_cmd_response(
                        update.cmd_id,
                        "Device name update handler not registered",
                    ),
                };
                if response.id == 0 {
                    response.id = update.cmd_id;
                }
                self.send_cmd_reply(response)
            }
            SidecarRequest::DeviceEffectInvoke(invoke) => {
                let mut response = match self.handlers.on_device_effect_invoke.as_mut() {
                    Some(handler) => handler(&invoke),
                    None => {
                        default_cmd_response(invoke.cmd_id, "Device effect handler not registered")
                    }
                };
                if response.id == 0 {
                    response.id = invoke.cmd_id;
                }
                self.send_cmd_reply(response)
            }
            SidecarRequest::SceneInvoke(invoke) => {
                let mut response = match self.handlers.on_scene_invoke.as_mut() {
                    Some(handler) => handler(&invoke),
                    None => {
                        default_cmd_response(invoke.cmd_id, "Scene invoke handler not registered")
                    }
                };
                if response.id == 0 {
                    response.id = invoke.cmd_id;
                }
                self.send_cmd_reply(response)
            }
            SidecarRequest::Unknown(unknown) => {
                debug!(method = %unknown.method, cmd_id = unknown.cmd_id, "unknown request method");
                if let Some(handler) = self.handlers.on_unknown_request.as_mut() {
                    handler(&unknown);
                }
                if unknown.cmd_id != 0 {
                    let response = default_cmd_response(
                        unknown.cmd_id,
                        &format!("Unhandled IPC method: {}", unknown.method),
                    );
                    self.send_cmd_reply(response)
                } else {
                    true
                }
            }
        }
    }

    fn send_cmd_reply(&mut self, response: CmdResponse) -> bool {
        match self.send_cmd_result(&response) {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, cmd_id = response.id, "failed to send command reply");
                false
            }
        }
    }

    fn send_action_reply(&mut self, response: ActionResponse) -> bool {
        match self.send_action_result(&response) {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, cmd_id = response.id, "failed to send action reply");
                false
            }
        }
    }

    /// Sends a command reply (`kind=cmdResult`). A zero `ts_ms` is stamped
    /// with the current wall clock.
    pub fn send_cmd_result(&mut self, response: &CmdResponse) -> TransportResult<()> {
        let ts_ms = if response.ts_ms > 0 {
            response.ts_ms
        } else {
            now_ms()
        };
        let mut body = String::from("{");
        let mut first = true;
        json::append_field(&mut body, &mut first, "kind");
        body.push_str("\"cmdResult\"");
        json::append_field(&mut body, &mut first, "cmdId");
        json::append_quoted(&mut body, &response.id.to_string());
        json::append_field(&mut body, &mut first, "status");
        let _ = write!(body, "{}", response.status as u8);
        json::append_field(&mut body, &mut first, "error");
        json::append_quoted(&mut body, &response.error);
        json::append_field(&mut body, &mut first, "errorCtx");
        json::append_quoted(&mut body, &response.error_context);
        json::append_field(&mut body, &mut first, "errorParams");
        append_scalar_list(&mut body, &response.error_params);
        json::append_field(&mut body, &mut first, "finalValue");
        response.final_value.append_json(&mut body);
        json::append_field(&mut body, &mut first, "tsMs");
        let _ = write!(body, "{ts_ms}");
        body.push('}');
        self.send_json(MessageType::Response, response.id, &body)
    }

    /// Sends an action reply (`kind=actionResult`). A zero `ts_ms` is
    /// stamped with the current wall clock.
    pub fn send_action_result(&mut self, response: &ActionResponse) -> TransportResult<()> {
        let ts_ms = if response.ts_ms > 0 {
            response.ts_ms
        } else {
            now_ms()
        };
        let mut body = String::from("{");
        let mut first = true;
        json::append_field(&mut body, &mut first, "kind");
        body.push_str("\"actionResult\"");
        json::append_field(&mut body, &mut first, "cmdId");
        json::append_quoted(&mut body, &response.id.to_string());
        json::append_field(&mut body, &mut first, "status");
        let _ = write!(body, "{}", response.status as u8);
        json::append_field(&mut body, &mut first, "error");
        json::append_quoted(&mut body, &response.error);
        json::append_field(&mut body, &mut first, "errorCtx");
        json::append_quoted(&mut body, &response.error_context);
        json::append_field(&mut body, &mut first, "errorParams");
        append_scalar_list(&mut body, &response.error_params);
        json::append_field(&mut body, &mut first, "resultType");
        let _ = write!(body, "{}", response.result_type as u8);
        json::append_field(&mut body, &mut first, "resultValue");
        response.result_value.append_json(&mut body);
        json::append_field(&mut body, &mut first, "tsMs");
        let _ = write!(body, "{ts_ms}");
        body.push('}');
        self.send_json(MessageType::Response, response.id, &body)
    }

    /// Publishes adapter connectivity state (`kind=connectionStateChanged`).
    pub fn send_connection_state_changed(&mut self, connected: bool) -> TransportResult<()> {
        let body = format!("{{\"kind\":\"connectionStateChanged\",\"connected\":{connected}}}");
        self.send_event(&body)
    }

    /// Publishes an adapter error event (`kind=error`).
    pub fn send_error(
        &mut self,
        message: &str,
        params: &[ScalarValue],
        ctx: &str,
    ) -> TransportResult<()> {
        let mut body = String::from("{");
        let mut first = true;
        json::append_field(&mut body, &mut first, "kind");
        body.push_str("\"error\"");
        json::append_field(&mut body, &mut first, "message");
        json::append_quoted(&mut body, message);
        json::append_field(&mut body, &mut first, "ctx");
        json::append_quoted(&mut body, ctx);
        json::append_field(&mut body, &mut first, "params");
        append_scalar_list(&mut body, params);
        body.push('}');
        self.send_event(&body)
    }

    /// Publishes a dynamic adapter meta patch (`kind=adapterMetaUpdated`).
    /// Static identity, capabilities, and schema travel via descriptor
    /// transport instead.
    pub fn send_adapter_meta_updated(&mut self, meta_patch_json: &str) -> TransportResult<()> {
        let mut body = String::from("{\"kind\":\"adapterMetaUpdated\",\"metaPatch\":");
        json::append_raw_object(&mut body, meta_patch_json);
        body.push('}');
        self.send_event(&body)
    }

    /// Publishes a runtime descriptor update (`kind=adapterDescriptorUpdated`).
    pub fn send_adapter_descriptor_updated(
        &mut self,
        descriptor: &AdapterDescriptor,
    ) -> TransportResult<()> {
        let mut body = String::from("{\"kind\":\"adapterDescriptorUpdated\",\"descriptor\":");
        body.push_str(&descriptor.to_wire_json());
        body.push('}');
        self.send_event(&body)
    }

    /// Sends the bootstrap descriptor reply (`kind=adapterDescriptor`),
    /// correlated to the bootstrap request frame.
    pub(crate) fn send_adapter_descriptor(
        &mut self,
        descriptor: &AdapterDescriptor,
        correlation_id: CorrelationId,
    ) -> TransportResult<()> {
        let mut body = String::from("{\"kind\":\"adapterDescriptor\",\"descriptor\":");
        body.push_str(&descriptor.to_wire_json());
        body.push('}');
        self.send_json(MessageType::Response, correlation_id, &body)
    }

    /// Publishes a channel state update (`kind=channelStateUpdated`). A zero
    /// `ts_ms` is stamped with the current wall clock.
    pub fn send_channel_state_updated(
        &mut self,
        device_external_id: &str,
        channel_external_id: &str,
        value: &ScalarValue,
        ts_ms: i64,
    ) -> TransportResult<()> {
        let timestamp = if ts_ms > 0 { ts_ms } else { now_ms() };
        let mut body = String::from("{");
        let mut first = true;
        json::append_field(&mut body, &mut first, "kind");
        body.push_str("\"channelStateUpdated\"");
        json::append_field(&mut body, &mut first, "deviceExternalId");
        json::append_quoted(&mut body, device_external_id);
        json::append_field(&mut body, &mut first, "channelExternalId");
        json::append_quoted(&mut body, channel_external_id);
        json::append_field(&mut body, &mut first, "value");
        value.append_json(&mut body);
        json::append_field(&mut body, &mut first, "tsMs");
        let _ = write!(body, "{timestamp}");
        body.push('}');
        self.send_event(&body)
    }

    /// Publishes a full device snapshot (`kind=deviceUpdated`).
    pub fn send_device_updated(
        &mut self,
        device: &Device,
        channels: &[Channel],
    ) -> TransportResult<()> {
        let mut body = String::from("{\"kind\":\"deviceUpdated\",\"payload\":{\"device\":");
        body.push_str(&device.to_wire_json());
        body.push_str(",\"channels\":");
        append_channel_list(&mut body, channels);
        body.push_str("}}");
        self.send_event(&body)
    }

    /// Publishes a device removal (`kind=deviceRemoved`).
    pub fn send_device_removed(&mut self, device_external_id: &str) -> TransportResult<()> {
        let mut body = String::from("{\"kind\":\"deviceRemoved\",\"deviceExternalId\":");
        json::append_quoted(&mut body, device_external_id);
        body.push('}');
        self.send_event(&body)
    }

    /// Publishes a channel metadata update (`kind=channelUpdated`).
    pub fn send_channel_updated(
        &mut self,
        device_external_id: &str,
        channel: &Channel,
    ) -> TransportResult<()> {
        let mut body = String::from("{\"kind\":\"channelUpdated\",\"payload\":{\"deviceExternalId\":");
        json::append_quoted(&mut body, device_external_id);
        body.push_str(",\"channel\":");
        body.push_str(&channel.to_wire_json());
        body.push_str("}}");
        self.send_event(&body)
    }

    /// Publishes a room upsert (`kind=roomUpdated`).
    pub fn send_room_updated(&mut self, room: &Room) -> TransportResult<()> {
        let mut body = String::from("{\"kind\":\"roomUpdated\",\"room\":");
        body.push_str(&room.to_wire_json());
        body.push('}');
        self.send_event(&body)
    }

    /// Publishes a room removal (`kind=roomRemoved`).
    pub fn send_room_removed(&mut self, room_external_id: &str) -> TransportResult<()> {
        let mut body = String::from("{\"kind\":\"roomRemoved\",\"roomExternalId\":");
        json::append_quoted(&mut body, room_external_id);
        body.push('}');
        self.send_event(&body)
    }

    /// Publishes a group upsert (`kind=groupUpdated`).
    pub fn send_group_updated(&mut self, group: &Group) -> TransportResult<()> {
        let mut body = String::from("{\"kind\":\"groupUpdated\",\"group\":");
        body.push_str(&group.to_wire_json());
        body.push('}');
        self.send_event(&body)
    }

    /// Publishes a group removal (`kind=groupRemoved`).
    pub fn send_group_removed(&mut self, group_external_id: &str) -> TransportResult<()> {
        let mut body = String::from("{\"kind\":\"groupRemoved\",\"groupExternalId\":");
        json::append_quoted(&mut body, group_external_id);
        body.push('}');
        self.send_event(&body)
    }

    /// Publishes an adapter scene snapshot (`kind=scenesUpdated`).
    pub fn send_scenes_updated(&mut self, scenes: &[Scene]) -> TransportResult<()> {
        let mut body = String::from("{\"kind\":\"scenesUpdated\",\"scenes\":[");
        let mut first = true;
        for scene in scenes {
            if !first {
                body.push(',');
            }
            first = false;
            body.push_str(&scene.to_wire_json());
        }
        body.push_str("]}");
        self.send_event(&body)
    }

    /// Signals completion of a full sync cycle (`kind=fullSyncCompleted`).
    pub fn send_full_sync_completed(&mut self) -> TransportResult<()> {
        self.send_event("{\"kind\":\"fullSyncCompleted\"}")
    }

    fn send_event(&mut self, body: &str) -> TransportResult<()> {
        self.send_json(MessageType::Event, 0, body)
    }

    fn send_json(
        &mut self,
        kind: MessageType,
        correlation_id: CorrelationId,
        body: &str,
    ) -> TransportResult<()> {
        self.runtime.send(kind, correlation_id, body.as_bytes())
    }
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Default reply for a recognized command without a handler.
pub(crate) fn default_cmd_response(cmd_id: CmdId, message: &str) -> CmdResponse {
    CmdResponse {
        id: cmd_id,
        status: CmdStatus::NotImplemented,
        error: message.to_string(),
        ts_ms: now_ms(),
        ..Default::default()
    }
}

/// Default reply for an adapter action without a handler.
pub(crate) fn default_action_response(cmd_id: CmdId, message: &str) -> ActionResponse {
    ActionResponse {
        id: cmd_id,
        status: CmdStatus::NotImplemented,
        error: message.to_string(),
        ts_ms: now_ms(),
        ..Default::default()
    }
}
