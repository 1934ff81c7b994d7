//! Typed adapter base and host.
//!
//! [`SidecarAdapter`] is the overridable handler surface an adapter
//! implements; every method has a default, so a minimal adapter only
//! overrides what it supports. Request handlers receive the dispatcher so
//! they can publish events while handling. [`SidecarHost`] owns one adapter
//! and one dispatcher, routes typed requests to the adapter, answers the
//! bootstrap with the adapter's descriptor, and caches the bootstrap record
//! until disconnect.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use phi_adapter_protocol::catalog::AdapterCapabilities;
use phi_adapter_protocol::{
    ActionResponse, CmdResponse, FrameHeader, JsonText, MessageType, PROTOCOL_LABEL,
};

use crate::dispatcher::{SidecarDispatcher, default_action_response, default_cmd_response};
use crate::error::TransportResult;
use crate::request::{
    AdapterActionInvokeRequest, AdapterDescriptor, BootstrapRequest, ChannelInvokeRequest,
    DeviceEffectInvokeRequest, DeviceNameUpdateRequest, SceneInvokeRequest, SidecarRequest,
    UnknownRequest,
};
use crate::socket::TransportEvent;

/// Overridable adapter behavior. Defaults answer every command with
/// `NotImplemented`, matching the dispatcher's behavior for absent
/// handlers, and describe an adapter with an empty descriptor.
#[allow(unused_variables)]
pub trait SidecarAdapter {
    /// Called when phi-core connects to this sidecar socket.
    fn on_connected(&mut self, sidecar: &mut SidecarDispatcher) {}

    /// Called when phi-core disconnects.
    fn on_disconnected(&mut self, sidecar: &mut SidecarDispatcher) {}

    /// Called on protocol decode failures; the connection stays up.
    fn on_protocol_error(&mut self, sidecar: &mut SidecarDispatcher, message: &str) {}

    /// Called after the bootstrap payload arrived. The host replies with
    /// the descriptor afterwards; this hook is for the adapter's own setup.
    fn on_bootstrap(&mut self, sidecar: &mut SidecarDispatcher, request: &BootstrapRequest) {}

    /// Handles `cmd.channel.invoke`.
    fn on_channel_invoke(
        &mut self,
        sidecar: &mut SidecarDispatcher,
        request: &ChannelInvokeRequest,
    ) -> CmdResponse {
        default_cmd_response(request.cmd_id, "Channel invoke handler not registered")
    }

    /// Handles `cmd.adapter.action.invoke`.
    fn on_adapter_action_invoke(
        &mut self,
        sidecar: &mut SidecarDispatcher,
        request: &AdapterActionInvokeRequest,
    ) -> ActionResponse {
        default_action_response(request.cmd_id, "Adapter action handler not registered")
    }

    /// Handles `cmd.device.name.update`.
    fn on_device_name_update(
        &mut self,
        sidecar: &mut SidecarDispatcher,
        request: &DeviceNameUpdateRequest,
    ) -> CmdResponse {
        default_cmd_response(request.cmd_id, "Device name update handler not registered")
    }

    /// Handles `cmd.device.effect.invoke`.
    fn on_device_effect_invoke(
        &mut self,
        sidecar: &mut SidecarDispatcher,
        request: &DeviceEffectInvokeRequest,
    ) -> CmdResponse {
        default_cmd_response(request.cmd_id, "Device effect handler not registered")
    }

    /// Handles `cmd.scene.invoke`.
    fn on_scene_invoke(
        &mut self,
        sidecar: &mut SidecarDispatcher,
        request: &SceneInvokeRequest,
    ) -> CmdResponse {
        default_cmd_response(request.cmd_id, "Scene invoke handler not registered")
    }

    /// Called for request methods without a typed handler. The host still
    /// produces the `NotImplemented` reply when a command id is present.
    fn on_unknown_request(&mut self, sidecar: &mut SidecarDispatcher, request: &UnknownRequest) {}

    /// Adapter plugin type (e.g. `onkyo-pioneer`). An empty value is filled
    /// from the bootstrap or factory by the host when composing the
    /// descriptor.
    fn plugin_type(&self) -> String {
        String::new()
    }

    /// User-facing adapter name for the descriptor.
    fn display_name(&self) -> String {
        String::new()
    }

    /// User-facing adapter description for the descriptor.
    fn description(&self) -> String {
        String::new()
    }

    /// Adapter API version label for the descriptor.
    fn api_version(&self) -> String {
        PROTOCOL_LABEL.to_string()
    }

    /// Inline icon SVG markup for the descriptor.
    fn icon_svg(&self) -> String {
        String::new()
    }

    /// Optional image payload (base64 text) for the descriptor.
    fn image_base64(&self) -> String {
        String::new()
    }

    /// Default device timeout in milliseconds.
    fn timeout_ms(&self) -> i32 {
        0
    }

    /// Maximum supported instances, 0 meaning unlimited.
    fn max_instances(&self) -> i32 {
        0
    }

    /// Adapter capability summary.
    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::default()
    }

    /// Adapter config schema as JSON object text.
    fn config_schema_json(&self) -> JsonText {
        String::new()
    }

    /// Composes the descriptor from the getters above.
    fn descriptor(&self) -> AdapterDescriptor {
        AdapterDescriptor {
            plugin_type: self.plugin_type(),
            display_name: self.display_name(),
            description: self.description(),
            api_version: self.api_version(),
            icon_svg: self.icon_svg(),
            image_base64: self.image_base64(),
            timeout_ms: self.timeout_ms(),
            max_instances: self.max_instances(),
            capabilities: self.capabilities(),
            config_schema_json: self.config_schema_json(),
        }
    }
}

/// Factory for sidecar adapter instances of one plugin type.
pub trait AdapterFactory {
    /// Plugin type handled by this factory.
    fn plugin_type(&self) -> String;

    /// Creates a fresh adapter instance.
    fn create(&self) -> Box<dyn SidecarAdapter>;
}

/// Closed-world mapping from plugin type to adapter factory.
#[derive(Default)]
pub struct AdapterRegistry {
    factories: HashMap<String, Box<dyn AdapterFactory>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under its plugin type; a later registration for
    /// the same type replaces the earlier one.
    pub fn register(&mut self, factory: Box<dyn AdapterFactory>) {
        self.factories.insert(factory.plugin_type(), factory);
    }

    pub fn contains(&self, plugin_type: &str) -> bool {
        self.factories.contains_key(plugin_type)
    }

    /// Registered plugin types, unordered.
    pub fn plugin_types(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Creates an adapter for the plugin type, if registered.
    pub fn create(&self, plugin_type: &str) -> Option<Box<dyn SidecarAdapter>> {
        self.factories
            .get(plugin_type)
            .map(|factory| factory.create())
    }
}

/// High-level sidecar host wiring the IPC dispatcher to an adapter.
pub struct SidecarHost {
    dispatcher: SidecarDispatcher,
    adapter: Box<dyn SidecarAdapter>,
    factory_plugin_type: String,
    bootstrap: Option<BootstrapRequest>,
}

impl SidecarHost {
    pub fn new(socket_path: impl Into<PathBuf>, adapter: Box<dyn SidecarAdapter>) -> Self {
        Self {
            dispatcher: SidecarDispatcher::new(socket_path),
            adapter,
            factory_plugin_type: String::new(),
            bootstrap: None,
        }
    }

    /// Builds a host with an adapter created by `factory`.
    pub fn from_factory(socket_path: impl Into<PathBuf>, factory: &dyn AdapterFactory) -> Self {
        Self {
            dispatcher: SidecarDispatcher::new(socket_path),
            adapter: factory.create(),
            factory_plugin_type: factory.plugin_type(),
            bootstrap: None,
        }
    }

    pub fn start(&mut self) -> TransportResult<()> {
        self.dispatcher.start()
    }

    pub fn stop(&mut self) {
        self.dispatcher.stop();
    }

    pub fn adapter(&self) -> &dyn SidecarAdapter {
        self.adapter.as_ref()
    }

    pub fn adapter_mut(&mut self) -> &mut dyn SidecarAdapter {
        self.adapter.as_mut()
    }

    /// The dispatcher, for publishing events outside of request handlers.
    pub fn dispatcher_mut(&mut self) -> &mut SidecarDispatcher {
        &mut self.dispatcher
    }

    /// Last bootstrap payload; `None` before bootstrap and after
    /// disconnect.
    pub fn bootstrap(&self) -> Option<&BootstrapRequest> {
        self.bootstrap.as_ref()
    }

    /// Database adapter id after bootstrap, 0 before.
    pub fn adapter_id(&self) -> i32 {
        self.bootstrap
            .as_ref()
            .map(|bootstrap| bootstrap.adapter_id)
            .unwrap_or(0)
    }

    /// Effective plugin type: bootstrap wins over the factory's.
    pub fn plugin_type(&self) -> &str {
        match self.bootstrap.as_ref() {
            Some(bootstrap) if !bootstrap.adapter.plugin_type.is_empty() => {
                &bootstrap.adapter.plugin_type
            }
            _ => &self.factory_plugin_type,
        }
    }

    /// Runs one event-loop step, forwarding everything to the adapter.
    pub fn poll_once(&mut self, timeout: Duration) -> TransportResult<()> {
        let mut events = Vec::new();
        let poll_result = self.dispatcher.poll_events(timeout, &mut events);
        for event in events {
            match event {
                TransportEvent::Connected => self.adapter.on_connected(&mut self.dispatcher),
                TransportEvent::Disconnected => {
                    self.bootstrap = None;
                    self.adapter.on_disconnected(&mut self.dispatcher);
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

    fn handle_request_frame(&mut self, header: &FrameHeader, payload: &[u8]) {
        let request = match SidecarRequest::decode(header, payload) {
            Ok(request) => request,
            Err(error) => {
                let message = format!("Invalid request JSON: {error}");
                warn!(detail = %message, "dropping undecodable request frame");
                self.adapter.on_protocol_error(&mut self.dispatcher, &message);
                return;
            }
        };

        match request {
            SidecarRequest::Bootstrap(bootstrap) => self.handle_bootstrap(bootstrap),
            SidecarRequest::ChannelInvoke(invoke) => {
                let mut response = self.adapter.on_channel_invoke(&mut self.dispatcher, &invoke);
                if response.id == 0 {
                    response.id = invoke.cmd_id;
                }
                if let Err(error) = self.dispatcher.send_cmd_result(&response) {
                    warn!(%error, "failed to send channel invoke reply");
                }
            }
            SidecarRequest::AdapterActionInvoke(invoke) => {
                let mut response = self
                    .adapter
                    .on_adapter_action_invoke(&mut self.dispatcher, &invoke);
                if response.id == 0 {
                    response.id = invoke.cmd_id;
                }
                if let Err(error) = self.dispatcher.send_action_result(&response) {
                    warn!(%error, "failed to send action reply");
                }
            }
            SidecarRequest::DeviceNameUpdate(update) => {
                let mut response = self
                    .adapter
                    .on_device_name_update(&mut self.dispatcher, &update);
                if response.id == 0 {
                    response.id = update.cmd_id;
                }
                if let Err(error) = self.dispatcher.send_cmd_result(&response) {
                    warn!(%error, "failed to send name update reply");
                }
            }
            SidecarRequest::DeviceEffectInvoke(invoke) => {
                let mut response = self
                    .adapter
                    .on_device_effect_invoke(&mut self.dispatcher, &invoke);
                if response.id == 0 {
                    response.id = invoke.cmd_id;
                }
                if let Err(error) = self.dispatcher.send_cmd_result(&response) {
                    warn!(%error, "failed to send effect reply");
                }
            }
            SidecarRequest::SceneInvoke(invoke) => {
                let mut response = self.adapter.on_scene_invoke(&mut self.dispatcher, &invoke);
                if response.id == 0 {
                    response.id = invoke.cmd_id;
                }
                if let Err(error) = self.dispatcher.send_cmd_result(&response) {
                    warn!(%error, "failed to send scene reply");
                }
            }
            SidecarRequest::Unknown(unknown) => {
                self.adapter.on_unknown_request(&mut self.dispatcher, &unknown);
                if unknown.cmd_id != 0 {
                    let response = default_cmd_response(
                        unknown.cmd_id,
                        &format!("Unhandled IPC method: {}", unknown.method),
                    );
                    if let Err(error) = self.dispatcher.send_cmd_result(&response) {
                        warn!(%error, "failed to send unknown-method reply");
                    }
                }
            }
        }
    }

    fn handle_bootstrap(&mut self, bootstrap: BootstrapRequest) {
        debug!(
            adapter_id = bootstrap.adapter_id,
            plugin_type = %bootstrap.adapter.plugin_type,
            "bootstrap received"
        );
        self.adapter.on_bootstrap(&mut self.dispatcher, &bootstrap);

        let mut descriptor = self.adapter.descriptor();
        if descriptor.plugin_type.is_empty() {
            descriptor.plugin_type = if bootstrap.adapter.plugin_type.is_empty() {
                self.factory_plugin_type.clone()
            } else {
                bootstrap.adapter.plugin_type.clone()
            };
        }
        if let Err(error) = self
            .dispatcher
            .send_adapter_descriptor(&descriptor, bootstrap.correlation_id)
        {
            warn!(%error, "failed to send adapter descriptor");
        }

        self.bootstrap = Some(bootstrap);
    }
}
