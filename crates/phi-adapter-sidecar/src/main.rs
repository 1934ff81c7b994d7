//! Demo adapter sidecar.
//!
//! Hosts a small virtual light behind the sidecar IPC so a phi-core (or a
//! test harness) has something real to talk to: one device with a power and
//! a brightness channel, snapshot published on connect, channel invokes
//! echoed back as state updates.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use phi_adapter_protocol::catalog::{
    AdapterCapabilities, AdapterFlags, CHANNEL_FLAGS_DEFAULT_WRITE, Channel, ChannelDataType,
    ChannelKind, Device, DeviceClass,
};
use phi_adapter_protocol::{CmdResponse, CmdStatus, ScalarValue};
use phi_adapter_sidecar::{
    BootstrapRequest, ChannelInvokeRequest, ShutdownFlag, SidecarAdapter, SidecarDispatcher,
    SidecarHost, resolve_socket_path,
};

#[derive(Debug, Parser)]
#[command(name = "phi-adapter-sidecar", version, about = "Demo phi-core adapter sidecar")]
struct Cli {
    /// Unix socket path the core connects to.
    #[arg(env = "PHI_ADAPTER_SOCKET_PATH")]
    socket_path: Option<PathBuf>,

    /// Tracing filter, e.g. `info` or `phi_adapter_sidecar=debug`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

const DEVICE_ID: &str = "demo-light-1";
const CHANNEL_POWER: &str = "power";
const CHANNEL_BRIGHTNESS: &str = "brightness";

/// Virtual light with a power switch and a dimmer.
#[derive(Debug, Default)]
struct DemoLightAdapter {
    powered: bool,
    brightness: f64,
}

impl DemoLightAdapter {
    fn device(&self) -> Device {
        Device {
            name: "Demo Light".into(),
            device_class: DeviceClass::Light,
            external_id: DEVICE_ID.into(),
            manufacturer: "Phi Labs".into(),
            model: "DL-1".into(),
            ..Default::default()
        }
    }

    fn channels(&self) -> Vec<Channel> {
        vec![
            Channel {
                name: "Power".into(),
                external_id: CHANNEL_POWER.into(),
                kind: ChannelKind::PowerOnOff,
                data_type: ChannelDataType::Bool,
                flags: CHANNEL_FLAGS_DEFAULT_WRITE,
                last_value: Some(ScalarValue::Bool(self.powered)),
                ..Default::default()
            },
            Channel {
                name: "Brightness".into(),
                external_id: CHANNEL_BRIGHTNESS.into(),
                kind: ChannelKind::Brightness,
                data_type: ChannelDataType::Float,
                flags: CHANNEL_FLAGS_DEFAULT_WRITE,
                unit: "%".into(),
                max_value: 100.0,
                step_value: 1.0,
                last_value: Some(ScalarValue::Float(self.brightness)),
                ..Default::default()
            },
        ]
    }

    fn publish_snapshot(&self, sidecar: &mut SidecarDispatcher) {
        if let Err(error) = sidecar.send_device_updated(&self.device(), &self.channels()) {
            warn!(%error, "failed to publish device snapshot");
            return;
        }
        if let Err(error) = sidecar.send_full_sync_completed() {
            warn!(%error, "failed to publish sync completion");
        }
    }
}

impl SidecarAdapter for DemoLightAdapter {
    fn on_connected(&mut self, sidecar: &mut SidecarDispatcher) {
        info!("core connected");
        if let Err(error) = sidecar.send_connection_state_changed(true) {
            warn!(%error, "failed to publish connection state");
        }
        self.publish_snapshot(sidecar);
    }

    fn on_disconnected(&mut self, _sidecar: &mut SidecarDispatcher) {
        info!("core disconnected");
    }

    fn on_bootstrap(&mut self, _sidecar: &mut SidecarDispatcher, request: &BootstrapRequest) {
        info!(
            adapter_id = request.adapter_id,
            external_id = %request.adapter.external_id,
            "bootstrap received"
        );
    }

    fn on_channel_invoke(
        &mut self,
        sidecar: &mut SidecarDispatcher,
        request: &ChannelInvokeRequest,
    ) -> CmdResponse {
        if request.device_external_id != DEVICE_ID {
            return CmdResponse::failure(
                CmdStatus::InvalidArgument,
                format!("unknown device: {}", request.device_external_id),
            );
        }

        let accepted = match (request.channel_external_id.as_str(), &request.value) {
            (CHANNEL_POWER, Some(ScalarValue::Bool(on))) => {
                self.powered = *on;
                ScalarValue::Bool(*on)
            }
            (CHANNEL_BRIGHTNESS, Some(ScalarValue::Float(level))) => {
                self.brightness = level.clamp(0.0, 100.0);
                ScalarValue::Float(self.brightness)
            }
            (CHANNEL_BRIGHTNESS, Some(ScalarValue::Int(level))) => {
                self.brightness = (*level as f64).clamp(0.0, 100.0);
                ScalarValue::Float(self.brightness)
            }
            _ => {
                return CmdResponse::failure(
                    CmdStatus::InvalidArgument,
                    format!("unsupported channel/value: {}", request.channel_external_id),
                );
            }
        };

        if let Err(error) = sidecar.send_channel_state_updated(
            &request.device_external_id,
            &request.channel_external_id,
            &accepted,
            0,
        ) {
            warn!(%error, "failed to publish channel state");
        }
        CmdResponse::success(accepted)
    }

    fn plugin_type(&self) -> String {
        "demo-light".into()
    }

    fn display_name(&self) -> String {
        "Demo Light".into()
    }

    fn description(&self) -> String {
        "Virtual light for sidecar IPC development".into()
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities {
            flags: AdapterFlags::SUPPORTS_RENAME,
            ..Default::default()
        }
    }

    fn config_schema_json(&self) -> String {
        r#"{"factory":{"fields":[]},"instance":{"fields":[]}}"#.into()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let socket_path = resolve_socket_path(cli.socket_path);

    let shutdown = ShutdownFlag::new();
    if let Err(error) = shutdown.install() {
        eprintln!("error: failed to install signal handlers: {error}");
        return ExitCode::FAILURE;
    }

    let mut host = SidecarHost::new(&socket_path, Box::new(DemoLightAdapter::default()));
    if let Err(error) = host.start() {
        eprintln!("error: {error}");
        return ExitCode::FAILURE;
    }
    info!(path = %socket_path.display(), "sidecar listening");

    while !shutdown.is_set() {
        if let Err(error) = host.poll_once(Duration::from_millis(250)) {
            warn!(%error, "poll failed");
            thread::sleep(Duration::from_millis(250));
        }
    }

    info!("shutting down");
    host.stop();
    ExitCode::SUCCESS
}
