//! Typed inbound requests and the request-envelope decoder.
//!
//! Every request payload is a JSON envelope `{method, cmdId?, payload?}`.
//! [`SidecarRequest::decode`] maps the envelope onto a typed request record
//! by method name. Field-name tolerance: where phi-core historically used a
//! second spelling, the preferred name wins and an empty value falls through
//! to the legacy alias.

use std::collections::HashMap;

use phi_adapter_protocol::catalog::{
    Adapter, AdapterCapabilities, AdapterFlags, DeviceEffect,
};
use phi_adapter_protocol::{
    CmdId, CorrelationId, ExternalId, FrameHeader, JsonResult, JsonText, ScalarValue, json,
};

/// Request method names routed by the dispatcher.
pub mod methods {
    pub const BOOTSTRAP: &str = "sync.adapter.bootstrap";
    pub const CHANNEL_INVOKE: &str = "cmd.channel.invoke";
    pub const ADAPTER_ACTION_INVOKE: &str = "cmd.adapter.action.invoke";
    pub const DEVICE_NAME_UPDATE: &str = "cmd.device.name.update";
    pub const DEVICE_EFFECT_INVOKE: &str = "cmd.device.effect.invoke";
    pub const SCENE_INVOKE: &str = "cmd.scene.invoke";
}

/// Bootstrap payload sent by phi-core right after connect. Fire-and-forget:
/// no command reply is produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootstrapRequest {
    /// Database adapter id in phi-core.
    pub adapter_id: i32,
    /// Envelope `cmdId` (zero when absent).
    pub cmd_id: CmdId,
    /// Transport correlation id from the frame header; the descriptor reply
    /// is correlated to this.
    pub correlation_id: CorrelationId,
    /// Effective adapter instance configuration.
    pub adapter: Adapter,
    /// Static adapter config as raw JSON text.
    pub static_config_json: JsonText,
}

/// Typed payload for `cmd.channel.invoke`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelInvokeRequest {
    pub cmd_id: CmdId,
    pub device_external_id: ExternalId,
    pub channel_external_id: ExternalId,
    /// Scalar form of `value` when it parsed as one.
    pub value: Option<ScalarValue>,
    /// Original JSON token for non-scalar/custom payloads.
    pub value_json: JsonText,
}

/// Typed payload for `cmd.adapter.action.invoke`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterActionInvokeRequest {
    pub cmd_id: CmdId,
    pub action_id: String,
    /// Raw JSON object with action params, `{}` when absent.
    pub params_json: JsonText,
}

/// Typed payload for `cmd.device.name.update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceNameUpdateRequest {
    pub cmd_id: CmdId,
    pub device_external_id: ExternalId,
    pub name: String,
}

/// Typed payload for `cmd.device.effect.invoke`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceEffectInvokeRequest {
    pub cmd_id: CmdId,
    pub device_external_id: ExternalId,
    /// Canonical effect when the caller sent one.
    pub effect: DeviceEffect,
    /// Vendor effect identifier when the caller sent one.
    pub effect_id: String,
    /// Raw JSON object with effect params, `{}` when absent.
    pub params_json: JsonText,
}

/// Typed payload for `cmd.scene.invoke`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneInvokeRequest {
    pub cmd_id: CmdId,
    pub scene_external_id: ExternalId,
    pub group_external_id: ExternalId,
    /// Scene action text (`activate`, `deactivate`, ...).
    pub action: String,
}

/// Fallback for request methods without a typed builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnknownRequest {
    pub cmd_id: CmdId,
    pub method: String,
    pub payload_json: JsonText,
}

/// Static adapter descriptor exchanged with phi-core during bootstrap and
/// via `adapterDescriptorUpdated` events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterDescriptor {
    pub plugin_type: String,
    pub display_name: String,
    pub description: String,
    pub api_version: String,
    pub icon_svg: String,
    pub image_base64: String,
    /// Default device timeout in milliseconds.
    pub timeout_ms: i32,
    /// Maximum allowed instances, 0 meaning unlimited.
    pub max_instances: i32,
    pub capabilities: AdapterCapabilities,
    /// Config schema as JSON object text, spliced verbatim.
    pub config_schema_json: JsonText,
}

impl AdapterDescriptor {
    /// Wire form of the descriptor object itself (the event/response wraps
    /// it under a `descriptor` member).
    pub fn to_wire_json(&self) -> String {
        use std::fmt::Write as _;

        let mut out = String::from("{");
        let mut first = true;
        json::append_field(&mut out, &mut first, "pluginType");
        json::append_quoted(&mut out, &self.plugin_type);
        json::append_field(&mut out, &mut first, "displayName");
        json::append_quoted(&mut out, &self.display_name);
        json::append_field(&mut out, &mut first, "description");
        json::append_quoted(&mut out, &self.description);
        json::append_field(&mut out, &mut first, "apiVersion");
        json::append_quoted(&mut out, &self.api_version);
        json::append_field(&mut out, &mut first, "iconSvg");
        json::append_quoted(&mut out, &self.icon_svg);
        json::append_field(&mut out, &mut first, "imageBase64");
        json::append_quoted(&mut out, &self.image_base64);
        json::append_field(&mut out, &mut first, "timeoutMs");
        let _ = write!(out, "{}", self.timeout_ms);
        json::append_field(&mut out, &mut first, "maxInstances");
        let _ = write!(out, "{}", self.max_instances);
        json::append_field(&mut out, &mut first, "capabilities");
        self.capabilities.append_wire_json(&mut out);
        json::append_field(&mut out, &mut first, "configSchema");
        json::append_raw_object(&mut out, &self.config_schema_json);
        out.push('}');
        out
    }
}

/// One decoded request, tagged by method.
#[derive(Debug, Clone, PartialEq)]
pub enum SidecarRequest {
    Bootstrap(BootstrapRequest),
    ChannelInvoke(ChannelInvokeRequest),
    AdapterActionInvoke(AdapterActionInvokeRequest),
    DeviceNameUpdate(DeviceNameUpdateRequest),
    DeviceEffectInvoke(DeviceEffectInvokeRequest),
    SceneInvoke(SceneInvokeRequest),
    Unknown(UnknownRequest),
}

impl SidecarRequest {
    /// Decodes a request frame payload into a typed request.
    ///
    /// Only a malformed root envelope is an error. A malformed `payload`
    /// member degrades to defaults so a sloppy peer cannot wedge the
    /// dispatcher.
    pub fn decode(header: &FrameHeader, payload: &[u8]) -> JsonResult<Self> {
        let text = String::from_utf8_lossy(payload);
        let root = json::parse_object_members(&text)?;

        let method = json::decode_string_or_default(member(&root, "method"));
        let cmd_token = member(&root, "cmdId");
        let cmd_id = if cmd_token.is_empty() {
            0
        } else {
            json::decode_cmd_id(cmd_token).unwrap_or(0)
        };
        let payload_token = {
            let token = member(&root, "payload");
            if token.is_empty() { "{}" } else { token }
        };

        if method == methods::BOOTSTRAP {
            return Ok(Self::Bootstrap(decode_bootstrap(
                header,
                cmd_id,
                payload_token,
            )));
        }

        let payload_map = json::parse_object_members(payload_token).unwrap_or_default();

        let request = match method.as_str() {
            methods::CHANNEL_INVOKE => {
                let value_token = member(&payload_map, "value");
                Self::ChannelInvoke(ChannelInvokeRequest {
                    cmd_id,
                    device_external_id: aliased_string(&payload_map, "deviceExternalId", "deviceId"),
                    channel_external_id: aliased_string(
                        &payload_map,
                        "channelExternalId",
                        "channelId",
                    ),
                    value: phi_adapter_protocol::decode_scalar(value_token),
                    value_json: value_token.to_string(),
                })
            }
            methods::ADAPTER_ACTION_INVOKE => Self::AdapterActionInvoke(AdapterActionInvokeRequest {
                cmd_id,
                action_id: json::decode_string_or_default(member(&payload_map, "actionId")),
                params_json: params_or_empty(member(&payload_map, "params")),
            }),
            methods::DEVICE_NAME_UPDATE => Self::DeviceNameUpdate(DeviceNameUpdateRequest {
                cmd_id,
                device_external_id: aliased_string(&payload_map, "deviceExternalId", "deviceId"),
                name: json::decode_string_or_default(member(&payload_map, "name")),
            }),
            methods::DEVICE_EFFECT_INVOKE => {
                let raw_effect = json::decode_i64_or(member(&payload_map, "effect"), 0);
                Self::DeviceEffectInvoke(DeviceEffectInvokeRequest {
                    cmd_id,
                    device_external_id: aliased_string(&payload_map, "deviceExternalId", "deviceId"),
                    effect: u16::try_from(raw_effect)
                        .ok()
                        .and_then(DeviceEffect::from_u16)
                        .unwrap_or_default(),
                    effect_id: json::decode_string_or_default(member(&payload_map, "effectId")),
                    params_json: params_or_empty(member(&payload_map, "params")),
                })
            }
            methods::SCENE_INVOKE => Self::SceneInvoke(SceneInvokeRequest {
                cmd_id,
                scene_external_id: aliased_string(&payload_map, "sceneExternalId", "sceneId"),
                group_external_id: json::decode_string_or_default(
                    member(&payload_map, "groupExternalId"),
                ),
                action: json::decode_string_or_default(member(&payload_map, "action")),
            }),
            _ => Self::Unknown(UnknownRequest {
                cmd_id,
                method,
                payload_json: payload_token.to_string(),
            }),
        };
        Ok(request)
    }
}

fn member<'a>(map: &HashMap<String, &'a str>, key: &str) -> &'a str {
    map.get(key).copied().unwrap_or("")
}

/// Preferred name first; empty result falls back to the legacy alias.
fn aliased_string(map: &HashMap<String, &str>, preferred: &str, alias: &str) -> String {
    let value = json::decode_string_or_default(member(map, preferred));
    if value.is_empty() {
        json::decode_string_or_default(member(map, alias))
    } else {
        value
    }
}

fn params_or_empty(token: &str) -> JsonText {
    if json::trim_ws(token).is_empty() {
        "{}".to_string()
    } else {
        token.to_string()
    }
}

fn decode_bootstrap(header: &FrameHeader, cmd_id: CmdId, payload_token: &str) -> BootstrapRequest {
    let mut request = BootstrapRequest {
        cmd_id,
        correlation_id: header.correlation_id,
        ..Default::default()
    };

    let payload_map = match json::parse_object_members(payload_token) {
        Ok(map) => map,
        Err(_) => return request,
    };
    request.adapter_id = json::decode_i64_or(member(&payload_map, "adapterId"), 0) as i32;
    request.static_config_json = member(&payload_map, "staticConfig").to_string();

    if let Ok(adapter_map) = json::parse_object_members(member(&payload_map, "adapter")) {
        let adapter = &mut request.adapter;
        adapter.name = json::decode_string_or_default(member(&adapter_map, "name"));
        adapter.host = json::decode_string_or_default(member(&adapter_map, "host"));
        adapter.ip = json::decode_string_or_default(member(&adapter_map, "ip"));
        adapter.port = json::decode_i64_or(member(&adapter_map, "port"), 0) as u16;
        adapter.user = json::decode_string_or_default(member(&adapter_map, "user"));
        adapter.password = aliased_string(&adapter_map, "pw", "password");
        adapter.token = json::decode_string_or_default(member(&adapter_map, "token"));
        adapter.plugin_type = aliased_string(&adapter_map, "plugin", "pluginType");
        adapter.external_id = aliased_string(&adapter_map, "id", "externalId");
        adapter.meta_json = member(&adapter_map, "meta").to_string();
        adapter.flags = AdapterFlags::from_bits_retain(
            json::decode_i64_or(member(&adapter_map, "flags"), 0) as u32,
        );
    }

    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use phi_adapter_protocol::MessageType;

    fn request_header(correlation_id: u64) -> FrameHeader {
        FrameHeader::new(MessageType::Request, correlation_id)
    }

    fn decode(correlation_id: u64, payload: &str) -> SidecarRequest {
        SidecarRequest::decode(&request_header(correlation_id), payload.as_bytes()).unwrap()
    }

    #[test]
    fn bootstrap_fields_and_aliases() {
        let request = decode(
            5,
            r#"{"method":"sync.adapter.bootstrap","payload":{"adapterId":12,"adapter":{"id":"ad-1","plugin":"onkyo-pioneer","flags":5},"staticConfig":{"foo":1}}}"#,
        );
        let SidecarRequest::Bootstrap(bootstrap) = request else {
            panic!("expected bootstrap");
        };
        assert_eq!(bootstrap.adapter_id, 12);
        assert_eq!(bootstrap.cmd_id, 0);
        assert_eq!(bootstrap.correlation_id, 5);
        assert_eq!(bootstrap.adapter.external_id, "ad-1");
        assert_eq!(bootstrap.adapter.plugin_type, "onkyo-pioneer");
        assert_eq!(bootstrap.adapter.flags.bits(), 5);
        assert_eq!(bootstrap.static_config_json, r#"{"foo":1}"#);
    }

    #[test]
    fn bootstrap_legacy_adapter_aliases() {
        let request = decode(
            1,
            r#"{"method":"sync.adapter.bootstrap","payload":{"adapter":{"externalId":"ad-2","pluginType":"hue","password":"secret"}}}"#,
        );
        let SidecarRequest::Bootstrap(bootstrap) = request else {
            panic!("expected bootstrap");
        };
        assert_eq!(bootstrap.adapter.external_id, "ad-2");
        assert_eq!(bootstrap.adapter.plugin_type, "hue");
        assert_eq!(bootstrap.adapter.password, "secret");
    }

    #[test]
    fn bootstrap_preferred_name_wins_over_alias() {
        let request = decode(
            1,
            r#"{"method":"sync.adapter.bootstrap","payload":{"adapter":{"pw":"first","password":"second"}}}"#,
        );
        let SidecarRequest::Bootstrap(bootstrap) = request else {
            panic!("expected bootstrap");
        };
        assert_eq!(bootstrap.adapter.password, "first");
    }

    #[test]
    fn channel_invoke_with_scalar_value() {
        let request = decode(
            7,
            r#"{"method":"cmd.channel.invoke","cmdId":42,"payload":{"deviceExternalId":"dev-A","channelExternalId":"ch-1","value":0.5}}"#,
        );
        let SidecarRequest::ChannelInvoke(invoke) = request else {
            panic!("expected channel invoke");
        };
        assert_eq!(invoke.cmd_id, 42);
        assert_eq!(invoke.device_external_id, "dev-A");
        assert_eq!(invoke.channel_external_id, "ch-1");
        assert_eq!(invoke.value, Some(ScalarValue::Float(0.5)));
        assert_eq!(invoke.value_json, "0.5");
    }

    #[test]
    fn channel_invoke_aliases_match_canonical_names() {
        let canonical = decode(
            1,
            r#"{"method":"cmd.channel.invoke","cmdId":1,"payload":{"deviceExternalId":"d","channelExternalId":"c","value":true}}"#,
        );
        let legacy = decode(
            1,
            r#"{"method":"cmd.channel.invoke","cmdId":1,"payload":{"deviceId":"d","channelId":"c","value":true}}"#,
        );
        assert_eq!(canonical, legacy);
    }

    #[test]
    fn channel_invoke_keeps_raw_token_for_aggregates() {
        let request = decode(
            1,
            r#"{"method":"cmd.channel.invoke","cmdId":2,"payload":{"deviceId":"d","channelId":"c","value":{"r":1,"g":0,"b":0}}}"#,
        );
        let SidecarRequest::ChannelInvoke(invoke) = request else {
            panic!("expected channel invoke");
        };
        assert_eq!(invoke.value, None);
        assert_eq!(invoke.value_json, r#"{"r":1,"g":0,"b":0}"#);
    }

    #[test]
    fn cmd_id_number_and_string_agree() {
        let numeric = decode(1, r#"{"method":"cmd.device.name.update","cmdId":42,"payload":{}}"#);
        let stringy = decode(
            1,
            r#"{"method":"cmd.device.name.update","cmdId":"42","payload":{}}"#,
        );
        assert_eq!(numeric, stringy);
        let SidecarRequest::DeviceNameUpdate(update) = numeric else {
            panic!("expected name update");
        };
        assert_eq!(update.cmd_id, 42);
    }

    #[test]
    fn action_invoke_defaults_params_to_empty_object() {
        let request = decode(
            1,
            r#"{"method":"cmd.adapter.action.invoke","cmdId":3,"payload":{"actionId":"probe"}}"#,
        );
        let SidecarRequest::AdapterActionInvoke(action) = request else {
            panic!("expected action invoke");
        };
        assert_eq!(action.action_id, "probe");
        assert_eq!(action.params_json, "{}");
    }

    #[test]
    fn effect_invoke_maps_known_effects() {
        let request = decode(
            1,
            r#"{"method":"cmd.device.effect.invoke","cmdId":4,"payload":{"deviceId":"d","effect":4,"effectId":"loop","params":{"speed":2}}}"#,
        );
        let SidecarRequest::DeviceEffectInvoke(effect) = request else {
            panic!("expected effect invoke");
        };
        assert_eq!(effect.effect, DeviceEffect::ColorLoop);
        assert_eq!(effect.effect_id, "loop");
        assert_eq!(effect.params_json, r#"{"speed":2}"#);
    }

    #[test]
    fn effect_invoke_out_of_range_degrades_to_none() {
        let request = decode(
            1,
            r#"{"method":"cmd.device.effect.invoke","cmdId":4,"payload":{"deviceId":"d","effect":999}}"#,
        );
        let SidecarRequest::DeviceEffectInvoke(effect) = request else {
            panic!("expected effect invoke");
        };
        assert_eq!(effect.effect, DeviceEffect::None);
    }

    #[test]
    fn scene_invoke_fields() {
        let request = decode(
            1,
            r#"{"method":"cmd.scene.invoke","cmdId":5,"payload":{"sceneId":"scn-1","groupExternalId":"grp-1","action":"activate"}}"#,
        );
        let SidecarRequest::SceneInvoke(scene) = request else {
            panic!("expected scene invoke");
        };
        assert_eq!(scene.scene_external_id, "scn-1");
        assert_eq!(scene.group_external_id, "grp-1");
        assert_eq!(scene.action, "activate");
    }

    #[test]
    fn unknown_method_carries_raw_payload() {
        let request = decode(
            1,
            r#"{"method":"cmd.mystery","cmdId":"9","payload":{"k":[1,2]}}"#,
        );
        let SidecarRequest::Unknown(unknown) = request else {
            panic!("expected unknown");
        };
        assert_eq!(unknown.cmd_id, 9);
        assert_eq!(unknown.method, "cmd.mystery");
        assert_eq!(unknown.payload_json, r#"{"k":[1,2]}"#);
    }

    #[test]
    fn missing_payload_defaults_to_empty_object() {
        let request = decode(1, r#"{"method":"cmd.mystery","cmdId":1}"#);
        let SidecarRequest::Unknown(unknown) = request else {
            panic!("expected unknown");
        };
        assert_eq!(unknown.payload_json, "{}");
    }

    #[test]
    fn malformed_payload_member_degrades_to_defaults() {
        // the envelope parses, the payload member does not: not a protocol
        // error, the typed request just comes back empty
        let request = decode(
            1,
            r#"{"method":"cmd.channel.invoke","cmdId":6,"payload":"not an object"}"#,
        );
        let SidecarRequest::ChannelInvoke(invoke) = request else {
            panic!("expected channel invoke");
        };
        assert_eq!(invoke.cmd_id, 6);
        assert!(invoke.device_external_id.is_empty());
        assert_eq!(invoke.value, None);
    }

    #[test]
    fn malformed_envelope_is_an_error() {
        let header = request_header(1);
        assert!(SidecarRequest::decode(&header, b"not json at all").is_err());
        assert!(SidecarRequest::decode(&header, b"[1,2,3]").is_err());
    }

    #[test]
    fn descriptor_wire_shape() {
        let descriptor = AdapterDescriptor {
            plugin_type: "demo-light".into(),
            display_name: "Demo Light".into(),
            api_version: "phicore.adapter.v1".into(),
            timeout_ms: 5000,
            config_schema_json: r#"{"factory":{"fields":[]}}"#.into(),
            ..Default::default()
        };
        let value: serde_json::Value = serde_json::from_str(&descriptor.to_wire_json()).unwrap();
        assert_eq!(value["pluginType"], "demo-light");
        assert_eq!(value["displayName"], "Demo Light");
        assert_eq!(value["timeoutMs"], 5000);
        assert_eq!(value["maxInstances"], 0);
        assert_eq!(value["capabilities"]["required"], 0);
        assert_eq!(value["configSchema"]["factory"]["fields"], serde_json::json!([]));
    }
}
