//! Domain value catalog.
//!
//! Passive schema shared with phi-core: devices, channels, rooms, groups,
//! scenes, adapter descriptors, discovery records, and the closed enum/flag
//! sets they reference. Records that travel outbound carry a
//! `to_wire_json()` encoder reproducing the wire shape field-for-field;
//! identity is always the adapter-scoped external id.

use bitflags::bitflags;
use std::fmt::Write as _;

use crate::json;
use crate::types::{ExternalId, JsonText};
use crate::value::ScalarValue;

/// Broad device category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeviceClass {
    #[default]
    Unknown = 0,
    Light = 1,
    Switch = 2,
    Sensor = 3,
    Button = 4,
    Plug = 5,
    Cover = 6,
    Thermostat = 7,
    Gateway = 8,
    MediaPlayer = 9,
    Heater = 10,
    Gate = 11,
    Valve = 12,
}

/// Canonical light/device effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum DeviceEffect {
    #[default]
    None = 0,
    Candle = 1,
    Fireplace = 2,
    Sparkle = 3,
    ColorLoop = 4,
    Alarm = 5,
    Relax = 6,
    Concentrate = 7,
    CustomVendor = 8,
}

impl DeviceEffect {
    pub fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Candle),
            2 => Some(Self::Fireplace),
            3 => Some(Self::Sparkle),
            4 => Some(Self::ColorLoop),
            5 => Some(Self::Alarm),
            6 => Some(Self::Relax),
            7 => Some(Self::Concentrate),
            8 => Some(Self::CustomVendor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ButtonEventCode {
    #[default]
    None = 0,
    InitialPress = 1,
    DoublePress = 2,
    TriplePress = 3,
    QuadruplePress = 4,
    QuintuplePress = 5,
    LongPress = 10,
    LongPressRelease = 11,
    ShortPressRelease = 12,
    Repeat = 20,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RockerMode {
    #[default]
    Unknown = 0,
    SingleRocker = 1,
    DualRocker = 2,
    SinglePush = 3,
    DualPush = 4,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SensitivityLevel {
    #[default]
    Unknown = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    VeryHigh = 4,
    Max = 5,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OperatingLevel {
    #[default]
    Unknown = 0,
    Off = 1,
    Low = 2,
    Medium = 3,
    High = 4,
    Auto = 5,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PresetMode {
    #[default]
    Unknown = 0,
    Eco = 1,
    Normal = 2,
    Comfort = 3,
    Sleep = 4,
    Away = 5,
    Boost = 6,
}

/// What a channel measures or controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ChannelKind {
    #[default]
    Unknown = 0,
    PowerOnOff = 1,
    ButtonEvent = 2,
    Brightness = 10,
    ColorTemperature = 11,
    ColorRgb = 12,
    ColorTemperaturePreset = 13,
    Volume = 30,
    Mute = 31,
    HdmiInput = 32,
    PlayPause = 33,
    Temperature = 50,
    Humidity = 51,
    Illuminance = 52,
    Motion = 53,
    Battery = 54,
    Co2 = 55,
    RelativeRotation = 56,
    ConnectivityStatus = 57,
    DeviceSoftwareUpdate = 58,
    SignalStrength = 59,
    Power = 60,
    Voltage = 61,
    Current = 62,
    Energy = 63,
    LinkQuality = 64,
    Duration = 65,
    Contact = 66,
    Tamper = 67,
    AmbientLightLevel = 68,
    PhValue = 200,
    OrpValue = 201,
    SaltPpm = 202,
    Conductivity = 203,
    TdsValue = 204,
    SpecificGravity = 205,
    WaterHardness = 206,
    FreeChlorine = 207,
    FilterPressure = 208,
    WaterFlow = 209,
    SceneTrigger = 300,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelDataType {
    #[default]
    Unknown = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    String = 4,
    Color = 5,
    Enum = 6,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectivityStatus {
    #[default]
    Unknown = 0,
    Connected = 1,
    Limited = 2,
    Disconnected = 3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SceneState {
    #[default]
    Unknown = 0,
    Inactive = 1,
    ActiveStatic = 2,
    ActiveDynamic = 3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SceneAction {
    #[default]
    Activate = 0,
    Deactivate = 1,
    Dynamic = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DiscoveryKind {
    #[default]
    Mdns = 0,
    Ssdp = 1,
    NetScan = 2,
    Manual = 3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AdapterConfigFieldType {
    #[default]
    String = 0,
    Password = 1,
    Integer = 2,
    Boolean = 3,
    Hostname = 4,
    Port = 5,
    QrCode = 6,
    Select = 7,
    Action = 8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AdapterConfigLabelPosition {
    #[default]
    Top = 0,
    Left = 1,
    Right = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AdapterConfigActionPosition {
    #[default]
    None = 0,
    Inline = 1,
    Below = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AdapterConfigVisibilityOp {
    #[default]
    Equals = 0,
    Contains = 1,
}

bitflags! {
    /// Channel capability and reporting flags.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct ChannelFlags: u32 {
        const READABLE = 0x0000_0001;
        const WRITABLE = 0x0000_0002;
        const REPORTABLE = 0x0000_0004;
        const RETAINED = 0x0000_0008;
        const INACTIVE = 0x0000_0010;
        const NO_TRIGGER = 0x0000_0020;
        const SUPPRESS = 0x0000_0040;
    }
}

/// Preset for writable channels: readable, writable, reportable, retained.
pub const CHANNEL_FLAGS_DEFAULT_WRITE: ChannelFlags = ChannelFlags::READABLE
    .union(ChannelFlags::WRITABLE)
    .union(ChannelFlags::REPORTABLE)
    .union(ChannelFlags::RETAINED);

/// Preset for read-only channels: readable, reportable, retained.
pub const CHANNEL_FLAGS_DEFAULT_READ: ChannelFlags = ChannelFlags::READABLE
    .union(ChannelFlags::REPORTABLE)
    .union(ChannelFlags::RETAINED);

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct DeviceFlags: u32 {
        const WIRELESS = 0x0000_0001;
        const BATTERY = 0x0000_0002;
        const FLUSHABLE = 0x0000_0004;
        const BLE = 0x0000_0008;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct SceneFlags: u32 {
        const ORIGIN_ADAPTER = 0x0000_0001;
        const SUPPORTS_DYNAMIC = 0x0000_0002;
        const SUPPORTS_DEACTIVATE = 0x0000_0004;
    }
}

bitflags! {
    /// Adapter instance behavior flags delivered with the bootstrap config.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct AdapterFlags: u32 {
        const USE_TLS = 0x0000_0001;
        const CLOUD_SERVICES = 0x0000_0002;
        const ENABLE_LOGS = 0x0000_0004;
        const REQUIRES_POLLING = 0x0000_0008;
        const SUPPORTS_DISCOVERY = 0x0000_0010;
        const SUPPORTS_PROBE = 0x0000_0020;
        const SUPPORTS_RENAME = 0x0000_0040;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct AdapterConfigFieldFlags: u8 {
        const REQUIRED = 0x01;
        const SECRET = 0x02;
        const READ_ONLY = 0x04;
        const TRANSIENT = 0x08;
        const MULTI = 0x10;
        const INSTANCE_ONLY = 0x20;
    }
}

bitflags! {
    /// Connection parameters an adapter requires or accepts.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct AdapterRequirements: u32 {
        const HOST = 0x0000_0001;
        const PORT = 0x0000_0002;
        const USERNAME = 0x0000_0004;
        const PASSWORD = 0x0000_0008;
        const APP_KEY = 0x0000_0010;
        const TOKEN = 0x0000_0020;
        const QR_CODE = 0x0000_0040;
        const SUPPORTS_TLS = 0x0000_0080;
        const MANUAL_CONFIRM = 0x0000_0100;
        const USES_RETRY_INTERVAL = 0x0000_0200;
    }
}

/// One selectable effect a device supports, listed in device snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceEffectDescriptor {
    pub effect: DeviceEffect,
    pub id: String,
    pub label: String,
    pub description: String,
    pub requires_params: bool,
    pub meta_json: JsonText,
}

/// Device snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Device {
    pub name: String,
    pub device_class: DeviceClass,
    pub flags: DeviceFlags,
    pub external_id: ExternalId,
    pub manufacturer: String,
    pub firmware: String,
    pub model: String,
    pub meta_json: JsonText,
    pub effects: Vec<DeviceEffectDescriptor>,
}

pub type DeviceList = Vec<Device>;

/// One value/label pair for select-style config fields and enum channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterConfigOption {
    pub value: String,
    pub label: String,
}

pub type AdapterConfigOptionList = Vec<AdapterConfigOption>;

/// Channel snapshot, including the last reported value when one exists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channel {
    pub name: String,
    pub external_id: ExternalId,
    pub kind: ChannelKind,
    pub data_type: ChannelDataType,
    pub flags: ChannelFlags,
    pub unit: String,
    pub min_value: f64,
    pub max_value: f64,
    pub step_value: f64,
    pub meta_json: JsonText,
    pub choices: AdapterConfigOptionList,
    pub last_value: Option<ScalarValue>,
    pub last_update_ms: i64,
}

pub type ChannelList = Vec<Channel>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Room {
    pub external_id: ExternalId,
    pub name: String,
    pub zone: String,
    pub device_external_ids: Vec<ExternalId>,
    pub meta_json: JsonText,
}

pub type RoomList = Vec<Room>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub external_id: ExternalId,
    pub name: String,
    pub zone: String,
    pub device_external_ids: Vec<ExternalId>,
    pub meta_json: JsonText,
}

pub type GroupList = Vec<Group>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub external_id: ExternalId,
    pub name: String,
    pub description: String,
    pub scope_external_id: ExternalId,
    pub scope_type: String,
    pub avatar_color: String,
    pub image: String,
    pub preset_tag: String,
    pub state: SceneState,
    pub flags: SceneFlags,
    pub meta_json: JsonText,
}

pub type SceneList = Vec<Scene>;

/// Effective adapter instance configuration delivered by bootstrap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Adapter {
    pub name: String,
    pub host: String,
    pub ip: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub token: String,
    pub plugin_type: String,
    pub external_id: ExternalId,
    pub meta_json: JsonText,
    pub flags: AdapterFlags,
}

pub type AdapterList = Vec<Adapter>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterConfigResponsiveInt {
    pub xs: i32,
    pub sm: i32,
    pub md: i32,
    pub lg: i32,
    pub xl: i32,
    pub xxl: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterConfigFieldVisibility {
    pub field_key: String,
    pub value: ScalarValue,
    pub op: AdapterConfigVisibilityOp,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterConfigFieldLayout {
    pub span: AdapterConfigResponsiveInt,
    pub position: i32,
    pub has_label_position: bool,
    pub label_position: AdapterConfigLabelPosition,
    pub label_span: i32,
    pub control_span: i32,
    pub has_action_position: bool,
    pub action_position: AdapterConfigActionPosition,
    pub action_span: i32,
}

/// One field of the adapter configuration form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterConfigField {
    pub key: String,
    pub field_type: AdapterConfigFieldType,
    pub label: String,
    pub description: String,
    pub action_id: String,
    pub action_label: String,
    pub placeholder: String,
    pub default_value: ScalarValue,
    pub visibility: AdapterConfigFieldVisibility,
    pub layout: AdapterConfigFieldLayout,
    pub parent_action_id: String,
    pub options: AdapterConfigOptionList,
    pub meta_json: JsonText,
    pub flags: AdapterConfigFieldFlags,
}

pub type AdapterConfigFieldList = Vec<AdapterConfigField>;

#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfigSectionLayoutDefaults {
    pub span: AdapterConfigResponsiveInt,
    pub label_position: AdapterConfigLabelPosition,
    pub label_span: i32,
    pub control_span: i32,
    pub action_position: AdapterConfigActionPosition,
    pub action_span: i32,
}

impl Default for AdapterConfigSectionLayoutDefaults {
    fn default() -> Self {
        Self {
            span: AdapterConfigResponsiveInt::default(),
            label_position: AdapterConfigLabelPosition::Left,
            label_span: 8,
            control_span: 16,
            action_position: AdapterConfigActionPosition::None,
            action_span: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfigSectionLayout {
    pub grid_units: i32,
    pub gutter_x: i32,
    pub gutter_y: i32,
    pub defaults: AdapterConfigSectionLayoutDefaults,
}

impl Default for AdapterConfigSectionLayout {
    fn default() -> Self {
        Self {
            grid_units: 24,
            gutter_x: 12,
            gutter_y: 8,
            defaults: AdapterConfigSectionLayoutDefaults::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterConfigSection {
    pub title: String,
    pub description: String,
    pub layout: AdapterConfigSectionLayout,
    pub fields: AdapterConfigFieldList,
}

/// Factory- and instance-level configuration forms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterConfigSchema {
    pub factory: AdapterConfigSection,
    pub instance: AdapterConfigSection,
}

/// One invokable adapter action advertised in the descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterActionDescriptor {
    pub id: String,
    pub label: String,
    pub description: String,
    pub has_form: bool,
    pub danger: bool,
    pub cooldown_ms: i32,
    pub confirm_json: JsonText,
    pub meta_json: JsonText,
}

pub type AdapterActionDescriptorList = Vec<AdapterActionDescriptor>;

/// Capability summary advertised in the adapter descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterCapabilities {
    pub required: AdapterRequirements,
    pub optional: AdapterRequirements,
    pub flags: AdapterFlags,
    pub factory_actions: AdapterActionDescriptorList,
    pub instance_actions: AdapterActionDescriptorList,
    pub defaults_json: JsonText,
}

/// One discovered device/service candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    pub plugin_type: String,
    pub discovered_external_id: ExternalId,
    pub label: String,
    pub hostname: String,
    pub ip: String,
    pub port: u16,
    pub kind: DiscoveryKind,
    pub service_type: String,
    pub signal: String,
    pub meta_json: JsonText,
}

pub type DiscoveryList = Vec<Discovery>;

impl Device {
    /// Wire form used inside `deviceUpdated` payloads.
    pub fn to_wire_json(&self) -> String {
        let mut out = String::from("{");
        let mut first = true;
        json::append_field(&mut out, &mut first, "id");
        json::append_quoted(&mut out, &self.external_id);
        json::append_field(&mut out, &mut first, "name");
        json::append_quoted(&mut out, &self.name);
        json::append_field(&mut out, &mut first, "deviceClass");
        let _ = write!(out, "{}", self.device_class as u8);
        json::append_field(&mut out, &mut first, "flags");
        let _ = write!(out, "{}", self.flags.bits());
        json::append_field(&mut out, &mut first, "manufacturer");
        json::append_quoted(&mut out, &self.manufacturer);
        json::append_field(&mut out, &mut first, "firmware");
        json::append_quoted(&mut out, &self.firmware);
        json::append_field(&mut out, &mut first, "model");
        json::append_quoted(&mut out, &self.model);
        json::append_field(&mut out, &mut first, "meta");
        json::append_raw_object(&mut out, &self.meta_json);
        json::append_field(&mut out, &mut first, "effects");
        out.push('[');
        let mut first_effect = true;
        for effect in &self.effects {
            if !first_effect {
                out.push(',');
            }
            first_effect = false;
            effect.append_wire_json(&mut out);
        }
        out.push(']');
        out.push('}');
        out
    }
}

impl DeviceEffectDescriptor {
    fn append_wire_json(&self, out: &mut String) {
        out.push('{');
        let mut first = true;
        json::append_field(out, &mut first, "effect");
        let _ = write!(out, "{}", self.effect as u16);
        json::append_field(out, &mut first, "id");
        json::append_quoted(out, &self.id);
        json::append_field(out, &mut first, "label");
        json::append_quoted(out, &self.label);
        json::append_field(out, &mut first, "description");
        json::append_quoted(out, &self.description);
        json::append_field(out, &mut first, "requiresParams");
        out.push_str(if self.requires_params { "true" } else { "false" });
        json::append_field(out, &mut first, "meta");
        json::append_raw_object(out, &self.meta_json);
        out.push('}');
    }
}

impl Channel {
    /// Wire form used inside `deviceUpdated` and `channelUpdated` payloads.
    pub fn to_wire_json(&self) -> String {
        let mut out = String::from("{");
        let mut first = true;
        json::append_field(&mut out, &mut first, "id");
        json::append_quoted(&mut out, &self.external_id);
        json::append_field(&mut out, &mut first, "name");
        json::append_quoted(&mut out, &self.name);
        json::append_field(&mut out, &mut first, "kind");
        let _ = write!(out, "{}", self.kind as u16);
        json::append_field(&mut out, &mut first, "dataType");
        let _ = write!(out, "{}", self.data_type as u8);
        json::append_field(&mut out, &mut first, "flags");
        let _ = write!(out, "{}", self.flags.bits());
        json::append_field(&mut out, &mut first, "unit");
        json::append_quoted(&mut out, &self.unit);
        json::append_field(&mut out, &mut first, "minValue");
        let _ = write!(out, "{}", self.min_value);
        json::append_field(&mut out, &mut first, "maxValue");
        let _ = write!(out, "{}", self.max_value);
        json::append_field(&mut out, &mut first, "stepValue");
        let _ = write!(out, "{}", self.step_value);
        json::append_field(&mut out, &mut first, "meta");
        json::append_raw_object(&mut out, &self.meta_json);
        json::append_field(&mut out, &mut first, "choices");
        out.push('[');
        let mut first_choice = true;
        for choice in &self.choices {
            if !first_choice {
                out.push(',');
            }
            first_choice = false;
            out.push_str("{\"value\":");
            json::append_quoted(&mut out, &choice.value);
            out.push_str(",\"label\":");
            json::append_quoted(&mut out, &choice.label);
            out.push('}');
        }
        out.push(']');
        json::append_field(&mut out, &mut first, "lastValue");
        match &self.last_value {
            Some(value) => value.append_json(&mut out),
            None => out.push_str("null"),
        }
        json::append_field(&mut out, &mut first, "lastUpdateMs");
        let _ = write!(out, "{}", self.last_update_ms);
        json::append_field(&mut out, &mut first, "hasValue");
        out.push_str(if self.last_value.is_some() { "true" } else { "false" });
        out.push('}');
        out
    }
}

impl Room {
    pub fn to_wire_json(&self) -> String {
        let mut out = String::from("{");
        let mut first = true;
        json::append_field(&mut out, &mut first, "externalId");
        json::append_quoted(&mut out, &self.external_id);
        json::append_field(&mut out, &mut first, "name");
        json::append_quoted(&mut out, &self.name);
        json::append_field(&mut out, &mut first, "zone");
        json::append_quoted(&mut out, &self.zone);
        json::append_field(&mut out, &mut first, "deviceExternalIds");
        json::append_string_array(&mut out, &self.device_external_ids);
        json::append_field(&mut out, &mut first, "meta");
        json::append_raw_object(&mut out, &self.meta_json);
        out.push('}');
        out
    }
}

impl Group {
    pub fn to_wire_json(&self) -> String {
        let mut out = String::from("{");
        let mut first = true;
        json::append_field(&mut out, &mut first, "id");
        json::append_quoted(&mut out, &self.external_id);
        json::append_field(&mut out, &mut first, "name");
        json::append_quoted(&mut out, &self.name);
        json::append_field(&mut out, &mut first, "zone");
        json::append_quoted(&mut out, &self.zone);
        json::append_field(&mut out, &mut first, "deviceExternalIds");
        json::append_string_array(&mut out, &self.device_external_ids);
        json::append_field(&mut out, &mut first, "meta");
        json::append_raw_object(&mut out, &self.meta_json);
        out.push('}');
        out
    }
}

impl Scene {
    pub fn to_wire_json(&self) -> String {
        let mut out = String::from("{");
        let mut first = true;
        json::append_field(&mut out, &mut first, "id");
        json::append_quoted(&mut out, &self.external_id);
        json::append_field(&mut out, &mut first, "name");
        json::append_quoted(&mut out, &self.name);
        json::append_field(&mut out, &mut first, "description");
        json::append_quoted(&mut out, &self.description);
        json::append_field(&mut out, &mut first, "scopeId");
        json::append_quoted(&mut out, &self.scope_external_id);
        json::append_field(&mut out, &mut first, "scopeType");
        json::append_quoted(&mut out, &self.scope_type);
        json::append_field(&mut out, &mut first, "avatarColor");
        json::append_quoted(&mut out, &self.avatar_color);
        json::append_field(&mut out, &mut first, "image");
        json::append_quoted(&mut out, &self.image);
        json::append_field(&mut out, &mut first, "presetTag");
        json::append_quoted(&mut out, &self.preset_tag);
        json::append_field(&mut out, &mut first, "state");
        let _ = write!(out, "{}", self.state as u8);
        json::append_field(&mut out, &mut first, "flags");
        let _ = write!(out, "{}", self.flags.bits());
        json::append_field(&mut out, &mut first, "meta");
        json::append_raw_object(&mut out, &self.meta_json);
        out.push('}');
        out
    }
}

impl AdapterActionDescriptor {
    pub fn append_wire_json(&self, out: &mut String) {
        out.push('{');
        let mut first = true;
        json::append_field(out, &mut first, "id");
        json::append_quoted(out, &self.id);
        json::append_field(out, &mut first, "label");
        json::append_quoted(out, &self.label);
        json::append_field(out, &mut first, "description");
        json::append_quoted(out, &self.description);
        json::append_field(out, &mut first, "hasForm");
        out.push_str(if self.has_form { "true" } else { "false" });
        json::append_field(out, &mut first, "danger");
        out.push_str(if self.danger { "true" } else { "false" });
        json::append_field(out, &mut first, "cooldownMs");
        let _ = write!(out, "{}", self.cooldown_ms);
        json::append_field(out, &mut first, "confirm");
        json::append_raw_object(out, &self.confirm_json);
        json::append_field(out, &mut first, "meta");
        json::append_raw_object(out, &self.meta_json);
        out.push('}');
    }
}

impl AdapterCapabilities {
    pub fn append_wire_json(&self, out: &mut String) {
        out.push('{');
        let mut first = true;
        json::append_field(out, &mut first, "required");
        let _ = write!(out, "{}", self.required.bits());
        json::append_field(out, &mut first, "optional");
        let _ = write!(out, "{}", self.optional.bits());
        json::append_field(out, &mut first, "flags");
        let _ = write!(out, "{}", self.flags.bits());
        json::append_field(out, &mut first, "factoryActions");
        append_action_list(out, &self.factory_actions);
        json::append_field(out, &mut first, "instanceActions");
        append_action_list(out, &self.instance_actions);
        json::append_field(out, &mut first, "defaults");
        json::append_raw_object(out, &self.defaults_json);
        out.push('}');
    }
}

fn append_action_list(out: &mut String, actions: &[AdapterActionDescriptor]) {
    out.push('[');
    let mut first = true;
    for action in actions {
        if !first {
            out.push(',');
        }
        first = false;
        action.append_wire_json(out);
    }
    out.push(']');
}

/// Appends a JSON array of channel wire forms.
pub fn append_channel_list(out: &mut String, channels: &[Channel]) {
    out.push('[');
    let mut first = true;
    for channel in channels {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&channel.to_wire_json());
    }
    out.push(']');
}
