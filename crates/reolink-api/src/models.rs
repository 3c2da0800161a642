// Command payload types
//
// `value` objects returned by the commands this crate issues. Fields use
// `#[serde(default)]` liberally because firmware versions disagree about
// which keys they send; unmodelled keys land in `extra`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Accept `0`/`1` as well as `true`/`false`.
fn int_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
        Value::Null => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean or integer, got {other}"
        ))),
    }
}

// ── Login ────────────────────────────────────────────────────────────

/// `Login` value: `{"Token": {"name", "leaseTime"}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginValue {
    #[serde(rename = "Token")]
    pub token: Token,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub name: String,
    /// Seconds until the token expires.
    pub lease_time: u64,
}

// ── Abilities ────────────────────────────────────────────────────────

/// One capability: support level plus permission bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityValue {
    #[serde(default)]
    pub permit: u32,
    #[serde(default)]
    pub ver: i64,
}

/// `GetAbility` value, `Ability` block.
///
/// Only the flags the client makes decisions on are typed; the rest are
/// reachable through [`Abilities::get`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Abilities {
    #[serde(default)]
    pub schedule_version: Option<AbilityValue>,
    #[serde(default)]
    pub ability_chn: Vec<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Abilities {
    /// Whether the device reports the basic ("legacy") schedule version,
    /// which also means it has no `GetRtspUrl`.
    pub fn is_legacy(&self) -> bool {
        self.schedule_version.is_some_and(|v| v.ver == 0)
    }

    /// Look up a device-level ability by wire name.
    pub fn get(&self, name: &str) -> Option<AbilityValue> {
        if name == "scheduleVersion" {
            return self.schedule_version;
        }
        self.extra
            .get(name)
            .and_then(|v| AbilityValue::deserialize(v).ok())
    }

    /// Look up a per-channel ability.
    pub fn channel(&self, channel: u8, name: &str) -> Option<AbilityValue> {
        self.ability_chn
            .get(usize::from(channel))
            .and_then(|chn| chn.get(name))
            .and_then(|v| AbilityValue::deserialize(v).ok())
    }
}

// ── System ───────────────────────────────────────────────────────────

/// `GetDevInfo` value, `DevInfo` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevInfo {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub serial: String,
    #[serde(default)]
    pub firm_ver: String,
    #[serde(default)]
    pub hard_ver: String,
    #[serde(default)]
    pub channel_num: u8,
    #[serde(default, rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub build_day: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GetChannelstatus` value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelStatusList {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub status: Vec<ChannelStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatus {
    pub channel: u8,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "int_bool")]
    pub online: bool,
    #[serde(default)]
    pub type_info: String,
}

// ── Time ─────────────────────────────────────────────────────────────

/// `GetTime` value: `{"Time": {...}, "Dst": {...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeValue {
    #[serde(rename = "Time")]
    pub time: DeviceClock,
    #[serde(rename = "Dst", default)]
    pub dst: Option<DstRule>,
}

/// Wall-clock reading from the device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceClock {
    pub year: i32,
    pub mon: u32,
    pub day: u32,
    pub hour: u32,
    pub min: u32,
    pub sec: u32,
    /// Seconds *west* of UTC (UTC+1 is `-3600`).
    #[serde(default)]
    pub time_zone: i32,
}

/// Daylight-saving rule. `week` 5 means the last week of the month;
/// `weekday` 0 is Sunday.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DstRule {
    #[serde(default, deserialize_with = "int_bool")]
    pub enable: bool,
    /// Hours added while DST is in effect.
    #[serde(default = "default_dst_offset")]
    pub offset: i32,
    #[serde(default)]
    pub start_mon: u32,
    #[serde(default)]
    pub start_week: u32,
    #[serde(default)]
    pub start_weekday: u32,
    #[serde(default)]
    pub start_hour: u32,
    #[serde(default)]
    pub start_min: u32,
    #[serde(default)]
    pub start_sec: u32,
    #[serde(default)]
    pub end_mon: u32,
    #[serde(default)]
    pub end_week: u32,
    #[serde(default)]
    pub end_weekday: u32,
    #[serde(default)]
    pub end_hour: u32,
    #[serde(default)]
    pub end_min: u32,
    #[serde(default)]
    pub end_sec: u32,
}

fn default_dst_offset() -> i32 {
    1
}

// ── Network ──────────────────────────────────────────────────────────

/// `GetLocalLink` value, `LocalLink` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalLink {
    #[serde(default)]
    pub active_link: String,
    #[serde(default)]
    pub mac: String,
    /// `DHCP` or `Static`.
    #[serde(default, rename = "type")]
    pub link_type: String,
    #[serde(default, rename = "static")]
    pub static_ip: StaticIp,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticIp {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub mask: String,
    #[serde(default)]
    pub gateway: String,
}

/// `GetNetPort` value, `NetPort` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetPort {
    #[serde(default)]
    pub http_port: u16,
    #[serde(default)]
    pub https_port: u16,
    #[serde(default)]
    pub media_port: u16,
    #[serde(default)]
    pub onvif_port: u16,
    #[serde(default)]
    pub rtmp_port: u16,
    #[serde(default = "default_rtsp_port")]
    pub rtsp_port: u16,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_rtsp_port() -> u16 {
    554
}

/// `GetRtspUrl` value, `rtspUrl` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtspUrls {
    #[serde(default)]
    pub channel: u8,
    pub main_stream: String,
    pub sub_stream: String,
}

// ── Lights / alarms ──────────────────────────────────────────────────

/// `GetIrLights` value, `IrLights` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IrLights {
    #[serde(default)]
    pub channel: u8,
    /// `Auto`, `On` or `Off`.
    pub state: String,
}

/// `GetMdState` value.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MdState {
    #[serde(deserialize_with = "int_bool")]
    pub state: bool,
}

/// `GetAiState` value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiState {
    #[serde(default)]
    pub channel: u8,
    #[serde(default)]
    pub people: Option<AiDetection>,
    #[serde(default)]
    pub vehicle: Option<AiDetection>,
    #[serde(default)]
    pub dog_cat: Option<AiDetection>,
    #[serde(default)]
    pub face: Option<AiDetection>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AiDetection {
    #[serde(default, deserialize_with = "int_bool")]
    pub alarm_state: bool,
    #[serde(default, deserialize_with = "int_bool")]
    pub support: bool,
}
