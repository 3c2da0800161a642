// Request factories for every command the crate issues.

use serde_json::{Value, json};

use crate::command::CommandRequest;
use crate::crypto::{DigestChallenge, DigestResponse};

/// Wire names of the supported commands.
pub mod cmd {
    pub const LOGIN: &str = "Login";
    pub const LOGOUT: &str = "Logout";
    pub const GET_ABILITY: &str = "GetAbility";
    pub const GET_DEV_INFO: &str = "GetDevInfo";
    pub const GET_CHANNEL_STATUS: &str = "GetChannelstatus";
    pub const GET_LOCAL_LINK: &str = "GetLocalLink";
    pub const GET_NET_PORT: &str = "GetNetPort";
    pub const GET_TIME: &str = "GetTime";
    pub const GET_RTSP_URL: &str = "GetRtspUrl";
    pub const GET_IR_LIGHTS: &str = "GetIrLights";
    pub const SET_IR_LIGHTS: &str = "SetIrLights";
    pub const GET_MD_STATE: &str = "GetMdState";
    pub const GET_AI_STATE: &str = "GetAiState";
    pub const PTZ_CTRL: &str = "PtzCtrl";
    pub const SNAP: &str = "Snap";
}

// ── Authentication ───────────────────────────────────────────────────

/// Plaintext login.
pub fn login(username: &str, password: &str) -> CommandRequest {
    CommandRequest::new(cmd::LOGIN).with_param(json!({
        "User": {
            "Version": "0",
            "userName": username,
            "password": password,
        }
    }))
}

/// Unauthenticated login probe used to solicit a digest challenge.
pub fn login_probe(username: &str) -> CommandRequest {
    CommandRequest::new(cmd::LOGIN).with_param(json!({
        "User": { "Version": "0", "userName": username }
    }))
}

/// Login answering a digest challenge.
pub fn login_digest(challenge: &DigestChallenge, digest: &DigestResponse) -> CommandRequest {
    CommandRequest::new(cmd::LOGIN).with_param(json!({
        "Digest": {
            "UserName": challenge.username,
            "Realm": challenge.realm,
            "Method": challenge.method,
            "Uri": challenge.uri,
            "Nonce": challenge.nonce,
            "Nc": challenge.nc,
            "Cnonce": challenge.cnonce,
            "Qop": challenge.qop,
            "Response": digest.response,
        }
    }))
}

pub fn logout() -> CommandRequest {
    CommandRequest::new(cmd::LOGOUT).with_param(json!({}))
}

// ── System ───────────────────────────────────────────────────────────

/// Abilities of `username`, or of the logged-in user when `None`.
pub fn get_ability(username: Option<&str>) -> CommandRequest {
    let user = match username {
        Some(name) => json!({ "userName": name }),
        None => json!({}),
    };
    CommandRequest::new(cmd::GET_ABILITY).with_param(json!({ "User": user }))
}

pub fn get_dev_info() -> CommandRequest {
    CommandRequest::new(cmd::GET_DEV_INFO)
}

pub fn get_channel_status() -> CommandRequest {
    CommandRequest::new(cmd::GET_CHANNEL_STATUS)
}

pub fn get_time() -> CommandRequest {
    CommandRequest::new(cmd::GET_TIME)
}

// ── Network ──────────────────────────────────────────────────────────

pub fn get_local_link() -> CommandRequest {
    CommandRequest::new(cmd::GET_LOCAL_LINK)
}

pub fn get_net_port() -> CommandRequest {
    CommandRequest::new(cmd::GET_NET_PORT)
}

pub fn get_rtsp_url(channel: u8) -> CommandRequest {
    CommandRequest::new(cmd::GET_RTSP_URL).with_param(json!({ "channel": channel }))
}

// ── Lights, alarms, PTZ ──────────────────────────────────────────────

pub fn get_ir_lights(channel: u8) -> CommandRequest {
    CommandRequest::new(cmd::GET_IR_LIGHTS).with_param(json!({ "channel": channel }))
}

/// `state` is the wire string: `Auto`, `On` or `Off`.
pub fn set_ir_lights(channel: u8, state: &str) -> CommandRequest {
    CommandRequest::new(cmd::SET_IR_LIGHTS).with_param(json!({
        "IrLights": { "channel": channel, "state": state }
    }))
}

pub fn get_md_state(channel: u8) -> CommandRequest {
    CommandRequest::new(cmd::GET_MD_STATE).with_param(json!({ "channel": channel }))
}

pub fn get_ai_state(channel: u8) -> CommandRequest {
    CommandRequest::new(cmd::GET_AI_STATE).with_param(json!({ "channel": channel }))
}

pub fn ptz_ctrl(channel: u8, op: &str, speed: Option<u8>) -> CommandRequest {
    let mut param = json!({ "channel": channel, "op": op });
    if let (Some(speed), Value::Object(map)) = (speed, &mut param) {
        map.insert("speed".into(), json!(speed));
    }
    CommandRequest::new(cmd::PTZ_CTRL).with_param(param)
}

/// JPEG snapshot. `rs` is a cache-busting random string.
pub fn snap(channel: u8, rs: &str) -> CommandRequest {
    CommandRequest::new(cmd::SNAP)
        .with_param(json!({ "channel": channel, "rs": rs }))
        .as_get()
        .binary()
}
