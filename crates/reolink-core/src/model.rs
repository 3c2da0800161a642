// ── Client-facing enums ──
//
// String forms match what the camera expects on the wire, so
// `to_string()` is what goes into command params.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Which encoder stream a URL or snapshot refers to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StreamKind {
    #[default]
    Main,
    Sub,
}

/// Infrared illuminator mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum IrState {
    Auto,
    On,
    Off,
}

/// PTZ operation names as `PtzCtrl` spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum PtzOp {
    Stop,
    Left,
    Right,
    Up,
    Down,
    LeftUp,
    LeftDown,
    RightUp,
    RightDown,
    ZoomInc,
    ZoomDec,
    FocusInc,
    FocusDec,
    IrisInc,
    IrisDec,
    Auto,
    StartPatrol,
    StopPatrol,
    ToPos,
}

impl PtzOp {
    /// Operations that move the head and accept a speed.
    pub fn takes_speed(self) -> bool {
        matches!(
            self,
            Self::Left
                | Self::Right
                | Self::Up
                | Self::Down
                | Self::LeftUp
                | Self::LeftDown
                | Self::RightUp
                | Self::RightDown
        )
    }
}
