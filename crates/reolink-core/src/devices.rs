// ── Per-channel device controls ──

use bytes::Bytes;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::debug;

use reolink_api::command::requests;
use reolink_api::models::{AiState, IrLights, MdState};

use crate::client::Client;
use crate::error::CoreError;
use crate::model::{IrState, PtzOp};

const SNAP_NONCE_LEN: usize = 16;

impl Client {
    pub async fn ir_lights(&self, channel: u8) -> Result<IrLights, CoreError> {
        self.system().check_channel(channel)?;
        self.session()
            .fetch(requests::get_ir_lights(channel), Some("IrLights"))
            .await
    }

    pub async fn set_ir_lights(&self, channel: u8, state: IrState) -> Result<(), CoreError> {
        self.system().check_channel(channel)?;
        debug!(channel, %state, "setting IR lights");
        self.session()
            .run(requests::set_ir_lights(channel, &state.to_string()))
            .await
    }

    /// Whether motion is currently detected on `channel`.
    pub async fn motion_state(&self, channel: u8) -> Result<bool, CoreError> {
        self.system().check_channel(channel)?;
        let state: MdState = self
            .session()
            .fetch(requests::get_md_state(channel), None)
            .await?;
        Ok(state.state)
    }

    pub async fn ai_state(&self, channel: u8) -> Result<AiState, CoreError> {
        self.system().check_channel(channel)?;
        self.session()
            .fetch(requests::get_ai_state(channel), None)
            .await
    }

    /// Issue a PTZ command. `speed` is ignored for operations that do not
    /// move the head.
    pub async fn ptz_control(&self, channel: u8, op: PtzOp, speed: Option<u8>) -> Result<(), CoreError> {
        self.system().check_channel(channel)?;
        if let Some(speed) = speed
            && !(1..=64).contains(&speed)
        {
            return Err(CoreError::InvalidArgument {
                message: format!("PTZ speed {speed} is outside 1-64"),
            });
        }
        let speed = speed.filter(|_| op.takes_speed());
        self.session()
            .run(requests::ptz_ctrl(channel, &op.to_string(), speed))
            .await
    }

    /// JPEG snapshot of `channel`.
    pub async fn snapshot(&self, channel: u8) -> Result<Bytes, CoreError> {
        self.system().check_channel(channel)?;
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SNAP_NONCE_LEN)
            .map(char::from)
            .collect();
        let image = self
            .session()
            .execute_binary(requests::snap(channel, &nonce))
            .await?;
        debug!(channel, bytes = image.len(), "snapshot received");
        Ok(image)
    }
}
