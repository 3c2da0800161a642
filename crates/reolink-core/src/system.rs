// ── System facet ──
//
// Abilities, device info, channel status and device time. Abilities and
// device info are cached for the session; `get_time` always refetches
// while `get_time_info` serves the last reading.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use reolink_api::command::requests::{self, cmd};
use reolink_api::models::{Abilities, ChannelStatusList, DevInfo, TimeValue};

use crate::cache::{DerivedCache, DeviceTime};
use crate::error::CoreError;
use crate::session::Session;
use crate::timezone::DeviceTimezone;

pub struct System {
    session: Arc<Session>,
    cache: Arc<DerivedCache>,
}

impl System {
    pub fn new(session: Arc<Session>, cache: Arc<DerivedCache>) -> Self {
        Self { session, cache }
    }

    /// Abilities of `username`, or of the configured user when `None`.
    pub async fn abilities(&self, username: Option<&str>) -> Result<Arc<Abilities>, CoreError> {
        if let Some(abilities) = self.cache.abilities(username) {
            return Ok(abilities);
        }

        let user = username.or_else(|| self.session.username());
        let abilities: Abilities = self
            .session
            .fetch(requests::get_ability(user), Some("Ability"))
            .await?;
        let abilities = Arc::new(abilities);
        self.cache.set_abilities(username, Arc::clone(&abilities));
        debug!(legacy = abilities.is_legacy(), "abilities cached");
        Ok(abilities)
    }

    /// Fetch device info and refresh the cached copy.
    pub async fn device_info(&self) -> Result<DevInfo, CoreError> {
        let info: DevInfo = self
            .session
            .fetch(requests::get_dev_info(), Some("DevInfo"))
            .await?;
        self.cache.set_dev_info(info.clone());
        Ok(info)
    }

    /// Reject `channel` when cached device info says it does not exist.
    pub fn check_channel(&self, channel: u8) -> Result<(), CoreError> {
        match self.cache.dev_info() {
            Some(info) if info.channel_num > 0 && channel >= info.channel_num => {
                Err(CoreError::InvalidChannel {
                    channel,
                    available: info.channel_num,
                })
            }
            _ => Ok(()),
        }
    }

    /// Per-channel online status (NVRs).
    pub async fn channel_status(&self) -> Result<ChannelStatusList, CoreError> {
        let list: ChannelStatusList = self
            .session
            .fetch(requests::get_channel_status(), None)
            .await?;
        if list.count != list.status.len() {
            warn!(
                count = list.count,
                entries = list.status.len(),
                "{} count does not match its entries",
                cmd::GET_CHANNEL_STATUS
            );
        }
        Ok(list)
    }

    /// Read the device clock, bypassing the cache.
    pub async fn get_time(&self) -> Result<DeviceTime, CoreError> {
        let value: TimeValue = self.session.fetch(requests::get_time(), None).await?;
        let time = device_time(&value)?;
        self.cache.set_device_time(time.clone());
        Ok(time)
    }

    /// Last device clock reading, fetching one if none is cached.
    pub async fn get_time_info(&self) -> Result<DeviceTime, CoreError> {
        match self.cache.device_time() {
            Some(time) => Ok(time),
            None => self.get_time().await,
        }
    }
}

fn device_time(value: &TimeValue) -> Result<DeviceTime, CoreError> {
    let clock = &value.time;
    let timezone = DeviceTimezone::new(clock.time_zone, value.dst.clone())?;
    let local = NaiveDate::from_ymd_opt(clock.year, clock.mon, clock.day)
        .and_then(|date| date.and_hms_opt(clock.hour, clock.min, clock.sec))
        .ok_or_else(|| CoreError::InvalidResponse {
            message: format!(
                "camera reported an invalid date {}-{}-{} {}:{}:{}",
                clock.year, clock.mon, clock.day, clock.hour, clock.min, clock.sec
            ),
        })?;
    let time = timezone.localize(local)?;
    Ok(DeviceTime {
        time,
        timezone: Arc::new(timezone),
    })
}
