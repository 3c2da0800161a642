// ── Network facet ──
//
// Link info and ports, fetched in one batch containing only what the
// cache is missing, and the RTSP URL policy built on top of them.

use std::sync::Arc;

use tracing::debug;

use reolink_api::command::requests::{self, cmd};
use reolink_api::command::{self, CommandRequest};
use reolink_api::models::{LocalLink, NetPort, RtspUrls};

use crate::cache::DerivedCache;
use crate::error::CoreError;
use crate::model::StreamKind;
use crate::session::Session;
use crate::system::System;

const DEFAULT_RTSP_PORT: u16 = 554;

pub struct Network {
    session: Arc<Session>,
    cache: Arc<DerivedCache>,
    system: Arc<System>,
}

impl Network {
    pub fn new(session: Arc<Session>, cache: Arc<DerivedCache>, system: Arc<System>) -> Self {
        Self {
            session,
            cache,
            system,
        }
    }

    pub async fn local_link(&self) -> Result<LocalLink, CoreError> {
        Ok(self.ensure(true, false).await?.0.unwrap_or_default())
    }

    pub async fn net_port(&self) -> Result<NetPort, CoreError> {
        Ok(self.ensure(false, true).await?.1.unwrap_or_default())
    }

    /// Both link info and ports, in at most one round trip.
    pub async fn link_and_ports(&self) -> Result<(LocalLink, NetPort), CoreError> {
        let (link, ports) = self.ensure(true, true).await?;
        Ok((link.unwrap_or_default(), ports.unwrap_or_default()))
    }

    /// Return the requested fields, batching a fetch for the missing ones.
    async fn ensure(
        &self,
        want_link: bool,
        want_ports: bool,
    ) -> Result<(Option<LocalLink>, Option<NetPort>), CoreError> {
        let mut link = want_link.then(|| self.cache.local_link()).flatten();
        let mut ports = want_ports.then(|| self.cache.net_port()).flatten();

        let mut batch: Vec<CommandRequest> = Vec::new();
        if want_link && link.is_none() {
            batch.push(requests::get_local_link());
        }
        if want_ports && ports.is_none() {
            batch.push(requests::get_net_port());
        }
        if batch.is_empty() {
            return Ok((link, ports));
        }

        debug!(commands = batch.len(), "fetching network state");
        let responses = self.session.execute(&batch).await?;
        if want_link && link.is_none() {
            let value = command::take_value(&responses, 0, cmd::GET_LOCAL_LINK)?;
            let fetched: LocalLink = command::parse_value(&value, Some("LocalLink"))?;
            self.cache.set_local_link(fetched.clone());
            link = Some(fetched);
        }
        if want_ports && ports.is_none() {
            let value = command::take_value(&responses, batch.len() - 1, cmd::GET_NET_PORT)?;
            let fetched: NetPort = command::parse_value(&value, Some("NetPort"))?;
            self.cache.set_net_port(fetched.clone());
            ports = Some(fetched);
        }
        Ok((link, ports))
    }

    /// RTSP URL for `channel`.
    ///
    /// Legacy devices never get a `GetRtspUrl` call. Others try it once per
    /// session; if it fails, the URL is synthesized from link and port
    /// info from then on.
    pub async fn get_rtsp_url(&self, channel: u8, stream: StreamKind) -> Result<String, CoreError> {
        self.system.check_channel(channel)?;

        if !self.cache.no_get_rtsp() {
            if self.system.abilities(None).await?.is_legacy() {
                debug!("legacy device; skipping GetRtspUrl");
                self.cache.set_no_get_rtsp();
            } else if let Some(url) = self.fetch_rtsp_url(channel, stream).await? {
                return Ok(url);
            }
        }

        let (link, ports) = self.link_and_ports().await?;
        Ok(synthesize_rtsp_url(&link.static_ip.ip, ports.rtsp_port, channel, stream))
    }

    async fn fetch_rtsp_url(&self, channel: u8, stream: StreamKind) -> Result<Option<String>, CoreError> {
        let responses = self.session.execute(&[requests::get_rtsp_url(channel)]).await?;
        let urls = command::take_value(&responses, 0, cmd::GET_RTSP_URL)
            .and_then(|value| command::parse_value::<RtspUrls>(&value, Some("rtspUrl")));
        match urls {
            Ok(urls) => Ok(Some(match stream {
                StreamKind::Main => urls.main_stream,
                StreamKind::Sub => urls.sub_stream,
            })),
            Err(e) => {
                debug!(error = %e, "GetRtspUrl unusable; synthesizing from now on");
                self.cache.set_no_get_rtsp();
                Ok(None)
            }
        }
    }
}

/// `rtsp://<ip>[:<port>]/h264Preview_<NN>_<stream>`, port omitted when 554.
pub fn synthesize_rtsp_url(ip: &str, port: u16, channel: u8, stream: StreamKind) -> String {
    let host = if port == DEFAULT_RTSP_PORT || port == 0 {
        ip.to_owned()
    } else {
        format!("{ip}:{port}")
    };
    format!(
        "rtsp://{host}/h264Preview_{:02}_{stream}",
        u16::from(channel) + 1
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_url_shape() {
        assert_eq!(
            synthesize_rtsp_url("10.0.0.5", 554, 0, StreamKind::Main),
            "rtsp://10.0.0.5/h264Preview_01_main"
        );
        assert_eq!(
            synthesize_rtsp_url("10.0.0.5", 8554, 11, StreamKind::Sub),
            "rtsp://10.0.0.5:8554/h264Preview_12_sub"
        );
    }
}
