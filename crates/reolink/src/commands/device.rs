//! Device-level read commands: info, abilities, channels, time, network.

use chrono::Datelike;
use serde::Serialize;
use tabled::Tabled;

use reolink_core::{AbilityValue, ChannelStatus, Client, LocalLink, NetPort};

use crate::cli::{AbilitiesArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct AbilityRow {
    #[tabled(rename = "Ability")]
    name: String,
    #[tabled(rename = "Ver")]
    ver: i64,
    #[tabled(rename = "Permit")]
    permit: u32,
}

#[derive(Tabled)]
struct ChannelRow {
    #[tabled(rename = "Channel")]
    channel: u8,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Type")]
    type_info: String,
}

impl From<&ChannelStatus> for ChannelRow {
    fn from(c: &ChannelStatus) -> Self {
        Self {
            channel: c.channel,
            name: c.name.clone(),
            online: if c.online { "yes" } else { "no" }.into(),
            type_info: c.type_info.clone(),
        }
    }
}

#[derive(Serialize)]
struct AbilityEntry {
    name: String,
    #[serde(flatten)]
    value: AbilityValue,
}

#[derive(Serialize)]
struct TimeView {
    time: String,
    utc_offset: String,
    dst_enabled: bool,
    in_dst: bool,
    dst_start: Option<String>,
    dst_end: Option<String>,
}

#[derive(Serialize)]
struct NetworkView {
    link: LocalLink,
    ports: NetPort,
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn info(client: &Client, global: &GlobalOpts) -> Result<(), CliError> {
    let info = client.system().device_info().await?;
    let out = output::render_single(
        &global.output,
        &info,
        |d| {
            vec![
                ("Name", d.name.clone()),
                ("Model", d.model.clone()),
                ("Type", d.device_type.clone()),
                ("Firmware", d.firm_ver.clone()),
                ("Hardware", d.hard_ver.clone()),
                ("Serial", d.serial.clone()),
                ("Channels", d.channel_num.to_string()),
            ]
        },
        |d| d.model.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn abilities(client: &Client, args: AbilitiesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let abilities = client.system().abilities(args.user.as_deref()).await?;

    let mut entries: Vec<AbilityEntry> = abilities
        .schedule_version
        .map(|value| AbilityEntry {
            name: "scheduleVersion".into(),
            value,
        })
        .into_iter()
        .collect();
    entries.extend(abilities.extra.keys().filter_map(|name| {
        abilities.get(name).map(|value| AbilityEntry {
            name: name.clone(),
            value,
        })
    }));

    let out = output::render_list(
        &global.output,
        &entries,
        |e| AbilityRow {
            name: e.name.clone(),
            ver: e.value.ver,
            permit: e.value.permit,
        },
        |e| e.name.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn channels(client: &Client, global: &GlobalOpts) -> Result<(), CliError> {
    let list = client.system().channel_status().await?;
    let out = output::render_list(
        &global.output,
        &list.status,
        |c| ChannelRow::from(c),
        |c| c.channel.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn time(client: &Client, global: &GlobalOpts) -> Result<(), CliError> {
    let device_time = client.device_time().await?;
    let local = device_time.time.naive_local();
    let window = device_time.timezone.dst_window(local.year());

    let view = TimeView {
        time: device_time.time.to_rfc3339(),
        utc_offset: device_time.time.offset().to_string(),
        dst_enabled: device_time.timezone.has_dst(),
        in_dst: device_time.timezone.is_dst(local),
        dst_start: window.map(|w| w.start.to_string()),
        dst_end: window.map(|w| w.end.to_string()),
    };
    let out = output::render_single(
        &global.output,
        &view,
        |v| {
            let mut fields = vec![("Time", v.time.clone()), ("UTC offset", v.utc_offset.clone())];
            if v.dst_enabled {
                fields.push(("In DST", if v.in_dst { "yes" } else { "no" }.into()));
                fields.push(("DST start", v.dst_start.clone().unwrap_or_else(|| "-".into())));
                fields.push(("DST end", v.dst_end.clone().unwrap_or_else(|| "-".into())));
            }
            fields
        },
        |v| v.time.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn network(client: &Client, global: &GlobalOpts) -> Result<(), CliError> {
    let (link, ports) = client.network().link_and_ports().await?;
    let view = NetworkView { link, ports };
    let out = output::render_single(
        &global.output,
        &view,
        |v| {
            vec![
                ("Link", v.link.active_link.clone()),
                ("Mode", v.link.link_type.clone()),
                ("MAC", v.link.mac.clone()),
                ("IP", v.link.static_ip.ip.clone()),
                ("Netmask", v.link.static_ip.mask.clone()),
                ("Gateway", v.link.static_ip.gateway.clone()),
                ("HTTP", v.ports.http_port.to_string()),
                ("HTTPS", v.ports.https_port.to_string()),
                ("Media", v.ports.media_port.to_string()),
                ("RTSP", v.ports.rtsp_port.to_string()),
                ("RTMP", v.ports.rtmp_port.to_string()),
                ("ONVIF", v.ports.onvif_port.to_string()),
            ]
        },
        |v| v.link.static_ip.ip.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
