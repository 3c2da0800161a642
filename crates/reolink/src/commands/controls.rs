//! Per-channel controls: IR lights, motion state, PTZ.

use std::str::FromStr;

use serde::Serialize;
use strum::IntoEnumIterator;

use reolink_core::{AiState, Client, CoreError, IrState, PtzOp};

use crate::cli::{ChannelArg, GlobalOpts, IrArgs, PtzArgs};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct MotionView {
    channel: u8,
    motion: bool,
    ai: Option<AiState>,
}

/// Parse a strum enum, listing the accepted spellings on failure.
fn parse_choice<T>(field: &str, value: &str) -> Result<T, CliError>
where
    T: FromStr + IntoEnumIterator + std::fmt::Display,
{
    T::from_str(value).map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!(
            "'{value}' is not one of: {}",
            T::iter().map(|v| v.to_string().to_lowercase()).collect::<Vec<_>>().join(", ")
        ),
    })
}

pub async fn ir(client: &Client, args: IrArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let channel = args.channel.channel;
    if let Some(state) = args.state {
        let state: IrState = parse_choice("state", &state)?;
        client.set_ir_lights(channel, state).await?;
        if !global.quiet {
            eprintln!("IR lights on channel {channel} set to {state}");
        }
        return Ok(());
    }

    let lights = client.ir_lights(channel).await?;
    let out = output::render_single(
        &global.output,
        &lights,
        |l| vec![("Channel", l.channel.to_string()), ("IR lights", l.state.clone())],
        |l| l.state.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn motion(client: &Client, args: ChannelArg, global: &GlobalOpts) -> Result<(), CliError> {
    let channel = args.channel;
    let motion = client.motion_state(channel).await?;
    let ai = match client.ai_state(channel).await {
        Ok(ai) => Some(ai),
        Err(CoreError::Unsupported { .. }) => None,
        Err(e) => return Err(e.into()),
    };

    let view = MotionView { channel, motion, ai };
    let out = output::render_single(
        &global.output,
        &view,
        |v| {
            let mut fields = vec![("Channel", v.channel.to_string()), ("Motion", yes_no(v.motion))];
            if let Some(ai) = &v.ai {
                for (label, detection) in [
                    ("People", ai.people),
                    ("Vehicle", ai.vehicle),
                    ("Animal", ai.dog_cat),
                    ("Face", ai.face),
                ] {
                    if let Some(d) = detection.filter(|d| d.support) {
                        fields.push((label, yes_no(d.alarm_state)));
                    }
                }
            }
            fields
        },
        |v| yes_no(v.motion),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

fn yes_no(value: bool) -> String {
    String::from(if value { "yes" } else { "no" })
}

pub async fn ptz(client: &Client, args: PtzArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let op: PtzOp = parse_choice("op", &args.op)?;
    client
        .ptz_control(args.channel.channel, op, args.speed)
        .await?;
    if !global.quiet {
        eprintln!("PTZ {op} sent to channel {}", args.channel.channel);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_parse_case_insensitively() {
        let op: PtzOp = parse_choice("op", "ZOOMINC").expect("parses");
        assert_eq!(op, PtzOp::ZoomInc);
        let state: IrState = parse_choice("state", "auto").expect("parses");
        assert_eq!(state, IrState::Auto);
    }

    #[test]
    fn bad_choice_lists_options() {
        let err = parse_choice::<IrState>("state", "dim").expect_err("rejected");
        match err {
            CliError::Validation { reason, .. } => assert!(reason.ends_with("auto, on, off"), "{reason}"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
