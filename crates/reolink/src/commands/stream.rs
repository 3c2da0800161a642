//! Stream commands: RTSP URL and snapshot.

use reolink_core::{Client, StreamKind};

use crate::cli::{GlobalOpts, RtspUrlArgs, SnapshotArgs, StreamArg};
use crate::error::CliError;
use crate::output;

impl From<StreamArg> for StreamKind {
    fn from(arg: StreamArg) -> Self {
        match arg {
            StreamArg::Main => StreamKind::Main,
            StreamArg::Sub => StreamKind::Sub,
        }
    }
}

pub async fn rtsp_url(client: &Client, args: RtspUrlArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let url = client
        .network()
        .get_rtsp_url(args.channel.channel, args.stream.into())
        .await?;
    let out = output::render_single(&global.output, &url, |u| vec![("URL", u.clone())], Clone::clone);
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn snapshot(client: &Client, args: SnapshotArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let image = client.snapshot(args.channel.channel).await?;
    tokio::fs::write(&args.out, &image).await?;
    if !global.quiet {
        eprintln!("Saved {} bytes to {}", image.len(), args.out.display());
    }
    Ok(())
}
