use ampbridge_control::MediaControl;
use ampbridge_transport::{AsyncLine, LineTransport};
use serde_json::json;

use crate::cmd::{parse_duration, FlavorArg, VolumeArgs};
use crate::exit::{control_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{emit, OutputFormat};

pub async fn run(args: VolumeArgs, format: OutputFormat) -> CliResult<i32> {
    if args.connect.flavor != FlavorArg::Tcp {
        return Err(CliError::new(
            USAGE,
            "volume is only available on the tcp flavor",
        ));
    }
    if let Some(level) = args.set {
        if !(0.0..=1.0).contains(&level) {
            return Err(CliError::new(USAGE, "--set takes a fraction in 0.0..=1.0"));
        }
    }
    let timeout = parse_duration(&args.connect.timeout)?;

    let transport = LineTransport::new();
    transport
        .connect(&args.connect.target)
        .await
        .map_err(|err| transport_error("connect failed", err))?;
    let control = MediaControl::new(transport.clone()).with_reply_timeout(timeout);

    let level = match args.set {
        Some(level) => control.set_volume(level).await,
        None => control.volume().await,
    }
    .map_err(|err| control_error("volume request failed", err))?;

    emit(format, json!({ "volume": level }), format!("{level:.2}"));
    transport.close().await.ok();
    Ok(SUCCESS)
}
