use ampbridge_control::{MediaControl, StatusControl};
use ampbridge_transport::{AsyncLine, LineTransport, WsTransport};
use serde_json::json;

use crate::cmd::{parse_duration, FlavorArg, InfoArgs};
use crate::exit::{control_error, transport_error, CliResult, SUCCESS};
use crate::output::{emit, OutputFormat};

pub async fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.connect.timeout)?;
    match args.connect.flavor {
        FlavorArg::Tcp => {
            let transport = LineTransport::new();
            transport
                .connect(&args.connect.target)
                .await
                .map_err(|err| transport_error("connect failed", err))?;
            let control = MediaControl::new(transport.clone()).with_reply_timeout(timeout);

            let version = control
                .firmware_version()
                .await
                .map_err(|err| control_error("version query failed", err))?;
            let text = format!(
                "{} ({}) firmware {version}",
                args.connect.target,
                transport.flavor()
            );
            emit(
                format,
                json!({
                    "target": args.connect.target,
                    "flavor": transport.flavor().as_str(),
                    "firmware": version.firmware,
                    "git": version.git,
                    "api": version.api,
                }),
                text,
            );
            transport.close().await.ok();
        }
        FlavorArg::Ws => {
            let transport = WsTransport::new();
            transport
                .connect(&args.connect.target)
                .await
                .map_err(|err| transport_error("connect failed", err))?;
            let control = StatusControl::new(transport.clone()).with_reply_timeout(timeout);

            let status = control
                .status()
                .await
                .map_err(|err| control_error("status query failed", err))?;
            let text = format!(
                "{} ({}) input={} state={} vol={}",
                args.connect.target,
                transport.flavor(),
                status.input,
                status.state,
                status.volume,
            );
            emit(
                format,
                json!({
                    "target": args.connect.target,
                    "flavor": transport.flavor().as_str(),
                    "status": status,
                }),
                text,
            );
            transport.close().await.ok();
        }
    }
    Ok(SUCCESS)
}
