use std::time::Duration;

use ampbridge_control::MediaControl;
use ampbridge_transport::{
    request_with_reply, AsyncLine, LineTransport, WsMessage, WsTransport,
};
use serde_json::json;

use crate::cmd::{parse_duration, FlavorArg, SendArgs};
use crate::exit::{control_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{emit, OutputFormat};

/// Grace period before closing after a fire-and-forget send, so the writer
/// loop can flush the queued frame.
const SEND_GRACE: Duration = Duration::from_millis(250);

pub async fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.connect.timeout)?;
    match args.connect.flavor {
        FlavorArg::Tcp => run_tcp(args, format, timeout).await,
        FlavorArg::Ws => run_ws(args, format, timeout).await,
    }
}

async fn run_tcp(args: SendArgs, format: OutputFormat, timeout: Duration) -> CliResult<i32> {
    let transport = LineTransport::new();
    transport
        .connect(&args.connect.target)
        .await
        .map_err(|err| transport_error("connect failed", err))?;

    if args.wait {
        let control = MediaControl::new(transport.clone()).with_reply_timeout(timeout);
        let reply = control
            .direct_command(&args.command)
            .await
            .map_err(|err| control_error("request failed", err))?;
        emit(
            format,
            json!({ "request": args.command, "reply": &reply }),
            reply.clone(),
        );
    } else {
        transport
            .send(args.command.clone())
            .await
            .map_err(|err| transport_error("send failed", err))?;
        tokio::time::sleep(SEND_GRACE).await;
    }

    transport.close().await.ok();
    Ok(SUCCESS)
}

async fn run_ws(args: SendArgs, format: OutputFormat, timeout: Duration) -> CliResult<i32> {
    let transport = WsTransport::new();
    transport
        .connect(&args.connect.target)
        .await
        .map_err(|err| transport_error("connect failed", err))?;

    if args.wait {
        let reply_key = args.reply_key.ok_or_else(|| {
            CliError::new(USAGE, "--reply-key is required with --wait on the ws flavor")
        })?;
        let reply = request_with_reply(
            &transport,
            WsMessage::Text(args.command.clone()),
            &reply_key,
            timeout,
        )
        .await
        .map_err(|err| transport_error("request failed", err))?;
        let text = String::from_utf8_lossy(&reply).into_owned();
        let value = serde_json::from_slice(&reply).unwrap_or(serde_json::Value::Null);
        emit(
            format,
            json!({ "request": args.command, "reply": value }),
            text,
        );
    } else {
        transport
            .send(WsMessage::Text(args.command.clone()))
            .await
            .map_err(|err| transport_error("send failed", err))?;
        tokio::time::sleep(SEND_GRACE).await;
    }

    transport.close().await.ok();
    Ok(SUCCESS)
}
