use ampbridge_control::{MediaControl, StatusControl};
use ampbridge_transport::{AsyncLine, LineTransport, WsTransport};
use serde_json::json;

use crate::cmd::{FlavorArg, WatchArgs};
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{emit_event, OutputFormat};

pub async fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    match args.connect.flavor {
        FlavorArg::Tcp => watch_tcp(args, format).await,
        FlavorArg::Ws => watch_ws(args, format).await,
    }
}

async fn watch_tcp(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let transport = LineTransport::new();
    transport
        .connect(&args.connect.target)
        .await
        .map_err(|err| transport_error("connect failed", err))?;
    let control = MediaControl::new(transport.clone());

    let mut volume = control.volume_updates();
    let mut mute = control.mute_updates();
    let mut play = control.play_state_updates();
    let mut ready = control.media_ready();
    let mut metadata = control.metadata_updates();

    let mut remaining = args.count;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(level) = volume.recv() => {
                emit_event(format, "volume", json!(level), format!("{level:.2}"));
            }
            Some(muted) = mute.recv() => {
                emit_event(format, "mute", json!(muted), muted.to_string());
            }
            Some(playing) = play.recv() => {
                emit_event(format, "playing", json!(playing), playing.to_string());
            }
            Some(()) = ready.recv() => {
                emit_event(format, "media-ready", json!(true), "media ready".to_string());
            }
            Some(meta) = metadata.recv() => {
                let text = format!("{} - {} ({})", meta.artist, meta.title, meta.album);
                emit_event(format, "metadata", json!(meta), text);
            }
            else => break,
        }
        if counted_down(&mut remaining) {
            break;
        }
    }

    transport.close().await.ok();
    Ok(SUCCESS)
}

async fn watch_ws(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let transport = WsTransport::new();
    transport
        .connect(&args.connect.target)
        .await
        .map_err(|err| transport_error("connect failed", err))?;
    let control = StatusControl::new(transport.clone());

    let mut updates = control.status_updates();
    let mut remaining = args.count;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(status) = updates.recv() => {
                let text = format!(
                    "input={} state={} vol={} {} - {}",
                    status.input, status.state, status.volume, status.artist, status.title,
                );
                emit_event(format, "status", json!(status), text);
            }
            else => break,
        }
        if counted_down(&mut remaining) {
            break;
        }
    }

    transport.close().await.ok();
    Ok(SUCCESS)
}

/// Decrement a `--count` budget; true when it hits zero.
fn counted_down(remaining: &mut Option<usize>) -> bool {
    match remaining {
        Some(0) => true, // count=0 means print nothing
        Some(count) => {
            *count -= 1;
            *count == 0
        }
        None => false,
    }
}
