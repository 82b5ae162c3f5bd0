//! Live telemetry: subscribe to one device model and print pushes as
//! they arrive until Ctrl-C or `--count` records.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use tidewatch_core::LinkStatus;

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::util;

/// Tag a pushed record with the serial number of the device that sent it.
fn tag_record(ctx: &Context, device_id: &str, payload: Value) -> Value {
    let serial = ctx
        .console
        .catalog()
        .device(device_id)
        .map_or_else(|| device_id.to_owned(), |d| d.serial_number.clone());
    match payload {
        Value::Object(mut map) => {
            map.insert("serialNumber".into(), Value::String(serial));
            Value::Object(map)
        }
        other => serde_json::json!({ "serialNumber": serial, "payload": other }),
    }
}

pub(super) fn print_record(record: &Value, decode: bool, global: &GlobalOpts) {
    // One line per record keeps the stream readable in every format.
    let format = match global.output {
        OutputFormat::Yaml => OutputFormat::Yaml,
        OutputFormat::Plain => OutputFormat::Plain,
        _ => OutputFormat::JsonCompact,
    };
    let out = output::render_records(&format, std::slice::from_ref(record), decode);
    output::print_output(&out, global.quiet);
}

pub(super) fn report_status(status: LinkStatus, color: bool, quiet: bool) {
    if status.is_disconnected {
        eprintln!("Live connection lost");
    } else if status.is_reconnecting {
        eprintln!("Reconnecting to device event hub...");
    } else {
        output::success("Live connection restored", color, quiet);
    }
}

pub async fn handle(ctx: &Context, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let model = util::resolve_model(ctx, &args.model).await?;
    let (tx, mut rx) = mpsc::unbounded_channel::<(String, Value)>();

    let subscription = ctx
        .console
        .watch_model(&model.id, move |device_id, payload| {
            // Receiver gone means we are shutting down.
            let _ = tx.send((device_id.to_owned(), payload));
        })
        .await?;

    if subscription.status().is_disconnected {
        subscription.close().await;
        return Err(CliError::ConnectionFailed {
            url: ctx.console.config().data_center_url.to_string(),
            reason: "could not subscribe to live device data".into(),
        });
    }
    output::success(
        &format!("Watching {} (Ctrl-C to stop)", model.model_number),
        ctx.color,
        global.quiet,
    );

    let mut status = subscription.watch_status();
    let mut received: u64 = 0;
    loop {
        tokio::select! {
            Some((device_id, payload)) = rx.recv() => {
                let record = tag_record(ctx, &device_id, payload);
                print_record(&record, args.decode, global);
                received += 1;
                if args.count.is_some_and(|n| received >= n) {
                    break;
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                report_status(current, ctx.color, global.quiet);
                if current.is_disconnected {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
        }
    }

    let lost = subscription.status().is_disconnected;
    subscription.close().await;
    if lost && args.count.is_some_and(|n| received < n) {
        return Err(CliError::ConnectionFailed {
            url: ctx.console.config().data_center_url.to_string(),
            reason: "live connection closed before enough records arrived".into(),
        });
    }
    Ok(())
}
