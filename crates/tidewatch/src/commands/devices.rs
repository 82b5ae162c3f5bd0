//! Device command handlers.

use std::sync::Arc;

use tabled::Tabled;
use tidewatch_api::data_center::models::{Device, DeviceForm};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl DeviceRow {
    fn new(d: &Device, model_number: &str) -> Self {
        Self {
            id: d.id.clone(),
            serial: d.serial_number.clone(),
            name: d.device_name.clone(),
            model: d.model_number().unwrap_or(model_number).to_owned(),
            active: if d.is_active { "yes" } else { "no" }.into(),
        }
    }
}

fn model_number(ctx: &Context, d: &Device) -> String {
    d.model_number().map_or_else(
        || {
            ctx.console
                .catalog()
                .model(&d.device_model_id)
                .map(|m| m.model_number.clone())
                .unwrap_or_default()
        },
        str::to_owned,
    )
}

fn detail(d: &Device, model_number: &str) -> String {
    [
        format!("ID:          {}", d.id),
        format!("Serial:      {}", d.serial_number),
        format!("Name:        {}", d.device_name),
        format!("Model:       {model_number}"),
        format!("Description: {}", d.description.as_deref().unwrap_or("-")),
        format!("Active:      {}", d.is_active),
        format!("Created:     {}", d.created_at.as_deref().unwrap_or("-")),
        format!("Updated:     {}", d.updated_at.as_deref().unwrap_or("-")),
    ]
    .join("\n")
}

fn print_devices(ctx: &Context, devices: &[Device], global: &GlobalOpts) {
    let out = output::render_list(
        &global.output,
        devices,
        |d| DeviceRow::new(d, &model_number(ctx, d)),
        |d| d.serial_number.clone(),
    );
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List { model } => {
            ctx.console.device_models(false).await?;
            let devices: Vec<Device> = match model {
                Some(key) => {
                    let m = util::resolve_model(ctx, &key).await?;
                    m.devices.clone()
                }
                None => ctx
                    .console
                    .catalog()
                    .devices()
                    .iter()
                    .map(|d| Device::clone(d))
                    .collect(),
            };
            print_devices(ctx, &devices, global);
            Ok(())
        }

        DevicesCommand::Get { device } => {
            let d = util::resolve_device(ctx, &device).await?;
            let number = model_number(ctx, &d);
            let out = output::render_single(
                &global.output,
                &d,
                |d: &Arc<Device>| detail(d, &number),
                |d| d.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Create {
            model,
            serial,
            name,
            description,
        } => {
            let m = util::resolve_model(ctx, &model).await?;
            let form = DeviceForm {
                id: None,
                device_model_id: m.id.clone(),
                serial_number: serial,
                device_name: name,
                description,
            };
            let id = ctx.console.create_device(&form).await?;
            output::success(
                &format!("Device {} created ({id})", form.serial_number),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }

        DevicesCommand::Update {
            device,
            name,
            description,
        } => {
            let existing = util::resolve_device(ctx, &device).await?;
            let form = DeviceForm {
                id: Some(existing.id.clone()),
                device_model_id: existing.device_model_id.clone(),
                serial_number: existing.serial_number.clone(),
                device_name: name.unwrap_or_else(|| existing.device_name.clone()),
                description: description
                    .or_else(|| existing.description.clone())
                    .unwrap_or_default(),
            };
            ctx.console.update_device(&existing.id, &form).await?;
            output::success(
                &format!("Device {} updated", existing.serial_number),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }

        DevicesCommand::Delete { device } => {
            let existing = util::resolve_device(ctx, &device).await?;
            if !util::confirm(
                &format!("Delete device {}?", existing.serial_number),
                global.yes,
            )? {
                return Ok(());
            }
            ctx.console.delete_device(&existing.id).await?;
            output::success(
                &format!("Device {} deleted", existing.serial_number),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }

        DevicesCommand::Mine { model } => {
            let m = util::resolve_model(ctx, &model).await?;
            let devices = ctx.console.data_center().my_devices(&m.id).await?;
            print_devices(ctx, &devices, global);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn device(json: serde_json::Value) -> Device {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn row_prefers_embedded_model_number() {
        let d = device(serde_json::json!({
            "id": "d1", "deviceModelId": "m1", "serialNumber": "SN1",
            "deviceModel": { "id": "m1", "modelNumber": "WB-01", "modelName": "Buoy" }
        }));
        let row = DeviceRow::new(&d, "fallback");
        assert_eq!(row.model, "WB-01");
        assert_eq!(row.active, "no");
    }

    #[test]
    fn detail_marks_missing_description() {
        let d = device(serde_json::json!({
            "id": "d1", "deviceModelId": "m1", "serialNumber": "SN1", "deviceName": "north"
        }));
        let text = detail(&d, "WB-01");
        assert!(text.contains("Description: -"));
        assert!(text.contains("Model:       WB-01"));
    }
}
