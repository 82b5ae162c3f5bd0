//! Device model command handlers.

use std::sync::Arc;

use tabled::Tabled;
use tidewatch_api::data_center::models::{DeviceModel, DeviceModelForm};
use tidewatch_core::store::SerialOption;

use crate::cli::{GlobalOpts, ModelFormArgs, ModelsArgs, ModelsCommand};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Number")]
    number: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Devices")]
    devices: usize,
    #[tabled(rename = "Bucket")]
    bucket: String,
}

impl From<&Arc<DeviceModel>> for ModelRow {
    fn from(m: &Arc<DeviceModel>) -> Self {
        Self {
            id: m.id.clone(),
            number: m.model_number.clone(),
            name: m.model_name.clone(),
            devices: m.devices.len(),
            bucket: m
                .bucket_maps
                .as_ref()
                .map(|b| b.bucket_name.clone())
                .unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct SerialRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Serial")]
    label: String,
}

fn detail(m: &Arc<DeviceModel>) -> String {
    let mut lines = vec![
        format!("ID:          {}", m.id),
        format!("Number:      {}", m.model_number),
        format!("Name:        {}", m.model_name),
        format!("Description: {}", m.description.as_deref().unwrap_or("-")),
        format!(
            "Bucket:      {}",
            m.bucket_maps.as_ref().map_or("-", |b| b.bucket_name.as_str())
        ),
        format!("Created:     {}", m.created_at.as_deref().unwrap_or("-")),
        format!("Devices:     {}", m.devices.len()),
    ];
    for d in &m.devices {
        lines.push(format!("  {}  {}", d.serial_number, d.device_name));
    }
    lines.join("\n")
}

fn to_form(id: Option<String>, args: ModelFormArgs) -> DeviceModelForm {
    DeviceModelForm {
        id,
        model_number: args.number,
        model_name: args.name,
        description: args.description,
        bucket_name: args.bucket.filter(|b| !b.is_empty()),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: ModelsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ModelsCommand::List { refresh } => {
            let models = ctx.console.device_models(refresh).await?;
            let out = output::render_list(
                &global.output,
                models.as_slice(),
                |m| ModelRow::from(m),
                |m| m.model_number.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ModelsCommand::Get { model } => {
            let m = util::resolve_model(ctx, &model).await?;
            let out = output::render_single(&global.output, &m, detail, |m| m.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ModelsCommand::Create(form) => {
            let number = form.number.clone();
            ctx.console
                .create_device_model(&to_form(None, form))
                .await?;
            output::success(&format!("Model {number} created"), ctx.color, global.quiet);
            Ok(())
        }

        ModelsCommand::Update { model, form } => {
            let existing = util::resolve_model(ctx, &model).await?;
            ctx.console
                .update_device_model(&existing.id, &to_form(Some(existing.id.clone()), form))
                .await?;
            output::success(
                &format!("Model {} updated", existing.model_number),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }

        ModelsCommand::Delete { model } => {
            let existing = util::resolve_model(ctx, &model).await?;
            if !util::confirm(
                &format!(
                    "Delete model {} and its {} device(s)?",
                    existing.model_number,
                    existing.devices.len()
                ),
                global.yes,
            )? {
                return Ok(());
            }
            ctx.console.delete_device_model(&existing.id).await?;
            output::success(
                &format!("Model {} deleted", existing.model_number),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }

        ModelsCommand::Serials { model } => {
            let m = util::resolve_model(ctx, &model).await?;
            let options = ctx.console.catalog().serial_number_options(&m.id);
            let out = output::render_list(
                &global.output,
                &options,
                |o: &SerialOption| SerialRow {
                    id: o.id.clone(),
                    label: o.label.clone(),
                },
                |o| o.label.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_bucket_is_not_sent() {
        let form = to_form(
            None,
            ModelFormArgs {
                number: "WB-01".into(),
                name: "Weather buoy".into(),
                description: String::new(),
                bucket: Some(String::new()),
            },
        );
        assert_eq!(form.bucket_name, None);
        assert_eq!(form.model_number, "WB-01");
    }
}
