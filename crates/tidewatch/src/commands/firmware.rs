//! Firmware command handlers.

use tabled::Tabled;
use tidewatch_api::data_center::models::{Firmware, FirmwareUpload};

use crate::cli::{FirmwareArgs, FirmwareCommand, GlobalOpts};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct FirmwareRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Hardware")]
    hardware: String,
    #[tabled(rename = "MD5")]
    md5: String,
    #[tabled(rename = "Uploaded")]
    created: String,
}

impl From<&Firmware> for FirmwareRow {
    fn from(f: &Firmware) -> Self {
        Self {
            id: f.id.clone(),
            version: f.firmware_version.clone(),
            hardware: hardware_list(f),
            md5: f.md5.clone(),
            created: f.created_at.clone().unwrap_or_default(),
        }
    }
}

fn hardware_list(f: &Firmware) -> String {
    f.supported_hardware_versions
        .as_deref()
        .map(|v| v.join(", "))
        .unwrap_or_default()
}

fn detail(f: &Firmware) -> String {
    [
        format!("ID:          {}", f.id),
        format!("Model ID:    {}", f.device_model_id),
        format!("Version:     {}", f.firmware_version),
        format!("Description: {}", f.description.as_deref().unwrap_or("-")),
        format!("Hardware:    {}", hardware_list(f)),
        format!("MD5:         {}", f.md5),
    ]
    .join("\n")
}

pub async fn handle(ctx: &Context, args: FirmwareArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        FirmwareCommand::List { model, device } => {
            let page = match (model, device) {
                (_, Some(device)) => {
                    let d = util::resolve_device(ctx, &device).await?;
                    ctx.console.data_center().firmwares_by_device(&d.id).await?
                }
                (Some(model), None) => {
                    let m = util::resolve_model(ctx, &model).await?;
                    ctx.console.data_center().firmwares_by_model(&m.id).await?
                }
                (None, None) => {
                    return Err(CliError::Validation {
                        field: "firmware".into(),
                        reason: "pass --model or --device".into(),
                    });
                }
            };
            let out = output::render_list(
                &global.output,
                &page.items,
                |f| FirmwareRow::from(f),
                |f| f.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FirmwareCommand::Upload {
            model,
            version,
            file,
            description,
            hardware,
        } => {
            if !file.is_file() {
                return Err(CliError::Validation {
                    field: "file".into(),
                    reason: format!("{} is not a readable file", file.display()),
                });
            }
            let m = util::resolve_model(ctx, &model).await?;
            let upload = FirmwareUpload {
                file,
                device_model_id: m.id.clone(),
                firmware_version: version,
                description,
                supported_hardware_versions: hardware,
            };

            let pb = util::spinner(
                &format!("Uploading firmware {}", upload.firmware_version),
                global.quiet,
            );
            let result = ctx.console.data_center().upload_firmware(&upload).await;
            pb.finish_and_clear();
            let firmware = result?;

            output::success(
                &format!(
                    "Firmware {} uploaded for {} (md5 {})",
                    firmware.firmware_version, m.model_number, firmware.md5
                ),
                ctx.color,
                global.quiet,
            );
            let out = output::render_single(&global.output, &firmware, detail, |f| f.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FirmwareCommand::Delete { id } => {
            if !util::confirm(&format!("Delete firmware {id}?"), global.yes)? {
                return Ok(());
            }
            ctx.console.data_center().delete_firmware(&id).await?;
            output::success("Firmware deleted", ctx.color, global.quiet);
            Ok(())
        }
    }
}
