//! Per-user device access within a model.

use tidewatch_api::data_center::models::AssignDeviceAccess;

use crate::cli::{AccessArgs, AccessCommand, GlobalOpts};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(ctx: &Context, args: AccessArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let data = ctx.console.data_center();

    match args.command {
        AccessCommand::List { user, model } => {
            let m = util::resolve_model(ctx, &model).await?;
            let devices = data.assigned_devices(&user, &m.id).await?;
            let serials: Vec<String> = devices.into_iter().map(|d| d.serial_number).collect();
            let out = output::render_single(
                &global.output,
                serials.as_slice(),
                |s| {
                    if s.is_empty() {
                        format!("No {} devices assigned", m.model_number)
                    } else {
                        s.join("\n")
                    }
                },
                |s| s.join("\n"),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AccessCommand::Assign {
            user,
            model,
            devices,
        } => {
            let m = util::resolve_model(ctx, &model).await?;
            let mut device_ids = Vec::with_capacity(devices.len());
            for key in &devices {
                let d = util::resolve_device(ctx, key).await?;
                if d.device_model_id != m.id {
                    return Err(CliError::Validation {
                        field: "devices".into(),
                        reason: format!("{} is not a {} device", d.serial_number, m.model_number),
                    });
                }
                device_ids.push(d.id.clone());
            }
            if device_ids.is_empty()
                && !util::confirm(
                    &format!("Revoke all {} devices from user {user}?", m.model_number),
                    global.yes,
                )?
            {
                return Ok(());
            }

            let access = AssignDeviceAccess {
                device_model_id: m.id.clone(),
                device_ids,
            };
            data.assign_devices(&user, &access).await?;
            output::success(
                &format!(
                    "User {user} can now access {} {} device(s)",
                    access.device_ids.len(),
                    m.model_number
                ),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }
    }
}
