//! Queued downlink commands for a device.

use tabled::Tabled;
use tidewatch_api::data_center::models::{DeviceCommand, DeviceCommandForm};

use crate::cli::{CommandsArgs, CommandsCommand, GlobalOpts};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct CommandRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Command")]
    command: String,
    #[tabled(rename = "Parameter")]
    parameter: String,
    #[tabled(rename = "Sent")]
    sent: String,
    #[tabled(rename = "Queued")]
    created: String,
}

impl From<&DeviceCommand> for CommandRow {
    fn from(c: &DeviceCommand) -> Self {
        Self {
            id: c.id.clone(),
            command: c.command.clone(),
            parameter: c.parameter.clone().unwrap_or_default(),
            sent: match (&c.sent_time, c.is_sent_to_device) {
                (Some(at), true) => at.clone(),
                (None, true) => "yes".into(),
                (_, false) => "pending".into(),
            },
            created: c.created_at.clone().unwrap_or_default(),
        }
    }
}

pub async fn handle(ctx: &Context, args: CommandsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let data = ctx.console.data_center();

    match args.command {
        CommandsCommand::List { device } => {
            let d = util::resolve_device(ctx, &device).await?;
            let commands = data.device_commands(&d.id).await?;
            let out = output::render_list(
                &global.output,
                &commands,
                |c| CommandRow::from(c),
                |c| c.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CommandsCommand::Send {
            device,
            command,
            parameter,
        } => {
            let d = util::resolve_device(ctx, &device).await?;
            let form = DeviceCommandForm {
                device_id: d.id.clone(),
                command,
                parameter,
            };
            let id = data.create_device_command(&form).await?;
            output::success(
                &format!(
                    "Command {} queued for {} ({id})",
                    form.command, d.serial_number
                ),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }

        CommandsCommand::Delete { id } => {
            if !util::confirm(&format!("Delete queued command {id}?"), global.yes)? {
                return Ok(());
            }
            data.delete_device_command(&id).await?;
            output::success("Command deleted", ctx.color, global.quiet);
            Ok(())
        }
    }
}
