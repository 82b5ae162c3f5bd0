//! Device property handlers.

use tabled::Tabled;
use tidewatch_api::data_center::models::{DeviceProperty, DevicePropertyForm};

use crate::cli::{GlobalOpts, PropertiesArgs, PropertiesCommand};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct PropertyRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "RO")]
    read_only: bool,
}

impl From<&DeviceProperty> for PropertyRow {
    fn from(p: &DeviceProperty) -> Self {
        Self {
            key: p.key.clone(),
            name: p.name.clone(),
            value: p.value.clone(),
            kind: p.kind.clone(),
            unit: p.unit.clone(),
            read_only: p.is_read_only,
        }
    }
}

pub async fn handle(
    ctx: &Context,
    args: PropertiesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let data = ctx.console.data_center();

    match args.command {
        PropertiesCommand::List { device } => {
            let d = util::resolve_device(ctx, &device).await?;
            let mut props = data.device_properties(&d.id).await?;
            props.sort_by_key(|p| p.order);
            let out = output::render_list(
                &global.output,
                &props,
                |p| PropertyRow::from(p),
                |p| format!("{}={}", p.key, p.value),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PropertiesCommand::Set {
            device,
            key,
            value,
            name,
            kind,
            unit,
            description,
            read_only,
            order,
            create,
        } => {
            let d = util::resolve_device(ctx, &device).await?;
            let existing = data
                .device_properties(&d.id)
                .await?
                .into_iter()
                .find(|p| p.key == key);

            match existing {
                Some(p) => {
                    if p.is_read_only {
                        return Err(CliError::Validation {
                            field: key,
                            reason: "property is read-only".into(),
                        });
                    }
                    let form = DevicePropertyForm {
                        name: name.unwrap_or(p.name),
                        value,
                        kind: p.kind,
                        unit: p.unit,
                        description: p.description,
                        is_read_only: p.is_read_only,
                        order: p.order,
                    };
                    data.update_device_property(&d.id, &key, &form).await?;
                }
                None if create => {
                    let form = DevicePropertyForm {
                        name: name.unwrap_or_else(|| key.clone()),
                        value,
                        kind,
                        unit,
                        description,
                        is_read_only: read_only,
                        order,
                    };
                    data.create_device_property(&d.id, &key, &form).await?;
                }
                None => {
                    return Err(CliError::NotFound {
                        resource_type: "property".into(),
                        identifier: key,
                        list_command: format!("properties list {device}"),
                    });
                }
            }

            output::success(
                &format!("Property {key} set on {}", d.serial_number),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }

        PropertiesCommand::Delete { device, key } => {
            let d = util::resolve_device(ctx, &device).await?;
            if !util::confirm(
                &format!("Delete property {key} from {}?", d.serial_number),
                global.yes,
            )? {
                return Ok(());
            }
            data.delete_device_property(&d.id, &key).await?;
            output::success(&format!("Property {key} deleted"), ctx.color, global.quiet);
            Ok(())
        }
    }
}
