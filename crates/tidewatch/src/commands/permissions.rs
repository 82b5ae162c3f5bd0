//! Permission tree handlers.

use tabled::Tabled;
use tidewatch_api::auth_center::models::{PermissionForm, PermissionNode};

use crate::cli::{GlobalOpts, PermissionsArgs, PermissionsCommand};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct PermissionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Active")]
    active: bool,
}

fn permission_rows(nodes: &[PermissionNode]) -> Vec<PermissionRow> {
    fn walk(nodes: &[PermissionNode], depth: usize, out: &mut Vec<PermissionRow>) {
        for node in nodes {
            out.push(PermissionRow {
                id: node.id.clone(),
                name: format!("{}{}", "  ".repeat(depth), node.name),
                code: node.code.clone(),
                active: node.is_active,
            });
            walk(&node.children, depth + 1, out);
        }
    }
    let mut out = Vec::new();
    walk(nodes, 0, &mut out);
    out
}

pub async fn handle(
    ctx: &Context,
    args: PermissionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let auth = ctx.console.auth_center();

    match args.command {
        PermissionsCommand::Tree => {
            let tree = auth.permission_tree().await?;
            let out = output::render_tree(&global.output, &tree.items, permission_rows, |r| {
                r.code.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PermissionsCommand::Create { from_file } => {
            let form: PermissionForm = util::read_json_file(&from_file)?;
            auth.create_permission(&form).await?;
            output::success(
                &format!("Permission {} created", form.code),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }

        PermissionsCommand::Update { id, from_file } => {
            let form: PermissionForm = util::read_json_file(&from_file)?;
            auth.update_permission(&id, &form).await?;
            output::success(&format!("Permission {id} updated"), ctx.color, global.quiet);
            Ok(())
        }

        PermissionsCommand::Delete { id } => {
            if !util::confirm(&format!("Delete permission {id}?"), global.yes)? {
                return Ok(());
            }
            auth.delete_permission(&id).await?;
            output::success(&format!("Permission {id} deleted"), ctx.color, global.quiet);
            Ok(())
        }
    }
}
