//! Role administration handlers.

use tabled::Tabled;
use tidewatch_api::auth_center::models::{Role, RoleForm};

use crate::cli::{GlobalOpts, RolesArgs, RolesCommand};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct RoleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Level")]
    level: i32,
    #[tabled(rename = "Active")]
    active: bool,
    #[tabled(rename = "System")]
    system: bool,
}

impl From<&Role> for RoleRow {
    fn from(r: &Role) -> Self {
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
            code: r.code.clone(),
            level: r.level,
            active: r.is_active,
            system: r.is_system,
        }
    }
}

fn print_ids(ids: &[String], global: &GlobalOpts) {
    let out = output::render_single(
        &global.output,
        ids,
        |ids| ids.join("\n"),
        |ids| ids.join("\n"),
    );
    output::print_output(&out, global.quiet);
}

pub async fn handle(ctx: &Context, args: RolesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let auth = ctx.console.auth_center();

    match args.command {
        RolesCommand::List => {
            let page = auth.list_roles().await?;
            let out = output::render_list(
                &global.output,
                &page.items,
                |r| RoleRow::from(r),
                |r| r.code.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RolesCommand::Create { from_file } => {
            let form: RoleForm = util::read_json_file(&from_file)?;
            auth.create_role(&form).await?;
            output::success(
                &format!("Role {} created", form.name),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }

        RolesCommand::Update { id, from_file } => {
            let mut form: RoleForm = util::read_json_file(&from_file)?;
            form.id = Some(id.clone());
            auth.update_role(&id, &form).await?;
            output::success(&format!("Role {id} updated"), ctx.color, global.quiet);
            Ok(())
        }

        RolesCommand::Delete { id } => {
            if !util::confirm(&format!("Delete role {id}?"), global.yes)? {
                return Ok(());
            }
            auth.delete_role(&id).await?;
            output::success(&format!("Role {id} deleted"), ctx.color, global.quiet);
            Ok(())
        }

        RolesCommand::Menus { id } => {
            print_ids(&auth.role_menu_ids(&id).await?, global);
            Ok(())
        }

        RolesCommand::AssignMenus { id, menu_ids } => {
            auth.assign_role_menus(&id, &menu_ids).await?;
            output::success(
                &format!("Role {id} now grants {} menu(s)", menu_ids.len()),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }

        RolesCommand::Permissions { id } => {
            print_ids(&auth.role_permission_ids(&id).await?, global);
            Ok(())
        }

        RolesCommand::AssignPermissions { id, permission_ids } => {
            auth.assign_role_permissions(&id, &permission_ids).await?;
            output::success(
                &format!("Role {id} now grants {} permission(s)", permission_ids.len()),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }
    }
}
