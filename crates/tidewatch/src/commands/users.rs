//! User administration handlers.

use secrecy::{ExposeSecret, SecretString};
use tabled::Tabled;
use tidewatch_api::auth_center::models::{User, UserForm};

use crate::cli::{GlobalOpts, UsersArgs, UsersCommand};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Nickname")]
    nickname: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Admin")]
    admin: String,
    #[tabled(rename = "Active")]
    active: String,
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.into()
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            username: u.user_name.clone(),
            nickname: u.nick_name.clone().unwrap_or_default(),
            email: u.email.clone().unwrap_or_default(),
            admin: yes_no(u.is_admin),
            active: yes_no(u.is_active),
        }
    }
}

fn detail(u: &User) -> String {
    [
        format!("ID:          {}", u.id),
        format!("Username:    {}", u.user_name),
        format!("Nickname:    {}", u.nick_name.as_deref().unwrap_or("-")),
        format!("Email:       {}", u.email.as_deref().unwrap_or("-")),
        format!("Phone:       {}", u.phone_number.as_deref().unwrap_or("-")),
        format!("Description: {}", u.description.as_deref().unwrap_or("-")),
        format!("Admin:       {}", u.is_admin),
        format!("Active:      {}", u.is_active),
        format!("System:      {}", u.is_system),
        format!(
            "Roles:       {}",
            u.roles.as_deref().map_or_else(|| "-".into(), |r| r.join(", "))
        ),
    ]
    .join("\n")
}

/// Prompt twice for a new password and insist both entries match.
fn prompt_new_password() -> Result<SecretString, CliError> {
    let first = rpassword::prompt_password("New password: ").map_err(util::prompt_err)?;
    let second = rpassword::prompt_password("Repeat new password: ").map_err(util::prompt_err)?;
    if first.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "must not be empty".into(),
        });
    }
    if first != second {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "entries do not match".into(),
        });
    }
    Ok(SecretString::from(first))
}

pub async fn handle(ctx: &Context, args: UsersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let auth = ctx.console.auth_center();

    match args.command {
        UsersCommand::List => {
            let page = auth.list_users().await?;
            let out = output::render_list(
                &global.output,
                &page.items,
                |u| UserRow::from(u),
                |u| u.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UsersCommand::Get { id } => {
            let user = auth.get_user(&id).await?;
            let out = output::render_single(&global.output, &user, detail, |u| u.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UsersCommand::Create { from_file } => {
            let form: UserForm = util::read_json_file(&from_file)?;
            auth.create_user(&form).await?;
            output::success(
                &format!("User {} created", form.user_name),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }

        UsersCommand::Update { id, from_file } => {
            let mut form: UserForm = util::read_json_file(&from_file)?;
            form.id = Some(id.clone());
            auth.update_user(&id, &form).await?;
            output::success(&format!("User {id} updated"), ctx.color, global.quiet);
            Ok(())
        }

        UsersCommand::Delete { id } => {
            if !util::confirm(&format!("Delete user {id}?"), global.yes)? {
                return Ok(());
            }
            auth.delete_user(&id).await?;
            output::success(&format!("User {id} deleted"), ctx.color, global.quiet);
            Ok(())
        }

        UsersCommand::Roles { id } => {
            let role_ids = auth.user_role_ids(&id).await?;
            let out = output::render_single(
                &global.output,
                role_ids.as_slice(),
                |ids| ids.join("\n"),
                |ids| ids.join("\n"),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UsersCommand::AssignRoles { id, role_ids } => {
            auth.assign_roles(&id, &role_ids).await?;
            output::success(
                &format!("Assigned {} role(s) to user {id}", role_ids.len()),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }

        UsersCommand::ChangePassword => {
            let old = rpassword::prompt_password("Current password: ").map_err(util::prompt_err)?;
            let new = prompt_new_password()?;
            auth.change_password(&old, new.expose_secret()).await?;
            output::success("Password changed", ctx.color, global.quiet);
            Ok(())
        }

        UsersCommand::ResetPassword { id } => {
            if !util::confirm(&format!("Reset the password of user {id}?"), global.yes)? {
                return Ok(());
            }
            let new = prompt_new_password()?;
            auth.reset_password(&id, new.expose_secret()).await?;
            output::success(
                &format!("Password of user {id} reset"),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }
    }
}
