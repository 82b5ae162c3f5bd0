//! Command dispatch: bridges CLI args -> console calls -> output formatting.

pub mod access;
pub mod config_cmd;
pub mod data;
pub mod device_commands;
pub mod devices;
pub mod export;
pub mod firmware;
pub mod menus;
pub mod models;
pub mod permissions;
pub mod properties;
pub mod roles;
pub mod session;
pub mod users;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::context::Context;
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => return session::login(ctx, args, global).await,
        Command::Logout => return session::logout(ctx, global),
        _ => util::ready(ctx).await?,
    }

    match cmd {
        Command::Whoami => session::whoami(ctx, global).await,
        Command::Models(args) => models::handle(ctx, args, global).await,
        Command::Devices(args) => devices::handle(ctx, args, global).await,
        Command::Firmware(args) => firmware::handle(ctx, args, global).await,
        Command::Data(args) => data::handle(ctx, args, global).await,
        Command::Watch(args) => watch::handle(ctx, args, global).await,
        Command::Users(args) => users::handle(ctx, args, global).await,
        Command::Roles(args) => roles::handle(ctx, args, global).await,
        Command::Menus(args) => menus::handle(ctx, args, global).await,
        Command::Permissions(args) => permissions::handle(ctx, args, global).await,
        Command::Commands(args) => device_commands::handle(ctx, args, global).await,
        Command::Properties(args) => properties::handle(ctx, args, global).await,
        Command::Access(args) => access::handle(ctx, args, global).await,
        Command::Export(args) => export::handle(ctx, args, global).await,
        // Handled above or before dispatch
        Command::Login(_) | Command::Logout | Command::Config(_) | Command::Completions(_) => {
            Ok(())
        }
    }
}
