//! Login, logout, and whoami.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use dialoguer::Input;
use secrecy::SecretString;

use tidewatch_api::auth_center::models::{Captcha, CaptchaAnswer};
use tidewatch_core::Profile;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::util;

/// Decode the captcha image, accepting a bare payload or a `data:` URI.
fn captcha_png(captcha: &Captcha) -> Result<Vec<u8>, CliError> {
    let payload = captcha
        .base64
        .split_once("base64,")
        .map_or(captcha.base64.as_str(), |(_, data)| data);
    STANDARD
        .decode(payload.trim())
        .map_err(|e| CliError::ApiError {
            code: "captcha".into(),
            message: format!("captcha image is not valid base64: {e}"),
        })
}

fn save_captcha(captcha: &Captcha, path: &Path) -> Result<(), CliError> {
    std::fs::write(path, captcha_png(captcha)?)?;
    Ok(())
}

fn profile_detail(profile: &Profile) -> String {
    [
        format!("User:  {}", profile.username),
        format!("Roles: {}", profile.roles.join(", ")),
        format!("Menus: {}", profile.menus.len()),
    ]
    .join("\n")
}

#[derive(serde::Serialize)]
struct ProfileView<'a> {
    username: &'a str,
    roles: &'a [String],
    menus: usize,
}

fn print_profile(profile: &Profile, global: &GlobalOpts) {
    let view = ProfileView {
        username: &profile.username,
        roles: &profile.roles,
        menus: profile.menus.len(),
    };
    let out = output::render_single(
        &global.output,
        &view,
        |_| profile_detail(profile),
        |v| v.username.to_owned(),
    );
    output::print_output(&out, global.quiet);
}

pub async fn login(ctx: &Context, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let configured = ctx.console.config().credentials.clone();

    // 1. Username (flag > profile > prompt)
    let username = match args
        .username
        .or_else(|| configured.as_ref().map(|c| c.username.clone()))
    {
        Some(u) => u,
        None => Input::new()
            .with_prompt("Username")
            .interact_text()
            .map_err(util::prompt_err)?,
    };

    // 2. Password (resolved for the same user, else prompt)
    let password = match configured.filter(|c| c.username == username) {
        Some(c) => c.password,
        None => SecretString::from(
            rpassword::prompt_password("Password: ").map_err(util::prompt_err)?,
        ),
    };

    // 3. Captcha
    let captcha = ctx.console.captcha().await?;
    let code = match args.code {
        Some(code) => code,
        None => {
            save_captcha(&captcha, &args.captcha_file)?;
            eprintln!("Captcha image written to {}", args.captcha_file.display());
            Input::new()
                .with_prompt("Captcha")
                .interact_text()
                .map_err(util::prompt_err)?
        }
    };
    let answer = CaptchaAnswer {
        code,
        code_id: captcha.id,
    };

    let pb = util::spinner("Signing in", global.quiet);
    let result = ctx.console.login_with(&username, &password, &answer).await;
    pb.finish_and_clear();
    let _ = std::fs::remove_file(&args.captcha_file);
    let profile = result?;

    output::success(
        &format!(
            "Signed in as {} on profile '{}'",
            profile.username, ctx.profile_name
        ),
        ctx.color,
        global.quiet,
    );
    Ok(())
}

pub fn logout(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.console.logout();
    output::success(
        &format!("Signed out of profile '{}'", ctx.profile_name),
        ctx.color,
        global.quiet,
    );
    Ok(())
}

pub async fn whoami(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let profile = ctx.console.load_profile().await?;
    print_profile(&profile, global);
    Ok(())
}
