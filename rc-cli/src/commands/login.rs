//! Account commands - login, register, logout and whoami.

use console::style;
use dialoguer::{Input, Password};
use tracing::warn;

use rc_core::config::ConfigHandle;
use rc_core::error::{RcError, RcResult};
use rc_core::token_store::TokenStore;

use super::prompt_error;
use crate::OutputFormat;

fn prompt_email(email: Option<String>) -> RcResult<String> {
    match email {
        Some(e) => Ok(e),
        None => Input::new()
            .with_prompt("Email")
            .interact_text()
            .map_err(prompt_error),
    }
}

/// Run the login command.
pub async fn run(config: ConfigHandle, email: Option<String>) -> RcResult<()> {
    let email = prompt_email(email)?;
    let password = Password::new()
        .with_prompt("Password")
        .interact()
        .map_err(prompt_error)?;

    let api = super::create_api_client(&config).await?;
    println!("Signing in to {}...", api.base_url());

    let auth = match api.login(&email, &password).await {
        Ok(auth) => auth,
        Err(RcError::AuthFailed(_)) => {
            println!("  {} Invalid email or password.", style("FAIL").red().bold());
            return Err(RcError::AuthFailed("login rejected".into()));
        }
        Err(e) => {
            println!("  {} {e}", style("FAIL").red().bold());
            return Err(e);
        }
    };

    let store = TokenStore::default_location()?;
    store.save(&auth.access_token)?;

    match api.profile(&auth.access_token).await {
        Ok(user) => println!(
            "  {} Signed in as {} (user {}).",
            style("OK").green().bold(),
            style(&user.email).bold(),
            user.user_id
        ),
        Err(e) => {
            warn!("signed in but profile lookup failed: {e}");
            println!("  {} Signed in.", style("OK").green().bold());
        }
    }
    Ok(())
}

/// Run the register command.
pub async fn register(
    config: ConfigHandle,
    email: Option<String>,
    role: Option<i64>,
) -> RcResult<()> {
    let email = prompt_email(email)?;
    let password = Password::new()
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .map_err(prompt_error)?;

    let api = super::create_api_client(&config).await?;
    let user = api.register(&email, &password, role).await?;
    println!(
        "  {} Account {} created. Run `recipechat login` to sign in.",
        style("OK").green().bold(),
        style(&user.email).bold()
    );
    Ok(())
}

/// Run the logout command.
pub async fn logout() -> RcResult<()> {
    TokenStore::default_location()?.clear()?;
    println!("  {} Signed out.", style("OK").green().bold());
    Ok(())
}

/// Run the whoami command.
pub async fn whoami(config: ConfigHandle, format: OutputFormat) -> RcResult<()> {
    let token = super::require_token()?;
    let api = super::create_api_client(&config).await?;
    let user = api.profile(&token).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        OutputFormat::Text => {
            println!("{}", style("Account").bold().underlined());
            println!("  Email:   {}", user.email);
            println!("  User id: {}", user.user_id);
            println!("  Role:    {}", user.role_id);
            if !user.created_at.is_empty() {
                println!("  Created: {}", user.created_at);
            }
        }
    }
    Ok(())
}
