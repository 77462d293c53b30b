//! Status command - show configuration, account and endpoint status.

use console::style;

use rc_core::config::{AppConfig, ConfigHandle};
use rc_core::error::{RcError, RcResult};
use rc_core::platform::Platform;
use rc_core::token_store::TokenStore;
use rc_socket::ChatEndpoint;

use crate::OutputFormat;

/// Run the status command.
pub async fn run(config: ConfigHandle, format: OutputFormat) -> RcResult<()> {
    let cfg = config.read().await.clone();

    let endpoint = ChatEndpoint::from_config(&cfg.server, &cfg.chat)
        .map(|ep| ep.to_string())
        .unwrap_or_else(|e| format!("invalid ({e})"));

    let token = TokenStore::default_location()?.load()?;

    // Validate the token against the backend when there is one.
    let account = match token.as_deref() {
        Some(token) => {
            let api = super::create_api_client(&config).await?;
            Some(api.profile(token).await)
        }
        None => None,
    };

    let config_path = AppConfig::default_config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    match format {
        OutputFormat::Json => {
            let mut json = serde_json::json!({
                "server_address": cfg.server.address,
                "chat_endpoint": endpoint,
                "history_path": cfg.chat.history_path,
                "max_reconnect_attempts": cfg.chat.max_reconnect_attempts,
                "platform": Platform::current().name(),
                "config_path": config_path,
                "signed_in": token.is_some(),
            });
            match &account {
                Some(Ok(user)) => json["account"] = serde_json::to_value(user)?,
                Some(Err(e)) => json["account_error"] = serde_json::json!(e.to_string()),
                None => {}
            }
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("{}", style("Backend").bold().underlined());
            println!("  Server:    {}", cfg.server.address);
            println!("  Chat:      {endpoint}");
            println!("  History:   {}", cfg.chat.history_path);
            println!(
                "  Reconnect: up to {} attempts, {}ms..{}ms backoff",
                cfg.chat.max_reconnect_attempts,
                cfg.chat.reconnect_base_delay_ms,
                cfg.chat.reconnect_max_delay_ms
            );

            println!();
            println!("{}", style("Account").bold().underlined());
            match &account {
                None => println!("  Status:    {}", style("signed out").yellow()),
                Some(Ok(user)) => println!(
                    "  Status:    {} as {}",
                    style("signed in").green(),
                    user.email
                ),
                Some(Err(RcError::AuthFailed(_))) => println!(
                    "  Status:    {} (run `recipechat login`)",
                    style("token rejected").red()
                ),
                Some(Err(e)) => println!("  Status:    {} ({e})", style("unknown").yellow()),
            }

            println!();
            println!("{}", style("Local").bold().underlined());
            println!("  Platform:  {}", Platform::current());
            println!("  Config:    {config_path}");
        }
    }
    Ok(())
}
