//! History command - list previously exchanged chat messages.

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};

use rc_core::config::ConfigHandle;
use rc_core::error::RcResult;
use rc_socket::MessageKind;

use crate::OutputFormat;

/// Run the history command.
pub async fn run(config: ConfigHandle, limit: Option<usize>, format: OutputFormat) -> RcResult<()> {
    let api = super::create_api_client(&config).await?;
    let mut messages = api.chat_history().await?;

    if let Some(n) = limit {
        let skip = messages.len().saturating_sub(n);
        messages = messages.split_off(skip);
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&messages)?);
        }
        OutputFormat::Text => {
            if messages.is_empty() {
                println!("No messages yet.");
                return Ok(());
            }

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(vec!["Time", "From", "Type", "Message"]);

            for m in &messages {
                let kind = match m.message_type {
                    MessageKind::Private => "private",
                    MessageKind::Text => "",
                };
                table.add_row(vec![
                    super::short_time(&m.timestamp),
                    super::truncate(&m.sender_username, 20),
                    kind.to_string(),
                    super::truncate(&m.text, 60),
                ]);
            }

            println!("{table}");
            println!("{} message(s)", messages.len());
        }
    }
    Ok(())
}
