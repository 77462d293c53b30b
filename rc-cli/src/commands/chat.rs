//! Chat command - interactive support chat session.

use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use rc_core::config::ConfigHandle;
use rc_core::error::RcResult;
use rc_socket::{
    AuthBinding, AuthState, ConnectionManager, ConnectionState, InboundMessage, MessageKind,
    OutboundMessage,
};

/// A line typed by the user.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Say(&'a str),
    Private { target: &'a str, text: &'a str },
    Reconnect,
    Status,
    Help,
    Quit,
    Empty,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Say(line);
    };

    let (name, rest) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
    match name {
        "quit" | "exit" => Input::Quit,
        "reconnect" => Input::Reconnect,
        "status" => Input::Status,
        "help" => Input::Help,
        "private" | "pm" => match rest.trim().split_once(char::is_whitespace) {
            Some((target, text)) if !text.trim().is_empty() => Input::Private {
                target,
                text: text.trim(),
            },
            _ => Input::Unknown(line),
        },
        _ => Input::Unknown(line),
    }
}

fn print_message(m: &InboundMessage) {
    let time = super::short_time(&m.timestamp);
    match m.message_type {
        MessageKind::Private => println!(
            "{} {} {} {}",
            style(time).dim(),
            style(&m.sender_username).magenta().bold(),
            style("(private)").magenta(),
            m.text
        ),
        MessageKind::Text => println!(
            "{} {} {}",
            style(time).dim(),
            style(&m.sender_username).cyan().bold(),
            m.text
        ),
    }
}

fn print_state(state: ConnectionState) {
    let label = match state {
        ConnectionState::Connected => style("connected").green(),
        ConnectionState::Connecting => style("connecting").yellow(),
        ConnectionState::Disconnected => style("disconnected").dim(),
        ConnectionState::Error => style("error").red(),
    };
    println!("  {} {label}", style("*").dim());
}

fn print_help() {
    println!("  /private <user> <text>  send a private message");
    println!("  /reconnect              reconnect now");
    println!("  /status                 show connection state");
    println!("  /quit                   leave the chat");
}

/// Run the chat command.
pub async fn run(config: ConfigHandle, load_history: bool) -> RcResult<()> {
    let token = super::require_token()?;
    let cfg = config.read().await.clone();

    let manager = ConnectionManager::from_config(&cfg)?;
    let mut live = manager.subscribe();
    let mut states = manager.state_receiver();

    println!(
        "Joining support chat at {} (type /help for commands, Ctrl+C to leave)",
        manager.endpoint()
    );

    let auth = AuthState::new(Some(token));
    let binding = AuthBinding::spawn(manager.clone(), &auth);

    if load_history && cfg.chat.load_history {
        match super::create_api_client(&config).await?.chat_history().await {
            Ok(history) => {
                for m in &history {
                    print_message(m);
                }
                manager.seed_history(history).await;
            }
            Err(e) => warn!("failed to load message history: {e}"),
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            message = live.recv() => match message {
                Ok(m) => print_message(&m),
                Err(RecvError::Lagged(n)) => {
                    println!("  {} Missed {n} messages (slow consumer)", style("WARN").yellow());
                }
                Err(RecvError::Closed) => break,
            },
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                print_state(state);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_input(&line) {
                    Input::Empty => {}
                    Input::Quit => break,
                    Input::Help => print_help(),
                    Input::Status => print_state(manager.state()),
                    Input::Reconnect => manager.reconnect().await,
                    Input::Say(text) => {
                        if !manager.send(OutboundMessage::structured(text)).await {
                            println!("  {} Not connected, message not sent.", style("FAIL").red());
                        }
                    }
                    Input::Private { target, text } => {
                        if !manager.send(OutboundMessage::private(text, target)).await {
                            println!("  {} Not connected, message not sent.", style("FAIL").red());
                        }
                    }
                    Input::Unknown(raw) => {
                        println!("  {} Unknown command: {raw}", style("?").yellow());
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("\n  Leaving chat...");
    binding.stop();
    manager.disconnect().await;
    Ok(())
}
