//! Transport abstraction and the WebSocket implementation.
//!
//! A [`Connector`] opens a [`Transport`] and hands back a channel of
//! [`TransportEvent`]s, mirroring a browser WebSocket: opening is
//! asynchronous and observed through an `Open` event, writes are a
//! non-blocking handoff, and every transport ends with exactly one
//! `Closed` event unless its handle is dropped first.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use url::Url;

use rc_core::constants::close_code;
use rc_core::error::{RcError, RcResult};

/// Something that happened on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is open.
    Open,
    /// A text frame arrived.
    Frame(String),
    /// The connection is closed. Always the last event.
    Closed { code: u16, reason: String },
    /// A transport-level error. Usually followed by `Closed`.
    Error(String),
}

/// Receiving side of a transport's events.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

/// Write side of an open (or opening) transport.
pub trait Transport: Send + Sync {
    /// Hand a text frame to the transport without waiting for it to be written.
    fn send_text(&self, frame: String) -> RcResult<()>;

    /// Start closing with the given close code.
    fn close(&self, code: u16, reason: &str);
}

/// Opens transports to a URI.
pub trait Connector: Send + Sync {
    /// Begin opening a transport. Errors only for failures detectable
    /// before any I/O happens; network failures arrive as events.
    fn open(&self, uri: &Url) -> RcResult<(Box<dyn Transport>, TransportEvents)>;
}

enum Command {
    Send(String),
    Close { code: u16, reason: String },
}

/// [`Connector`] backed by `tokio-tungstenite`.
///
/// Must be used from within a tokio runtime: each transport runs on its
/// own spawned task.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(&self, uri: &Url) -> RcResult<(Box<dyn Transport>, TransportEvents)> {
        if !matches!(uri.scheme(), "ws" | "wss") {
            return Err(RcError::InvalidEndpoint(format!(
                "not a websocket uri: {}",
                uri.scheme()
            )));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(uri.to_string(), command_rx, event_tx));

        Ok((Box::new(WsTransport { commands: command_tx }), event_rx))
    }
}

struct WsTransport {
    commands: mpsc::UnboundedSender<Command>,
}

impl Transport for WsTransport {
    fn send_text(&self, frame: String) -> RcResult<()> {
        self.commands
            .send(Command::Send(frame))
            .map_err(|_| RcError::SendFailed("transport task has stopped".into()))
    }

    fn close(&self, code: u16, reason: &str) {
        let _ = self.commands.send(Command::Close {
            code,
            reason: reason.to_string(),
        });
    }
}

/// Drive one WebSocket connection until it closes or its handle is dropped.
async fn run_socket(
    uri: String,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let connecting = connect_async(uri.as_str());
    tokio::pin!(connecting);

    let stream = loop {
        tokio::select! {
            result = &mut connecting => match result {
                Ok((stream, _response)) => break stream,
                Err(e) => {
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    let _ = events.send(TransportEvent::Closed {
                        code: close_code::ABNORMAL,
                        reason: e.to_string(),
                    });
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(Command::Close { code, reason }) => {
                    let _ = events.send(TransportEvent::Closed { code, reason });
                    return;
                }
                Some(Command::Send(_)) => debug!("dropping frame written before open"),
                None => return,
            },
        }
    };

    let _ = events.send(TransportEvent::Open);
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Frame(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => {
                        let _ = events.send(TransportEvent::Frame(text));
                    }
                    Err(_) => debug!("ignoring non-utf8 binary frame ({} bytes)", data.len()),
                },
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                        .unwrap_or((close_code::NO_STATUS, String::new()));
                    let _ = events.send(TransportEvent::Closed { code, reason });
                    return;
                }
                // Ping/pong are answered by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("websocket read error: {e}");
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    let _ = events.send(TransportEvent::Closed {
                        code: close_code::ABNORMAL,
                        reason: e.to_string(),
                    });
                    return;
                }
                None => {
                    let _ = events.send(TransportEvent::Closed {
                        code: close_code::ABNORMAL,
                        reason: "stream ended".into(),
                    });
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(Command::Send(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        warn!("websocket write error: {e}");
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        let _ = events.send(TransportEvent::Closed {
                            code: close_code::ABNORMAL,
                            reason: e.to_string(),
                        });
                        return;
                    }
                }
                Some(Command::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.clone().into(),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        debug!("close frame not delivered: {e}");
                    }
                    let _ = events.send(TransportEvent::Closed { code, reason });
                    return;
                }
                None => {
                    // Handle dropped without an explicit close.
                    let _ = write.send(Message::Close(None)).await;
                    return;
                }
            },
        }
    }
}
