//! Authenticated session with the VTube Studio API
//!
//! The websocket is owned by a dedicated task; callers hand it
//! request envelopes over a channel and get the correlated response
//! back on a oneshot. That keeps every request/response exchange
//! atomic even when dispatch tasks call in concurrently, without any
//! locking around the socket itself.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{BridgeError, Result};
use crate::vts::protocol::{Hotkey, HotkeyCatalog, RequestEnvelope, ResponseEnvelope};
use crate::vts::token::TokenStore;

const TARGET: &str = "VTube Studio";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum Command {
    Request {
        envelope: RequestEnvelope,
        reply: oneshot::Sender<Result<ResponseEnvelope>>,
    },
    Close {
        done: oneshot::Sender<()>,
    },
}

/// Handle to the controller session. Cheap to clone; all clones share
/// the one underlying connection.
#[derive(Clone, Debug)]
pub struct VtsClient {
    tx: mpsc::Sender<Command>,
}

impl VtsClient {
    /// Open the websocket to VTube Studio. Unreachable controller is
    /// fatal to startup; no retry at this layer.
    pub async fn connect(address: &str, port: u16) -> Result<Self> {
        let url = format!("ws://{address}:{port}");
        log::info!("Connecting to VTS at {address}:{port}...");
        let (ws, _) = connect_async(&url).await.map_err(|e| {
            log::error!(
                "Failed to connect to VTube Studio API. Is VTS running and the plugin API enabled?"
            );
            BridgeError::Connection {
                target: TARGET,
                address: format!("{address}:{port}"),
                source: e,
            }
        })?;

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(session_task(ws, rx));
        Ok(Self { tx })
    }

    /// Two-step handshake: obtain (or reuse) a token, then present it
    /// for approval. A rejected approval forces one fresh token and
    /// one more attempt; a second rejection is fatal.
    ///
    /// The single retry exists because a stale persisted token is the
    /// common transient failure (VTS application data got reset).
    pub async fn authenticate(&self, store: &TokenStore) -> Result<()> {
        log::info!(
            "Authenticating with VTS... If this is the first time, you may need to \
             accept the application from VTube Studio's window."
        );

        let mut token = match store.load() {
            Some(token) => token,
            None => self.request_token(store).await?,
        };

        let mut tried_resetting_token = false;
        loop {
            if self.present_token(&token).await? {
                log::info!("Successfully connected to VTS.");
                return Ok(());
            }
            if tried_resetting_token {
                return Err(BridgeError::Authentication {
                    target: TARGET,
                    reason: "token rejected twice".to_string(),
                });
            }
            log::warn!(
                "Authentication with VTube Studio API failed, resetting token and retrying..."
            );
            token = self.request_token(store).await?;
            tried_resetting_token = true;
        }
    }

    /// Live snapshot of the model's hotkeys, keyed by name. Fetched
    /// fresh on every call; never cached.
    pub async fn hotkeys(&self) -> Result<HotkeyCatalog> {
        let response = self.request(RequestEnvelope::hotkey_list_request()).await?;
        if response.is_error() {
            return Err(BridgeError::RequestRejected {
                target: TARGET,
                message: response.error_message(),
            });
        }
        let hotkeys: Vec<Hotkey> =
            serde_json::from_value(response.data["availableHotkeys"].clone()).map_err(|e| {
                BridgeError::Protocol {
                    target: TARGET,
                    message: format!("bad hotkey list: {e}"),
                }
            })?;
        Ok(HotkeyCatalog::from_hotkeys(hotkeys))
    }

    /// Resolve `name` against a fresh catalog and fire it. Misses and
    /// controller-side rejections are logged and swallowed; in the
    /// Ready state nothing here may take the process down.
    pub async fn trigger_hotkey(&self, name: &str) {
        if let Err(e) = self.try_trigger_hotkey(name).await {
            log::warn!("Failed to trigger hotkey '{name}': {e}");
        }
    }

    async fn try_trigger_hotkey(&self, name: &str) -> Result<()> {
        let catalog = self.hotkeys().await?;
        let hotkey = match catalog.get(name) {
            Some(hotkey) => hotkey,
            None => {
                log::warn!("Hotkey '{name}' not found.");
                return Ok(());
            }
        };
        log::info!("Triggering hotkey: {}", hotkey.name);
        let response = self
            .request(RequestEnvelope::trigger_request(&hotkey.id))
            .await?;
        if response.is_error() {
            // Race with a controller-side removal between list and fire
            return Err(BridgeError::RequestRejected {
                target: TARGET,
                message: response.error_message(),
            });
        }
        Ok(())
    }

    /// Close the connection. Safe to call on every shutdown path; a
    /// session that already died is not an error.
    pub async fn close(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Close { done: done_tx }).await.is_ok() {
            let _ = done_rx.await;
        }
    }

    async fn request_token(&self, store: &TokenStore) -> Result<String> {
        let response = self.request(RequestEnvelope::token_request()).await?;
        if response.is_error() {
            return Err(BridgeError::Authentication {
                target: TARGET,
                reason: response.error_message(),
            });
        }
        let token = response.data["authenticationToken"]
            .as_str()
            .ok_or_else(|| BridgeError::Protocol {
                target: TARGET,
                message: "token response missing authenticationToken".to_string(),
            })?
            .to_string();
        store.save(&token)?;
        Ok(token)
    }

    async fn present_token(&self, token: &str) -> Result<bool> {
        let response = self
            .request(RequestEnvelope::authentication_request(token))
            .await?;
        if response.is_error() {
            return Ok(false);
        }
        Ok(response.data["authenticated"].as_bool().unwrap_or(false))
    }

    async fn request(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Request {
                envelope,
                reply: reply_tx,
            })
            .await
            .map_err(|_| BridgeError::SessionClosed { target: TARGET })?;
        reply_rx
            .await
            .map_err(|_| BridgeError::SessionClosed { target: TARGET })?
    }
}

async fn session_task(mut ws: WsStream, mut rx: mpsc::Receiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Request { envelope, reply } => {
                let outcome = exchange(&mut ws, &envelope).await;
                let _ = reply.send(outcome);
            }
            Command::Close { done } => {
                let _ = ws.close(None).await;
                let _ = done.send(());
                break;
            }
        }
    }
}

/// One atomic request/response pair on the wire. Frames that are not
/// the correlated response (stray pushes, pings) are skipped.
async fn exchange(ws: &mut WsStream, envelope: &RequestEnvelope) -> Result<ResponseEnvelope> {
    let payload = serde_json::to_string(envelope)?;
    ws.send(Message::Text(payload))
        .await
        .map_err(|_| BridgeError::SessionClosed { target: TARGET })?;

    while let Some(frame) = ws.next().await {
        let frame = frame.map_err(|_| BridgeError::SessionClosed { target: TARGET })?;
        match frame {
            Message::Text(text) => {
                let response: ResponseEnvelope = match serde_json::from_str(&text) {
                    Ok(response) => response,
                    Err(e) => {
                        log::debug!("Skipping unparseable VTS frame: {e}");
                        continue;
                    }
                };
                if response.request_id == envelope.request_id {
                    return Ok(response);
                }
                log::debug!(
                    "Skipping uncorrelated VTS message: {}",
                    response.message_type
                );
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(BridgeError::SessionClosed { target: TARGET })
}
