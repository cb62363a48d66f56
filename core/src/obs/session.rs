//! Connection to the OBS event source
//!
//! Connects, runs the v4 auth handshake, then hands the socket to a
//! read-loop task that delivers events to registered handlers in
//! arrival order. Handlers are synchronous and must not block: a
//! handler that wants to do slow work spawns its own task, so one
//! slow dispatch never delays the next inbound notification.

use std::collections::HashMap;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{BridgeError, Result};
use crate::obs::protocol::{self, AuthRequired, RequestStatus};

const TARGET: &str = "OBS";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Callback invoked once per matching inbound notification, with the
/// raw event payload. Exactly one handler per update-type.
pub type EventHandler = Box<dyn Fn(Value) + Send>;

pub struct ObsSession {
    ws: WsStream,
    handlers: HashMap<String, EventHandler>,
}

impl std::fmt::Debug for ObsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObsSession").finish_non_exhaustive()
    }
}

impl ObsSession {
    /// Open the websocket and authenticate if the server demands it.
    /// Unreachable OBS is fatal to startup; no retry at this layer.
    pub async fn connect(address: &str, port: u16, password: Option<&str>) -> Result<Self> {
        let url = format!("ws://{address}:{port}");
        log::info!(
            "Connecting to OBS at {address}:{port} (password={})...",
            password.is_some()
        );
        let (ws, _) = connect_async(&url).await.map_err(|e| {
            log::error!("Failed to connect to OBS. Is OBS running and WebSocket 4.x enabled?");
            BridgeError::Connection {
                target: TARGET,
                address: format!("{address}:{port}"),
                source: e,
            }
        })?;

        let mut session = Self {
            ws,
            handlers: HashMap::new(),
        };
        session.handshake(password).await?;
        log::info!("Successfully connected to OBS.");
        Ok(session)
    }

    async fn handshake(&mut self, password: Option<&str>) -> Result<()> {
        let response = self
            .exchange("1", protocol::auth_required_request("1"))
            .await?;
        let auth: AuthRequired =
            serde_json::from_value(response).map_err(|e| BridgeError::Protocol {
                target: TARGET,
                message: format!("bad GetAuthRequired response: {e}"),
            })?;
        if !auth.auth_required {
            return Ok(());
        }

        let (salt, challenge) = match (&auth.salt, &auth.challenge) {
            (Some(salt), Some(challenge)) => (salt, challenge),
            _ => {
                return Err(BridgeError::Protocol {
                    target: TARGET,
                    message: "auth required but salt/challenge missing".to_string(),
                })
            }
        };
        let auth_token = protocol::auth_response(password.unwrap_or(""), salt, challenge);

        let response = self
            .exchange("2", protocol::authenticate_request("2", &auth_token))
            .await?;
        let status: RequestStatus =
            serde_json::from_value(response).map_err(|e| BridgeError::Protocol {
                target: TARGET,
                message: format!("bad Authenticate response: {e}"),
            })?;
        if !status.is_ok() {
            return Err(BridgeError::Authentication {
                target: TARGET,
                reason: status.error_message(),
            });
        }
        Ok(())
    }

    /// One request/response pair, skipping any events that arrive in
    /// between.
    async fn exchange(&mut self, message_id: &str, request: Value) -> Result<Value> {
        self.ws
            .send(Message::Text(request.to_string()))
            .await
            .map_err(|_| BridgeError::SessionClosed { target: TARGET })?;

        while let Some(frame) = self.ws.next().await {
            let frame = frame.map_err(|_| BridgeError::SessionClosed { target: TARGET })?;
            match frame {
                Message::Text(text) => {
                    let value: Value = match serde_json::from_str(&text) {
                        Ok(value) => value,
                        Err(e) => {
                            log::debug!("Skipping unparseable OBS frame: {e}");
                            continue;
                        }
                    };
                    if value["message-id"].as_str() == Some(message_id) {
                        return Ok(value);
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        Err(BridgeError::SessionClosed { target: TARGET })
    }

    /// Register the handler for one event kind. Registering the same
    /// kind again replaces the previous handler.
    pub fn register_handler(&mut self, update_type: &str, handler: EventHandler) {
        self.handlers.insert(update_type.to_string(), handler);
    }

    /// Consume the session and start delivering events. Returns the
    /// handle used to disconnect on shutdown.
    pub fn start(self) -> ObsHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(event_loop(self.ws, self.handlers, shutdown_rx));
        ObsHandle { shutdown_tx, task }
    }
}

/// Handle to the running event loop
pub struct ObsHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ObsHandle {
    /// Close the connection and wait for the read loop to wind down.
    pub async fn disconnect(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}

async fn event_loop(
    mut ws: WsStream,
    handlers: HashMap<String, EventHandler>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                let _ = ws.close(None).await;
                break;
            }
            frame = ws.next() => {
                let frame = match frame {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        log::error!("OBS connection error: {e}");
                        break;
                    }
                    None => {
                        log::warn!("OBS closed the connection.");
                        break;
                    }
                };
                match frame {
                    Message::Text(text) => {
                        let event: Value = match serde_json::from_str(&text) {
                            Ok(event) => event,
                            Err(e) => {
                                log::debug!("Skipping unparseable OBS frame: {e}");
                                continue;
                            }
                        };
                        let Some(update_type) = event["update-type"].as_str().map(str::to_string)
                        else {
                            continue;
                        };
                        if let Some(handler) = handlers.get(&update_type) {
                            handler(event);
                        }
                    }
                    Message::Close(_) => {
                        log::warn!("OBS closed the connection.");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs::protocol::{TransitionEvent, TRANSITION_BEGIN};
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio_tungstenite::accept_async;

    type ServerWs = WebSocketStream<TcpStream>;

    async fn listen() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    async fn accept(listener: &TcpListener) -> ServerWs {
        let (stream, _) = listener.accept().await.unwrap();
        accept_async(stream).await.unwrap()
    }

    async fn recv_json(ws: &mut ServerWs) -> Value {
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                _ => continue,
            }
        }
    }

    async fn send_json(ws: &mut ServerWs, value: Value) {
        ws.send(Message::Text(value.to_string())).await.unwrap();
    }

    /// Runs the handshake with auth disabled, then hands back the
    /// server end for event pushing.
    async fn accept_no_auth(listener: &TcpListener) -> ServerWs {
        let mut ws = accept(listener).await;
        let req = recv_json(&mut ws).await;
        assert_eq!(req["request-type"], "GetAuthRequired");
        let message_id = req["message-id"].clone();
        send_json(
            &mut ws,
            json!({ "message-id": message_id, "status": "ok", "authRequired": false }),
        )
        .await;
        ws
    }

    #[tokio::test]
    async fn test_handshake_with_auth() {
        let (listener, port) = listen().await;

        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;

            let req = recv_json(&mut ws).await;
            assert_eq!(req["request-type"], "GetAuthRequired");
            send_json(
                &mut ws,
                json!({
                    "message-id": req["message-id"],
                    "status": "ok",
                    "authRequired": true,
                    "salt": "salty",
                    "challenge": "challenge123",
                }),
            )
            .await;

            let req = recv_json(&mut ws).await;
            assert_eq!(req["request-type"], "Authenticate");
            assert_eq!(req["auth"], "HIX6vwDBQ1lNT4AWg22rfrw066R6O4v7KY6KvWdXKh8=");
            send_json(
                &mut ws,
                json!({ "message-id": req["message-id"], "status": "ok" }),
            )
            .await;
        });

        let session = ObsSession::connect("127.0.0.1", port, Some("hunter2"))
            .await
            .unwrap();
        drop(session);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_auth_is_fatal() {
        let (listener, port) = listen().await;

        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let req = recv_json(&mut ws).await;
            send_json(
                &mut ws,
                json!({
                    "message-id": req["message-id"],
                    "status": "ok",
                    "authRequired": true,
                    "salt": "s",
                    "challenge": "c",
                }),
            )
            .await;
            let req = recv_json(&mut ws).await;
            send_json(
                &mut ws,
                json!({
                    "message-id": req["message-id"],
                    "status": "error",
                    "error": "Authentication Failed.",
                }),
            )
            .await;
        });

        let err = ObsSession::connect("127.0.0.1", port, Some("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Authentication { .. }));
        assert!(err.is_fatal());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_events_delivered_in_arrival_order() {
        let (listener, port) = listen().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_no_auth(&listener).await;
            for scene in ["Gaming", "BRB"] {
                send_json(
                    &mut ws,
                    json!({ "update-type": TRANSITION_BEGIN, "to-scene": scene, "duration": 300 }),
                )
                .await;
            }
            // An event kind nobody registered for
            send_json(
                &mut ws,
                json!({ "update-type": "SceneCollectionChanged" }),
            )
            .await;
            send_json(
                &mut ws,
                json!({ "update-type": TRANSITION_BEGIN, "to-scene": "Outro", "duration": 0 }),
            )
            .await;
            // Keep the connection open until the client disconnects
            while ws.next().await.is_some() {}
        });

        let mut session = ObsSession::connect("127.0.0.1", port, None).await.unwrap();

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<String>();
        session.register_handler(
            TRANSITION_BEGIN,
            Box::new(move |event| {
                let event: TransitionEvent = serde_json::from_value(event).unwrap();
                seen_tx.send(event.to_scene).unwrap();
            }),
        );
        let handle = session.start();

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(seen_rx.recv().await.unwrap());
        }
        assert_eq!(seen, vec!["Gaming", "BRB", "Outro"]);

        handle.disconnect().await;
        server.abort();
    }

    #[tokio::test]
    async fn test_reregistering_replaces_handler() {
        let (listener, port) = listen().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_no_auth(&listener).await;
            send_json(
                &mut ws,
                json!({ "update-type": TRANSITION_BEGIN, "to-scene": "Gaming", "duration": 1 }),
            )
            .await;
            while ws.next().await.is_some() {}
        });

        let mut session = ObsSession::connect("127.0.0.1", port, None).await.unwrap();

        let (first_tx, mut first_rx) = mpsc::unbounded_channel::<()>();
        session.register_handler(TRANSITION_BEGIN, Box::new(move |_| {
            first_tx.send(()).unwrap();
        }));

        let (second_tx, mut second_rx) = mpsc::unbounded_channel::<()>();
        session.register_handler(TRANSITION_BEGIN, Box::new(move |_| {
            second_tx.send(()).unwrap();
        }));

        let handle = session.start();
        second_rx.recv().await.unwrap();
        assert!(first_rx.try_recv().is_err());

        handle.disconnect().await;
        server.abort();
    }

    #[tokio::test]
    async fn test_connect_refused_is_a_connection_error() {
        let (listener, port) = listen().await;
        drop(listener);

        let err = ObsSession::connect("127.0.0.1", port, None).await.unwrap_err();
        assert!(matches!(err, BridgeError::Connection { .. }));
        assert!(err.is_fatal());
    }
}
