//! Bridge orchestrator
//!
//! Wires the OBS source session to the VTube Studio controller
//! session: connect, authenticate, fire the startup default, then
//! turn every TransitionBegin notification into a delayed hotkey
//! dispatch until shutdown.

pub mod dispatch;
pub mod resolver;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use serde_json::Value;

use crate::config::Config;
use crate::error::Result;
use crate::obs::{EventHandler, ObsSession, TransitionEvent, TRANSITION_BEGIN};
use crate::vts::{TokenStore, VtsClient};
use dispatch::{DelayPolicy, DispatchPolicy};

/// Everything the orchestrator needs, constructed once by the binary.
/// No global mutable state; components get what they need from here.
pub struct BridgeContext {
    pub config: Config,
    pub token_store: TokenStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    Connecting,
    Authenticating,
    Ready,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BridgeState::Idle => "idle",
            BridgeState::Connecting => "connecting",
            BridgeState::Authenticating => "authenticating",
            BridgeState::Ready => "ready",
            BridgeState::ShuttingDown => "shutting down",
            BridgeState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

pub struct Bridge {
    ctx: BridgeContext,
    state: BridgeState,
}

impl Bridge {
    pub fn new(ctx: BridgeContext) -> Self {
        Self {
            ctx,
            state: BridgeState::Idle,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    fn set_state(&mut self, state: BridgeState) {
        log::debug!("Bridge state: {} -> {}", self.state, state);
        self.state = state;
    }

    /// Run the bridge until `shutdown` resolves. Errors before the
    /// Ready state are fatal and propagate to the caller; once Ready,
    /// failures stay inside their dispatch task.
    ///
    /// Both sessions are released on every exit path past their
    /// creation; in-flight dispatch tasks are abandoned, not awaited.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        self.set_state(BridgeState::Connecting);
        let vts = VtsClient::connect(&self.ctx.config.vts.address, self.ctx.config.vts.port).await?;

        self.set_state(BridgeState::Authenticating);
        if let Err(e) = vts.authenticate(&self.ctx.token_store).await {
            log::error!("Failed to authenticate with VTube Studio API.");
            vts.close().await;
            return Err(e);
        }

        // Informational only; the dispatch path always fetches fresh
        match vts.hotkeys().await {
            Ok(catalog) => log::info!("Available VTS Hotkeys: {:?}", catalog.names()),
            Err(e) => log::warn!("Could not list VTS hotkeys: {e}"),
        }

        if let Some(default_hotkey) = self.ctx.config.default_hotkey.clone() {
            log::info!("Triggering default hotkey");
            vts.trigger_hotkey(&default_hotkey).await;
        }

        let mut obs = match ObsSession::connect(
            &self.ctx.config.obs.address,
            self.ctx.config.obs.port,
            self.ctx.config.obs.password.as_deref(),
        )
        .await
        {
            Ok(obs) => obs,
            Err(e) => {
                vts.close().await;
                return Err(e);
            }
        };

        obs.register_handler(
            TRANSITION_BEGIN,
            transition_handler(vts.clone(), &self.ctx.config),
        );
        let obs_handle = obs.start();

        self.set_state(BridgeState::Ready);
        shutdown.await;

        self.set_state(BridgeState::ShuttingDown);
        vts.close().await;
        obs_handle.disconnect().await;
        self.set_state(BridgeState::Stopped);
        Ok(())
    }
}

/// Build the TransitionBegin handler. It resolves the scene and
/// schedules one fire-and-forget dispatch, then returns immediately;
/// a slow controller never delays the next inbound event.
fn transition_handler(vts: VtsClient, config: &Config) -> EventHandler {
    let scenes_to_hotkeys: HashMap<String, String> = config.scenes_to_hotkeys.clone();
    let default_hotkey = config.default_hotkey.clone();
    let policy = DelayPolicy::from_flags(config.transition_delay_half, config.transition_delay_ms);

    Box::new(move |raw: Value| {
        log::debug!("Received OBS event: {raw}");
        let event: TransitionEvent = match serde_json::from_value(raw) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Malformed TransitionBegin event: {e}");
                return;
            }
        };
        log::info!("OBS switched to scene: {}", event.to_scene);

        let hotkey =
            match resolver::resolve(&scenes_to_hotkeys, default_hotkey.as_deref(), &event.to_scene)
            {
                Some(hotkey) => hotkey.to_string(),
                None => {
                    log::info!(
                        "No hotkey mapped for scene '{}', skipping.",
                        event.to_scene
                    );
                    return;
                }
            };

        let delay = policy.delay(event.duration_ms());
        let vts = vts.clone();
        let _ = dispatch::schedule(DispatchPolicy::FireAndForget, delay, async move {
            vts.trigger_hotkey(&hotkey).await;
        });
    })
}
