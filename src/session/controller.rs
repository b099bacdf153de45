use super::config::CallConfig;
use super::derived::DerivedSessionState;
use super::state::{CallSnapshot, CallState, LifecyclePhase};
use crate::audio::AudioSession;
use crate::backend::{SessionBackend, TokenProvider};
use crate::error::CallError;
use crate::protocol::{ControlMessage, RemoteSessionState, SessionAction, TranscriptRole};
use crate::transport::{
    ConnectionState, DisconnectReason, Transport, TransportEvent, TransportFactory,
};
use crate::usage::UsageTracker;
use chrono::Utc;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

/// External capabilities the controller drives
#[derive(Clone)]
pub struct CallCapabilities {
    pub backend: Arc<dyn SessionBackend>,
    pub tokens: Arc<dyn TokenProvider>,
    pub audio: Arc<dyn AudioSession>,
    pub transports: Arc<dyn TransportFactory>,
    /// Charge call minutes against the plan and refuse calls past the limit
    pub usage: Option<Arc<Mutex<UsageTracker>>>,
}

/// What became of one `start_call`
#[derive(Debug)]
pub enum StartOutcome {
    /// Room joined
    Started,
    /// Another call is connecting or connected; nothing was done
    AlreadyActive,
    /// `end_call` ran before the room was joined
    Cancelled,
    /// The attempt failed and was torn down
    Failed(CallError),
}

/// Why `establish` stopped early
enum StartFailure {
    /// `end_call` or a newer attempt superseded this one
    Cancelled,
    Failed(CallError),
}

impl From<CallError> for StartFailure {
    fn from(err: CallError) -> Self {
        StartFailure::Failed(err)
    }
}

struct Inner {
    config: CallConfig,
    caps: CallCapabilities,
    state: Mutex<CallState>,
    snapshot_tx: watch::Sender<CallSnapshot>,
}

/// Owns the single real-time call and everything attached to it
///
/// Cloning is cheap; every clone drives the same call.
#[derive(Clone)]
pub struct CallController {
    inner: Arc<Inner>,
}

impl CallController {
    pub fn new(config: CallConfig, caps: CallCapabilities) -> Self {
        let (snapshot_tx, _) = watch::channel(CallSnapshot::default());

        Self {
            inner: Arc::new(Inner {
                config,
                caps,
                state: Mutex::new(CallState::new()),
                snapshot_tx,
            }),
        }
    }

    pub fn config(&self) -> &CallConfig {
        &self.inner.config
    }

    /// Current state of the call
    pub async fn snapshot(&self) -> CallSnapshot {
        self.inner.state.lock().await.snapshot()
    }

    /// Receive a new snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<CallSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Read and clear the error for a one-time alert
    pub async fn take_error(&self) -> Option<String> {
        let mut state = self.inner.state.lock().await;
        let error = state.error.take();
        if error.is_some() {
            self.publish(&state);
        }
        error
    }

    /// Join a room. Ignored while another call is connecting or connected.
    ///
    /// A failure is also left in the snapshot's `error` for the one-time alert.
    pub async fn start_call(&self, room_name: &str, identity: Option<&str>) -> StartOutcome {
        let attempt = {
            let mut state = self.inner.state.lock().await;
            if state.phase != LifecyclePhase::Idle || state.transport.is_some() {
                info!("Call already in progress, ignoring start for {}", room_name);
                return StartOutcome::AlreadyActive;
            }

            state.reset();
            state.attempt += 1;
            state.phase = LifecyclePhase::Connecting;
            state.room_name = Some(room_name.to_string());
            self.publish(&state);
            state.attempt
        };

        info!("Starting voice session in room {}", room_name);

        match self.establish(attempt, room_name, identity).await {
            Ok(()) => {
                info!("Call setup complete");
                StartOutcome::Started
            }
            Err(StartFailure::Cancelled) => {
                info!("Call attempt for {} was cancelled", room_name);
                StartOutcome::Cancelled
            }
            Err(StartFailure::Failed(err)) => {
                error!("Error starting call: {}", err);
                if self.fail(attempt, &err).await {
                    StartOutcome::Failed(err)
                } else {
                    StartOutcome::Cancelled
                }
            }
        }
    }

    async fn establish(
        &self,
        attempt: u64,
        room_name: &str,
        identity: Option<&str>,
    ) -> Result<(), StartFailure> {
        let caps = &self.inner.caps;
        let config = &self.inner.config;

        if let Some(usage) = &caps.usage {
            if !usage.lock().await.can_start_session() {
                return Err(CallError::UsageLimitReached.into());
            }
        }

        let granted = caps
            .audio
            .request_microphone_permission()
            .await
            .unwrap_or_else(|e| {
                warn!("Permission error: {:#}", e);
                false
            });
        if !granted {
            return Err(CallError::PermissionDenied.into());
        }
        self.ensure_current(attempt).await?;

        caps.audio
            .start()
            .await
            .map_err(CallError::AudioSession)?;
        {
            let mut state = self.inner.state.lock().await;
            if !state.is_current(attempt) {
                drop(state);
                if let Err(e) = caps.audio.stop().await {
                    warn!("Failed to release audio session: {:#}", e);
                }
                return Err(StartFailure::Cancelled);
            }
            state.audio_session_active = true;
        }

        if config.health_check {
            let probe = bounded("health check", config.session_timeout(), async {
                Ok(caps.backend.health_check().await)
            })
            .await;
            match probe {
                Ok(health) if health.is_ok() => info!("Backend health check passed"),
                Ok(health) => warn!("Backend health check skipped (status={})", health.status),
                Err(e) => warn!("Backend health check skipped: {}", e),
            }
        }
        self.ensure_current(attempt).await?;

        let token = bounded("token fetch", config.session_timeout(), async {
            Ok(caps.tokens.get_token().await)
        })
        .await?;
        let auth_token = match token {
            Ok(Some(token)) => token,
            Ok(None) => return Err(CallError::MissingToken.into()),
            Err(e) => {
                warn!("Token fetch failed: {:#}", e);
                return Err(CallError::MissingToken.into());
            }
        };
        self.ensure_current(attempt).await?;

        let descriptor = bounded("session request", config.session_timeout(), async {
            caps.backend
                .create_session(&auth_token, room_name, identity)
                .await
                .map_err(CallError::Backend)
        })
        .await?;

        info!(
            "Session created (room={}, session={})",
            descriptor.room_name, descriptor.session_id
        );
        self.ensure_current(attempt).await?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let transport = caps
            .transports
            .create(&descriptor.room_name, events_tx)
            .map_err(CallError::Transport)?;
        self.spawn_event_loop(attempt, events_rx);

        {
            let mut state = self.inner.state.lock().await;
            if !state.is_current(attempt) {
                return Err(StartFailure::Cancelled);
            }
            state.transport = Some(Arc::clone(&transport));
            state.room_name = Some(descriptor.room_name.clone());
            state.assistant_text = config.greeting.clone();
            self.publish(&state);
        }

        info!("Connecting to room via {} transport", transport.name());

        bounded("room connect", config.connect_timeout(), async {
            transport
                .connect(&descriptor.url, &descriptor.access_token)
                .await
                .map_err(CallError::Transport)
        })
        .await?;

        if !self.mark_connected(attempt).await {
            if let Err(e) = transport.disconnect().await {
                warn!("Error disconnecting superseded room: {:#}", e);
            }
            return Err(StartFailure::Cancelled);
        }

        {
            let mut state = self.inner.state.lock().await;
            if !state.is_current(attempt) {
                return Err(StartFailure::Cancelled);
            }
            state.session_id = Some(descriptor.session_id.clone());
            state.remote_state = RemoteSessionState::Active;
            self.publish(&state);
        }

        transport
            .set_microphone_enabled(true)
            .await
            .map_err(CallError::Transport)?;

        Ok(())
    }

    async fn ensure_current(&self, attempt: u64) -> Result<(), StartFailure> {
        let state = self.inner.state.lock().await;
        if state.is_current(attempt) && state.phase == LifecyclePhase::Connecting {
            Ok(())
        } else {
            Err(StartFailure::Cancelled)
        }
    }

    /// Tear down a failed attempt and surface its error. Returns false when
    /// the attempt had already been superseded.
    async fn fail(&self, attempt: u64, err: &CallError) -> bool {
        if !self.teardown(Some(attempt)).await {
            debug!("Attempt {} already torn down, dropping error", attempt);
            return false;
        }

        let mut state = self.inner.state.lock().await;
        if state.phase == LifecyclePhase::Idle {
            state.error = Some(err.to_string());
            self.publish(&state);
        }
        true
    }

    /// Clear `error` if it still holds `message`
    pub async fn dismiss_error(&self, message: &str) {
        let mut state = self.inner.state.lock().await;
        if state.error.as_deref() == Some(message) {
            state.error = None;
            self.publish(&state);
        }
    }

    /// Leave the room and reset everything. Safe to call at any time, any number of times.
    pub async fn end_call(&self) {
        info!("Ending voice session");
        if self.teardown(None).await {
            info!("Session ended");
        }
    }

    /// End any call before the owner goes away
    pub async fn shutdown(&self) {
        info!("Call controller shutting down");
        self.end_call().await;
    }

    /// Returns true if this call performed the teardown.
    ///
    /// With `Some(attempt)`, only tears down when that attempt is still current.
    /// With `None`, a teardown already in flight is awaited so the caller
    /// always observes `Idle`.
    async fn teardown(&self, attempt: Option<u64>) -> bool {
        let (transport, release_audio, was_connected) = {
            let mut state = self.inner.state.lock().await;
            if let Some(attempt) = attempt {
                if !state.is_current(attempt) {
                    return false;
                }
            }
            let phase = state.phase;
            match phase {
                LifecyclePhase::Ending => {
                    drop(state);
                    if attempt.is_none() {
                        self.wait_for_teardown().await;
                    }
                    return false;
                }
                LifecyclePhase::Idle
                    if state.transport.is_none() && !state.audio_session_active =>
                {
                    return false;
                }
                _ => {}
            }

            debug!("Cleaning up call resources");
            state.phase = LifecyclePhase::Ending;
            self.publish(&state);

            let release_audio = std::mem::take(&mut state.audio_session_active);
            (
                state.transport.take(),
                release_audio,
                state.connected_at.take().is_some(),
            )
        };

        if let Some(transport) = transport {
            if let Err(e) = transport.disconnect().await {
                warn!("Error disconnecting room: {:#}", e);
            }
        }

        if release_audio {
            if let Err(e) = self.inner.caps.audio.stop().await {
                warn!("Failed to release audio session: {:#}", e);
            }
        }

        if was_connected {
            if let Some(usage) = &self.inner.caps.usage {
                usage.lock().await.end_session();
            }
        }

        let mut state = self.inner.state.lock().await;
        state.reset();
        state.attempt += 1;
        self.publish(&state);

        true
    }

    async fn wait_for_teardown(&self) {
        debug!("Teardown already in progress, waiting for it");
        let mut updates = self.subscribe();
        if updates
            .wait_for(|s| s.phase != LifecyclePhase::Ending)
            .await
            .is_err()
        {
            warn!("Call state channel closed during teardown");
        }
    }

    /// Flip the local mute flag and mirror it to the agent
    pub async fn toggle_mute(&self) {
        let (transport, muted) = {
            let mut state = self.inner.state.lock().await;
            let Some(transport) = self.connected_transport(&state) else {
                debug!("Mute toggled without a connected room");
                return;
            };
            state.mic_muted = !state.mic_muted;
            self.publish(&state);
            (transport, state.mic_muted)
        };

        info!("Muted: {}", muted);

        if let Err(e) = transport.set_microphone_enabled(!muted).await {
            error!("Error applying microphone state: {:#}", e);
        }

        if let Err(e) = send_control(&*transport, &ControlMessage::Mute { muted }).await {
            error!("Error sending mute state: {:#}", e);
        }
    }

    /// Ask the agent to pause when active, resume otherwise
    pub async fn toggle_session_pause(&self) -> bool {
        let action = {
            let state = self.inner.state.lock().await;
            match state.remote_state {
                RemoteSessionState::Active => SessionAction::Pause,
                RemoteSessionState::Idle => SessionAction::Resume,
            }
        };
        self.request_session_action(action).await
    }

    /// Send a `session_control` request. The phase is left untouched; the
    /// agent confirms with `session_state_change`.
    pub async fn request_session_action(&self, action: SessionAction) -> bool {
        let transport = {
            let state = self.inner.state.lock().await;
            match self.connected_transport(&state) {
                Some(transport) => transport,
                None => {
                    debug!("Session {} requested without a connected room", action);
                    return false;
                }
            }
        };

        match send_control(&*transport, &ControlMessage::SessionControl { action }).await {
            Ok(()) => {
                info!("Session control sent: {}", action);
                true
            }
            Err(e) => {
                error!("Error sending session control: {:#}", e);
                false
            }
        }
    }

    fn connected_transport(&self, state: &CallState) -> Option<Arc<dyn Transport>> {
        if state.phase != LifecyclePhase::Connected {
            return None;
        }
        state.transport.clone()
    }

    /// Returns false if the attempt is no longer current
    async fn mark_connected(&self, attempt: u64) -> bool {
        let was_connecting = {
            let mut state = self.inner.state.lock().await;
            if !state.is_current(attempt) {
                return false;
            }
            match state.phase {
                LifecyclePhase::Connecting => {
                    state.phase = LifecyclePhase::Connected;
                    state.connected_at = Some(Utc::now());
                    self.publish(&state);
                    true
                }
                LifecyclePhase::Connected => false,
                LifecyclePhase::Idle | LifecyclePhase::Ending => return false,
            }
        };

        if was_connecting {
            info!("Connected to room");
            if let Some(usage) = &self.inner.caps.usage {
                usage.lock().await.start_session();
            }
        }

        true
    }

    fn spawn_event_loop(&self, attempt: u64, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            debug!("Transport event loop started (attempt {})", attempt);

            while let Some(event) = events.recv().await {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let controller = CallController { inner };

                if !controller.handle_event(attempt, event).await {
                    break;
                }
            }

            debug!("Transport event loop stopped (attempt {})", attempt);
        });
    }

    /// Returns false once the attempt is stale and the loop should stop
    async fn handle_event(&self, attempt: u64, event: TransportEvent) -> bool {
        if !self.inner.state.lock().await.is_current(attempt) {
            debug!("Dropping event for superseded attempt {}: {:?}", attempt, event);
            return false;
        }

        match event {
            TransportEvent::Connected => {
                self.mark_connected(attempt).await;
            }
            TransportEvent::Disconnected { reason } => {
                info!("Disconnected from session: {}", reason);
                self.handle_remote_disconnect(attempt, reason).await;
            }
            TransportEvent::ConnectionStateChanged(connection_state) => {
                info!("Connection state changed: {:?}", connection_state);
                if connection_state == ConnectionState::Disconnected {
                    self.handle_remote_disconnect(attempt, DisconnectReason::Unknown)
                        .await;
                }
            }
            TransportEvent::ParticipantJoined { identity } => {
                info!("Participant connected: {}", identity);
            }
            TransportEvent::ParticipantLeft { identity } => {
                info!("Participant disconnected: {}", identity);
            }
            TransportEvent::TrackMuted { identity } => {
                debug!("Track muted by {}", identity);
            }
            TransportEvent::TrackUnmuted { identity } => {
                self.handle_voice_activity(&identity).await;
            }
            TransportEvent::DataReceived {
                payload,
                participant,
            } => {
                self.handle_data(attempt, &payload, participant.as_deref()).await;
            }
        }

        true
    }

    async fn handle_remote_disconnect(&self, attempt: u64, reason: DisconnectReason) {
        if !self.teardown(Some(attempt)).await {
            return;
        }

        if reason.is_failure() {
            let mut state = self.inner.state.lock().await;
            if state.phase == LifecyclePhase::Idle {
                state.error = Some(CallError::Disconnected(reason.to_string()).to_string());
                self.publish(&state);
            }
        }
    }

    async fn handle_voice_activity(&self, identity: &str) {
        if !self.inner.config.auto_resume_on_voice {
            return;
        }
        if self.snapshot().await.session_state() != DerivedSessionState::Idle {
            return;
        }

        info!("Audio activity from {} while paused, resuming", identity);
        self.request_session_action(SessionAction::Resume).await;
    }

    /// Apply one inbound control packet. Malformed payloads are logged and dropped.
    pub(crate) async fn handle_data(&self, attempt: u64, payload: &[u8], participant: Option<&str>) {
        let message = match ControlMessage::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("Error parsing data message: {}", e);
                return;
            }
        };

        debug!(
            "Data message received: {} (from {})",
            message.kind(),
            participant.unwrap_or("unknown")
        );

        let mut state = self.inner.state.lock().await;
        if !state.is_current(attempt) {
            return;
        }

        match message {
            ControlMessage::SessionStateChange { state: remote } => {
                info!("Session state update from agent: {:?}", remote);
                state.remote_state = remote;
            }
            ControlMessage::Transcript {
                role: TranscriptRole::User,
                text,
            } => {
                debug!("User: {}", text);
                state.transcript = text;
            }
            ControlMessage::Transcript {
                role: TranscriptRole::Assistant,
                text,
            } => {
                debug!("Assistant: {}", text);
                state.assistant_text = text;
            }
            ControlMessage::Speaking { speaking } => {
                state.remote_speaking = speaking;
            }
            other @ (ControlMessage::Mute { .. } | ControlMessage::SessionControl { .. }) => {
                debug!("Ignoring client-bound {} message", other.kind());
                return;
            }
            ControlMessage::Unrecognized => {
                debug!("Ignoring unrecognized data message");
                return;
            }
        }

        self.publish(&state);
    }

    /// Feed a raw data packet as if it came from the current room
    pub async fn receive_data(&self, payload: &[u8]) {
        let attempt = self.inner.state.lock().await.attempt;
        self.handle_data(attempt, payload, None).await;
    }

    fn publish(&self, state: &CallState) {
        self.inner.snapshot_tx.send_replace(state.snapshot());
    }
}

async fn send_control(transport: &dyn Transport, message: &ControlMessage) -> anyhow::Result<()> {
    let payload = message.encode()?;
    transport.publish_data(&payload).await
}

/// Run one `start_call` step under an optional time limit
async fn bounded<T, F>(step: &'static str, limit: Option<Duration>, fut: F) -> Result<T, CallError>
where
    F: Future<Output = Result<T, CallError>>,
{
    match limit {
        Some(timeout) => tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| CallError::Timeout { step, timeout })?,
        None => fut.await,
    }
}
