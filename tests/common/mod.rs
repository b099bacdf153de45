// Mock capabilities shared by the integration tests.
//
// Every mock records what the controller asked of it so tests can assert on
// side effects without a network.

#![allow(dead_code)]

use aletheia_call::{
    AudioSession, CallCapabilities, CallConfig, CallController, CallSnapshot, ControlMessage,
    HealthStatus, SessionBackend, SessionDescriptor, TokenProvider, Transport, TransportEvent,
    TransportFactory, UsageTracker,
};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

// ============================================================================
// Transport
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct TransportBehavior {
    pub fail_connect: bool,
    pub hang_connect: bool,
    pub fail_publish: bool,
    pub fail_disconnect: bool,
    /// Delay applied inside `disconnect`
    pub slow_disconnect: Option<Duration>,
}

pub struct MockTransport {
    behavior: TransportBehavior,
    connect_gate: Option<Arc<Notify>>,
    events: mpsc::UnboundedSender<TransportEvent>,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub microphone: Mutex<Vec<bool>>,
    pub published: Mutex<Vec<Vec<u8>>>,
    connected: AtomicBool,
    microphone_enabled: AtomicBool,
}

impl MockTransport {
    /// Simulate an event from the room
    pub fn emit(&self, event: TransportEvent) {
        self.events.send(event).unwrap();
    }

    pub fn emit_message(&self, json: &str) {
        self.emit(TransportEvent::DataReceived {
            payload: json.as_bytes().to_vec(),
            participant: Some("aletheia-bot".to_string()),
        });
    }

    pub fn published_messages(&self) -> Vec<ControlMessage> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|payload| ControlMessage::decode(payload).unwrap())
            .collect()
    }

    pub fn microphone_calls(&self) -> Vec<bool> {
        self.microphone.lock().unwrap().clone()
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str, token: &str) -> Result<()> {
        assert_eq!(url, "wss://rtc.example.test");
        assert_eq!(token, "user-token");
        self.connects.fetch_add(1, Ordering::SeqCst);

        if self.behavior.hang_connect {
            std::future::pending::<()>().await;
        }
        if let Some(gate) = &self.connect_gate {
            gate.notified().await;
        }
        if self.behavior.fail_connect {
            anyhow::bail!("signal connection refused");
        }

        self.connected.store(true, Ordering::SeqCst);
        let _ = self.events.send(TransportEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.behavior.slow_disconnect {
            tokio::time::sleep(delay).await;
        }
        self.connected.store(false, Ordering::SeqCst);
        if self.behavior.fail_disconnect {
            anyhow::bail!("socket already closed");
        }
        Ok(())
    }

    async fn set_microphone_enabled(&self, enabled: bool) -> Result<()> {
        self.microphone.lock().unwrap().push(enabled);

        // Local track mute state is reported like the NATS binding does
        if self.microphone_enabled.swap(enabled, Ordering::SeqCst) != enabled {
            let identity = "local".to_string();
            let _ = self.events.send(if enabled {
                TransportEvent::TrackUnmuted { identity }
            } else {
                TransportEvent::TrackMuted { identity }
            });
        }
        Ok(())
    }

    async fn publish_data(&self, payload: &[u8]) -> Result<()> {
        if self.behavior.fail_publish {
            anyhow::bail!("data channel closed");
        }
        self.published.lock().unwrap().push(payload.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Default)]
pub struct MockTransportFactory {
    pub behavior: TransportBehavior,
    /// When set, `connect` waits for a permit before answering
    pub connect_gate: Option<Arc<Notify>>,
    pub created: Mutex<Vec<Arc<MockTransport>>>,
}

impl MockTransportFactory {
    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn last(&self) -> Arc<MockTransport> {
        self.created
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no transport created")
    }
}

impl TransportFactory for MockTransportFactory {
    fn create(
        &self,
        _room_name: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn Transport>> {
        let transport = Arc::new(MockTransport {
            behavior: self.behavior,
            connect_gate: self.connect_gate.clone(),
            events,
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            microphone: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            connected: AtomicBool::new(false),
            microphone_enabled: AtomicBool::new(false),
        });
        self.created.lock().unwrap().push(Arc::clone(&transport));
        Ok(transport)
    }
}

// ============================================================================
// Backend, identity, audio
// ============================================================================

#[derive(Default)]
pub struct MockBackend {
    pub fail: bool,
    /// Never answer the health probe
    pub hang_health: bool,
    /// When set, `create_session` waits for a permit before answering
    pub gate: Option<Arc<Notify>>,
    pub health_checks: AtomicUsize,
    pub sessions_requested: AtomicUsize,
}

#[async_trait::async_trait]
impl SessionBackend for MockBackend {
    async fn health_check(&self) -> HealthStatus {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        if self.hang_health {
            std::future::pending::<()>().await;
        }
        HealthStatus::unknown()
    }

    async fn create_session(
        &self,
        auth_token: &str,
        room_name: &str,
        _identity: Option<&str>,
    ) -> Result<SessionDescriptor> {
        assert_eq!(auth_token, "bearer-token");
        self.sessions_requested.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            anyhow::bail!("Connection Error: 500 - bot pool exhausted");
        }

        Ok(SessionDescriptor {
            url: "wss://rtc.example.test".to_string(),
            access_token: "user-token".to_string(),
            room_name: format!("{}-echo", room_name),
            session_id: "4242".to_string(),
        })
    }
}

pub struct MockTokens {
    pub token: Option<String>,
    pub hang: bool,
}

#[async_trait::async_trait]
impl TokenProvider for MockTokens {
    async fn get_token(&self) -> Result<Option<String>> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        Ok(self.token.clone())
    }
}

pub struct MockAudio {
    pub granted: bool,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl MockAudio {
    pub fn new(granted: bool) -> Self {
        Self {
            granted,
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl AudioSession for MockAudio {
    async fn request_microphone_permission(&self) -> Result<bool> {
        Ok(self.granted)
    }

    async fn start(&self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct HarnessOptions {
    pub config: CallConfig,
    pub backend: MockBackend,
    pub token: Option<String>,
    pub hang_token: bool,
    pub microphone_granted: bool,
    pub transport: TransportBehavior,
    pub connect_gate: Option<Arc<Notify>>,
    pub usage: Option<UsageTracker>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            config: CallConfig::default(),
            backend: MockBackend::default(),
            token: Some("bearer-token".to_string()),
            hang_token: false,
            microphone_granted: true,
            transport: TransportBehavior::default(),
            connect_gate: None,
            usage: None,
        }
    }
}

pub struct Harness {
    pub controller: CallController,
    pub backend: Arc<MockBackend>,
    pub audio: Arc<MockAudio>,
    pub transports: Arc<MockTransportFactory>,
    pub usage: Option<Arc<tokio::sync::Mutex<UsageTracker>>>,
}

impl Harness {
    pub fn new(options: HarnessOptions) -> Self {
        let backend = Arc::new(options.backend);
        let audio = Arc::new(MockAudio::new(options.microphone_granted));
        let transports = Arc::new(MockTransportFactory {
            behavior: options.transport,
            connect_gate: options.connect_gate,
            created: Mutex::new(Vec::new()),
        });
        let usage = options
            .usage
            .map(|tracker| Arc::new(tokio::sync::Mutex::new(tracker)));

        let controller = CallController::new(
            options.config,
            CallCapabilities {
                backend: backend.clone(),
                tokens: Arc::new(MockTokens {
                    token: options.token,
                    hang: options.hang_token,
                }),
                audio: audio.clone(),
                transports: transports.clone(),
                usage: usage.clone(),
            },
        );

        Self {
            controller,
            backend,
            audio,
            transports,
            usage,
        }
    }

    pub fn default_harness() -> Self {
        Self::new(HarnessOptions::default())
    }

    /// Wait until a snapshot satisfies `predicate`, failing after one second
    pub async fn wait_for<F>(&self, predicate: F) -> CallSnapshot
    where
        F: FnMut(&CallSnapshot) -> bool,
    {
        let mut updates = self.controller.subscribe();
        let snapshot = tokio::time::timeout(Duration::from_secs(1), updates.wait_for(predicate))
            .await
            .expect("timed out waiting for call state")
            .expect("controller dropped")
            .clone();
        snapshot
    }
}

/// Poll `condition` until it holds, failing after one second
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}
