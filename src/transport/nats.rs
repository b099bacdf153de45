use super::backend::{
    ConnectionState, DisconnectReason, Transport, TransportEvent, TransportFactory,
};
use anyhow::{Context, Result};
use async_nats::{Client, ConnectOptions, Event};
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Participant identity used for the local microphone track
pub const LOCAL_IDENTITY: &str = "local";

/// Control-channel binding over NATS
///
/// Audio media is carried by the external real-time provider; this binding
/// moves the room's data packets and reports connection state.
pub struct NatsTransport {
    room_name: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    client: Mutex<Option<Client>>,
    data_task_handle: Mutex<Option<JoinHandle<()>>>,
    microphone_enabled: AtomicBool,
}

impl NatsTransport {
    pub fn new(room_name: &str, events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            room_name: room_name.to_string(),
            events,
            client: Mutex::new(None),
            data_task_handle: Mutex::new(None),
            microphone_enabled: AtomicBool::new(false),
        }
    }

    fn data_subject(&self) -> String {
        format!("room.{}.data", self.room_name)
    }

    /// Whether the local microphone is currently published
    pub fn is_microphone_enabled(&self) -> bool {
        self.microphone_enabled.load(Ordering::SeqCst)
    }

    /// Record the publish flag and report the local track as muted/unmuted
    fn apply_microphone(&self, enabled: bool) {
        if self.microphone_enabled.swap(enabled, Ordering::SeqCst) == enabled {
            return;
        }

        info!("Microphone publish enabled={}", enabled);

        let identity = LOCAL_IDENTITY.to_string();
        let event = if enabled {
            TransportEvent::TrackUnmuted { identity }
        } else {
            TransportEvent::TrackMuted { identity }
        };
        let _ = self.events.send(event);
    }
}

#[async_trait::async_trait]
impl Transport for NatsTransport {
    async fn connect(&self, url: &str, token: &str) -> Result<()> {
        info!("Connecting to room {} at {}", self.room_name, url);

        let events = self.events.clone();
        let client = ConnectOptions::with_token(token.to_string())
            .no_echo()
            .event_callback(move |event| {
                let events = events.clone();
                async move {
                    let state = match event {
                        Event::Connected => Some(ConnectionState::Connected),
                        Event::Disconnected => Some(ConnectionState::Reconnecting),
                        other => {
                            debug!("NATS client event: {}", other);
                            None
                        }
                    };
                    if let Some(state) = state {
                        let _ = events.send(TransportEvent::ConnectionStateChanged(state));
                    }
                }
            })
            .connect(url)
            .await
            .context("Failed to connect to room")?;

        let subject = self.data_subject();
        let mut subscriber = client
            .subscribe(subject.clone())
            .await
            .context("Failed to subscribe to room data")?;

        info!("Subscribed to {}", subject);

        let events = self.events.clone();
        let data_task = tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                let event = TransportEvent::DataReceived {
                    payload: msg.payload.to_vec(),
                    participant: None,
                };
                if events.send(event).is_err() {
                    break;
                }
            }

            let _ = events.send(TransportEvent::Disconnected {
                reason: DisconnectReason::ConnectionFailed(
                    "room data subscription closed".to_string(),
                ),
            });
        });

        *self.client.lock().await = Some(client);
        *self.data_task_handle.lock().await = Some(data_task);

        let _ = self.events.send(TransportEvent::Connected);

        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from room {}", self.room_name);

        if let Some(task) = self.data_task_handle.lock().await.take() {
            task.abort();
        }

        let client = self.client.lock().await.take();
        self.microphone_enabled.store(false, Ordering::SeqCst);

        if let Some(client) = client {
            client
                .flush()
                .await
                .context("Failed to flush pending room data")?;
            let _ = self.events.send(TransportEvent::Disconnected {
                reason: DisconnectReason::ClientInitiated,
            });
        }

        Ok(())
    }

    async fn set_microphone_enabled(&self, enabled: bool) -> Result<()> {
        if self.client.lock().await.is_none() {
            anyhow::bail!("Not connected to room {}", self.room_name);
        }

        self.apply_microphone(enabled);
        Ok(())
    }

    async fn publish_data(&self, payload: &[u8]) -> Result<()> {
        let client = self
            .client
            .lock()
            .await
            .clone()
            .with_context(|| format!("Not connected to room {}", self.room_name))?;

        let subject = self.data_subject();
        client
            .publish(subject.clone(), payload.to_vec().into())
            .await
            .context("Failed to publish room data")?;

        debug!("Published {} bytes to {}", payload.len(), subject);
        Ok(())
    }

    fn name(&self) -> &str {
        "nats"
    }
}

impl Drop for NatsTransport {
    fn drop(&mut self) {
        if let Ok(mut handle) = self.data_task_handle.try_lock() {
            if let Some(task) = handle.take() {
                warn!("Transport dropped while connected to {}", self.room_name);
                task.abort();
            }
        }
    }
}

/// Creates a `NatsTransport` per call attempt
#[derive(Debug, Default, Clone, Copy)]
pub struct NatsTransportFactory;

impl TransportFactory for NatsTransportFactory {
    fn create(
        &self,
        room_name: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn Transport>> {
        Ok(Arc::new(NatsTransport::new(room_name, events)))
    }
}
