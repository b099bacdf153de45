use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Why a room connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// We called `disconnect()` ourselves
    ClientInitiated,
    /// The media server went away
    ServerShutdown,
    /// Kicked out of the room
    ParticipantRemoved,
    /// The room was closed on the server
    RoomDeleted,
    /// The connection dropped and could not be restored
    ConnectionFailed(String),
    Unknown,
}

impl DisconnectReason {
    /// Whether the disconnect should be reported to the user as an error
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DisconnectReason::ConnectionFailed(_) | DisconnectReason::ServerShutdown
        )
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::ClientInitiated => write!(f, "client initiated"),
            DisconnectReason::ServerShutdown => write!(f, "server shutdown"),
            DisconnectReason::ParticipantRemoved => write!(f, "participant removed"),
            DisconnectReason::RoomDeleted => write!(f, "room deleted"),
            DisconnectReason::ConnectionFailed(detail) => {
                write!(f, "connection failed: {}", detail)
            }
            DisconnectReason::Unknown => write!(f, "unknown"),
        }
    }
}

/// Connection state reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
}

/// Lifecycle and data events emitted by a transport handle
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Room join acknowledged
    Connected,
    /// Room connection ended
    Disconnected { reason: DisconnectReason },
    /// Underlying connection state changed
    ConnectionStateChanged(ConnectionState),
    /// A remote participant joined the room
    ParticipantJoined { identity: String },
    /// A remote participant left the room
    ParticipantLeft { identity: String },
    /// A participant muted an audio track
    TrackMuted { identity: String },
    /// A participant unmuted an audio track
    TrackUnmuted { identity: String },
    /// Data packet received on the control channel
    DataReceived {
        payload: Vec<u8>,
        participant: Option<String>,
    },
}

/// Live connection to a real-time audio room
///
/// Implementations:
/// - NATS: control channel over `room.<name>.data` subjects
/// - Tests: in-memory mock that records every call
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Join the room at `url` using the access token issued by the backend
    async fn connect(&self, url: &str, token: &str) -> Result<()>;

    /// Leave the room and release the connection
    async fn disconnect(&self) -> Result<()>;

    /// Start or stop publishing the local microphone
    async fn set_microphone_enabled(&self, enabled: bool) -> Result<()>;

    /// Send a reliable data packet to the other participants
    async fn publish_data(&self, payload: &[u8]) -> Result<()>;

    /// Get transport name for logging
    fn name(&self) -> &str;
}

/// Builds one transport handle per call attempt
///
/// The event sender is attached at construction time so that no lifecycle
/// event fired during `connect` can be missed.
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        room_name: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn Transport>>;
}
