pub mod audio;
pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod usage;

pub use audio::{AudioSession, HostAudioSession};
pub use backend::{
    HealthStatus, HttpBackend, SessionBackend, SessionDescriptor, StaticTokenProvider,
    TokenProvider,
};
pub use config::Config;
pub use error::CallError;
pub use http::{create_router, AppState};
pub use protocol::{ControlMessage, DecodeError, RemoteSessionState, SessionAction, TranscriptRole};
pub use session::{
    derive_session_state, generate_room_name, CallCapabilities, CallConfig, CallController,
    CallSnapshot, DerivedSessionState, LifecyclePhase, SessionStateView, StartOutcome,
};
pub use transport::{
    ConnectionState, DisconnectReason, NatsTransportFactory, Transport, TransportEvent,
    TransportFactory,
};
pub use usage::{Plan, SessionRecord, UsageTracker};
