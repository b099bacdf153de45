pub mod backend;
pub mod nats;

pub use backend::{
    ConnectionState, DisconnectReason, Transport, TransportEvent, TransportFactory,
};
pub use nats::{NatsTransport, NatsTransportFactory};
