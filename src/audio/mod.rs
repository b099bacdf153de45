pub mod session;

pub use session::{AudioSession, HostAudioSession};
