use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// OS audio session and microphone permission
///
/// Platform-specific implementations:
/// - Android/iOS: runtime RECORD_AUDIO prompt + duplex call audio mode
/// - Desktop: permission is a configuration switch, no prompt
#[async_trait::async_trait]
pub trait AudioSession: Send + Sync {
    /// Ask for microphone access. `Ok(false)` means the user denied it.
    async fn request_microphone_permission(&self) -> Result<bool>;

    /// Configure the local audio session for duplex call audio
    async fn start(&self) -> Result<()>;

    /// Release the local audio session
    async fn stop(&self) -> Result<()>;
}

/// Audio session for hosts without a permission prompt
#[derive(Debug)]
pub struct HostAudioSession {
    microphone_allowed: bool,
    active: AtomicBool,
}

impl HostAudioSession {
    pub fn new(microphone_allowed: bool) -> Self {
        Self {
            microphone_allowed,
            active: AtomicBool::new(false),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for HostAudioSession {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait::async_trait]
impl AudioSession for HostAudioSession {
    async fn request_microphone_permission(&self) -> Result<bool> {
        if self.microphone_allowed {
            info!("Microphone permission granted");
        } else {
            info!("Microphone permission denied");
        }
        Ok(self.microphone_allowed)
    }

    async fn start(&self) -> Result<()> {
        self.active.store(true, Ordering::SeqCst);
        info!("Audio session configured");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("Audio session released");
        }
        Ok(())
    }
}
