use crate::session::{CallController, SessionStateView};
use crate::usage::UsageTracker;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The one call this process drives
    pub controller: CallController,

    /// Plan usage, when metering is enabled
    pub usage: Option<Arc<Mutex<UsageTracker>>>,
}

impl AppState {
    pub fn new(controller: CallController, usage: Option<Arc<Mutex<UsageTracker>>>) -> Self {
        Self { controller, usage }
    }

    pub fn session_view(&self) -> SessionStateView {
        SessionStateView::new(self.controller.clone())
    }
}
