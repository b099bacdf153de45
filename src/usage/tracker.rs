use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Number of past sessions kept in history
pub const HISTORY_LIMIT: usize = 10;

/// Subscription plan of the current user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    None,
    Guided,
    Extended,
}

impl Plan {
    /// Parse a backend plan name; anything unknown maps to `None`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "guided" => Plan::Guided,
            "extended" => Plan::Extended,
            _ => Plan::None,
        }
    }

    /// Call minutes allowed per day
    pub fn daily_minutes(&self) -> u32 {
        match self {
            Plan::None => 0,
            Plan::Guided => 60,
            Plan::Extended => 480,
        }
    }
}

/// One completed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Duration rounded up to whole minutes
    pub minutes: u32,
}

/// Usage numbers exposed to the UI
#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub plan: Plan,
    pub minutes_used: u32,
    pub daily_limit: u32,
    pub can_start_session: bool,
    pub history: Vec<SessionRecord>,
}

/// Tracks today's call minutes and recent sessions
#[derive(Debug, Clone)]
pub struct UsageTracker {
    plan: Plan,
    day: NaiveDate,
    minutes_used: u32,
    current: Option<(String, DateTime<Utc>)>,
    history: Vec<SessionRecord>,
}

impl UsageTracker {
    pub fn new(plan: Plan) -> Self {
        Self {
            plan,
            day: Utc::now().date_naive(),
            minutes_used: 0,
            current: None,
            history: Vec::new(),
        }
    }

    pub fn plan(&self) -> Plan {
        self.plan
    }

    pub fn set_plan(&mut self, plan: Plan) {
        info!("Usage plan set to {:?}", plan);
        self.plan = plan;
    }

    /// Minutes used today
    pub fn minutes_used(&self) -> u32 {
        self.minutes_used_at(Utc::now())
    }

    pub fn minutes_used_at(&self, now: DateTime<Utc>) -> u32 {
        if now.date_naive() == self.day {
            self.minutes_used
        } else {
            0
        }
    }

    pub fn can_start_session(&self) -> bool {
        self.can_start_session_at(Utc::now())
    }

    pub fn can_start_session_at(&self, now: DateTime<Utc>) -> bool {
        let limit = self.plan.daily_minutes();
        limit > 0 && self.minutes_used_at(now) < limit
    }

    /// Sessions, most recent first
    pub fn history(&self) -> &[SessionRecord] {
        &self.history
    }

    pub fn start_session(&mut self) {
        self.start_session_at(Utc::now());
    }

    pub fn start_session_at(&mut self, now: DateTime<Utc>) {
        let id = format!("session_{}", now.timestamp_millis());
        self.current = Some((id, now));
    }

    /// Close the running session and return the minutes charged
    pub fn end_session(&mut self) -> u32 {
        self.end_session_at(Utc::now())
    }

    pub fn end_session_at(&mut self, now: DateTime<Utc>) -> u32 {
        let Some((id, started_at)) = self.current.take() else {
            warn!("No usage session to end");
            return 0;
        };

        let elapsed_ms = (now - started_at).num_milliseconds().max(0) as u64;
        let minutes = elapsed_ms.div_ceil(60_000) as u32;

        let today = now.date_naive();
        if today != self.day {
            self.day = today;
            self.minutes_used = 0;
        }
        self.minutes_used += minutes;

        self.history.insert(
            0,
            SessionRecord {
                id,
                started_at,
                ended_at: now,
                minutes,
            },
        );
        self.history.truncate(HISTORY_LIMIT);

        info!(
            "Session charged {} minute(s), {} used today",
            minutes, self.minutes_used
        );

        minutes
    }

    pub fn summary(&self) -> UsageSummary {
        UsageSummary {
            plan: self.plan,
            minutes_used: self.minutes_used(),
            daily_limit: self.plan.daily_minutes(),
            can_start_session: self.can_start_session(),
            history: self.history.clone(),
        }
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new(Plan::None)
    }
}
