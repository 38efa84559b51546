use crate::config::Settings;
use crate::detector::ShakeDetector;
use crate::errors::ConfigurationError;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::Instant};
use tracing::debug;

/// One browser tab's sample stream.
#[derive(Debug, Clone)]
pub struct Session {
    pub detector: ShakeDetector,
    pub created: Instant,
    pub last_batch: Option<Instant>,
}

impl Session {
    pub fn last_active(&self) -> Instant {
        self.last_batch.unwrap_or(self.created)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: Arc<Mutex<HashMap<String, Session>>>,
    template: ShakeDetector,
    started: Instant,
}

impl AppState {
    /// Fails when the detector settings are invalid, before any sample is
    /// accepted.
    pub fn new(settings: Settings) -> Result<Self, ConfigurationError> {
        let template = ShakeDetector::new(settings.detector)?;
        Ok(Self {
            settings: Arc::new(settings),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            template,
            started: Instant::now(),
        })
    }

    pub fn new_session(&self) -> Session {
        Session {
            detector: self.template.clone(),
            created: Instant::now(),
            last_batch: None,
        }
    }

    /// Server-side monotonic clock for readings that arrive unstamped.
    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Drops sessions idle for longer than the TTL, then the least recently
    /// active ones until there is room for one more. `keep` is never evicted.
    pub fn prune_sessions(&self, sessions: &mut HashMap<String, Session>, now: Instant, keep: &str) {
        let ttl = Duration::from_millis(self.settings.session_ttl_ms);
        let before = sessions.len();
        sessions.retain(|id, session| {
            id == keep || now.saturating_duration_since(session.last_active()) < ttl
        });

        let limit = self.settings.max_sessions.max(1);
        let room = if sessions.contains_key(keep) { limit } else { limit - 1 };
        while sessions.len() > room {
            let oldest = sessions
                .iter()
                .filter(|(id, _)| id.as_str() != keep)
                .min_by_key(|(_, session)| session.last_active())
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, live = sessions.len(), "motion sessions evicted");
        }
    }
}
