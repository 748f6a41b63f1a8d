use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::account::Address;

/// Remembers when each address last produced a low balance alert. Lives only as
/// long as the process, a restart fires the next due alert straight away.
pub struct AlertState {
    last_fired: HashMap<Address, DateTime<Utc>>,
    min_wait: Duration,
}

impl AlertState {
    pub fn new(min_wait: Duration) -> Self {
        Self {
            last_fired: HashMap::new(),
            min_wait,
        }
    }

    pub fn last_alert(&self, address: &Address) -> Option<&DateTime<Utc>> {
        self.last_fired.get(address)
    }

    /// Wall clock based. If the clock steps backwards the elapsed time goes negative and
    /// the address stays throttled until the clock passes the recorded alert again.
    fn is_throttled(&self, address: &Address, now: &DateTime<Utc>) -> bool {
        if self.min_wait == Duration::zero() {
            return false;
        }

        self.last_alert(address)
            .map_or(false, |last_fired| *now - *last_fired <= self.min_wait)
    }

    /// Decides whether a sample should alert, recording `now` for the address when it does.
    pub fn should_notify(
        &mut self,
        address: &Address,
        lamports: u64,
        min_lamports: u64,
        now: DateTime<Utc>,
    ) -> bool {
        if lamports >= min_lamports {
            return false;
        }

        if self.is_throttled(address, &now) {
            debug!(%address, lamports, "low balance alert is throttled");
            return false;
        }

        self.last_fired.insert(address.clone(), now);
        true
    }
}
