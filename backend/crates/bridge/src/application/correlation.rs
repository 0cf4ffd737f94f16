//! Correlation Tracker
//!
//! Hands out `{client}-{n}` ids. One counter serves every client and
//! starts over after each UTC midnight.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use platform::clock::Clock;

use crate::domain::value_object::correlation_id::CorrelationId;

#[derive(Debug)]
struct CounterState {
    reset_point: DateTime<Utc>,
    value: u64,
}

pub struct CorrelationTracker {
    clock: Arc<dyn Clock>,
    state: Mutex<CounterState>,
}

impl CorrelationTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            // first call always resets
            state: Mutex::new(CounterState {
                reset_point: DateTime::<Utc>::MIN_UTC,
                value: 0,
            }),
        }
    }

    pub fn create(&self, client_name: &str) -> CorrelationId {
        let now = self.clock.now();

        let value = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if now < state.reset_point {
                state.value += 1;
            } else {
                state.reset_point = next_midnight(now);
                state.value = 1;
            }
            state.value
        };

        CorrelationId::new(client_name, value)
    }
}

fn next_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
