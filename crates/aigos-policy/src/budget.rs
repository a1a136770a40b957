//! Session + daily cost and calls/minute accounting. One tracker per agent
//! session; callers never share a tracker across agents.

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use crate::error::PolicyError;

#[derive(Clone, Debug)]
pub struct BudgetCheck {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl BudgetCheck {
    fn allow() -> Self {
        Self { allowed: true, reason: None }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self { allowed: false, reason: Some(reason.into()) }
    }
}

struct BudgetState {
    session_cost: f64,
    daily_cost: f64,
    day_start: DateTime<Utc>,
    minute_calls: Vec<DateTime<Utc>>,
}

pub struct BudgetTracker {
    max_cost_per_session: Option<f64>,
    max_cost_per_day: Option<f64>,
    max_calls_per_minute: Option<u32>,
    state: RwLock<BudgetState>,
}

impl BudgetTracker {
    pub fn new(
        max_cost_per_session: Option<f64>,
        max_cost_per_day: Option<f64>,
        max_calls_per_minute: Option<u32>,
    ) -> Self {
        Self {
            max_cost_per_session,
            max_cost_per_day,
            max_calls_per_minute,
            state: RwLock::new(BudgetState {
                session_cost: 0.0,
                daily_cost: 0.0,
                day_start: Utc::now(),
                minute_calls: Vec::new(),
            }),
        }
    }

    fn roll_day_if_needed(&self, state: &mut BudgetState, now: DateTime<Utc>) {
        if now - state.day_start >= Duration::hours(24) {
            state.daily_cost = 0.0;
            state.day_start = now;
        }
    }

    /// Session-first, then daily. A `None` limit disables that check.
    pub fn check_budget(&self, cost: f64, now: DateTime<Utc>) -> Result<BudgetCheck, PolicyError> {
        let mut state = self.state.write().map_err(|_| PolicyError::LockPoisoned)?;
        self.roll_day_if_needed(&mut state, now);

        if let Some(limit) = self.max_cost_per_session {
            if state.session_cost + cost > limit {
                return Ok(BudgetCheck::deny(format!(
                    "session budget exceeded: {:.4} + {:.4} > {:.4}",
                    state.session_cost, cost, limit
                )));
            }
        }
        if let Some(limit) = self.max_cost_per_day {
            if state.daily_cost + cost > limit {
                return Ok(BudgetCheck::deny(format!(
                    "daily budget exceeded: {:.4} + {:.4} > {:.4}",
                    state.daily_cost, cost, limit
                )));
            }
        }
        Ok(BudgetCheck::allow())
    }

    pub fn check_rate_limit(&self, now: DateTime<Utc>) -> Result<BudgetCheck, PolicyError> {
        let Some(limit) = self.max_calls_per_minute else {
            return Ok(BudgetCheck::allow());
        };
        let state = self.state.read().map_err(|_| PolicyError::LockPoisoned)?;
        let count = state
            .minute_calls
            .iter()
            .filter(|t| now - **t < Duration::minutes(1))
            .count();
        Ok(if count as u32 >= limit {
            BudgetCheck::deny(format!("rate limit exceeded: {count} calls >= {limit}/min"))
        } else {
            BudgetCheck::allow()
        })
    }

    pub fn record_cost(&self, cost: f64, now: DateTime<Utc>) -> Result<(), PolicyError> {
        let mut state = self.state.write().map_err(|_| PolicyError::LockPoisoned)?;
        self.roll_day_if_needed(&mut state, now);
        state.session_cost += cost;
        state.daily_cost += cost;
        Ok(())
    }

    pub fn record_call(&self, now: DateTime<Utc>) -> Result<(), PolicyError> {
        let mut state = self.state.write().map_err(|_| PolicyError::LockPoisoned)?;
        state.minute_calls.retain(|t| now - *t < Duration::minutes(1));
        state.minute_calls.push(now);
        Ok(())
    }

    pub fn reset(&self) -> Result<(), PolicyError> {
        let mut state = self.state.write().map_err(|_| PolicyError::LockPoisoned)?;
        state.session_cost = 0.0;
        state.daily_cost = 0.0;
        state.day_start = Utc::now();
        state.minute_calls.clear();
        Ok(())
    }
}
