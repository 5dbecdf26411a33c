//! In-process batch scheduler
//!
//! Runs account auto-closure and due top-up rules on fixed intervals.
//! "Today" is always taken in the configured timezone so that a run just
//! after midnight UTC does not see yesterday's date.

use crate::clock::{parse_timezone, today_in};
use crate::{EducationAccountService, TopUpService};
use chrono_tz::Tz;
use edufund_core::{config::BatchConfig, AppResult};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// Name recorded as `triggered_by` for scheduled runs
pub const SCHEDULER_ACTOR: &str = "scheduler";

/// Runs account auto-closure and due top-up rules on their intervals
pub struct BatchScheduler {
    accounts: Arc<EducationAccountService>,
    top_ups: Arc<TopUpService>,
    timezone: Tz,
    closure_interval: Duration,
    top_up_interval: Duration,
}

impl BatchScheduler {
    pub fn new(
        accounts: Arc<EducationAccountService>,
        top_ups: Arc<TopUpService>,
        timezone: Tz,
        closure_interval: Duration,
        top_up_interval: Duration,
    ) -> Self {
        Self {
            accounts,
            top_ups,
            timezone,
            closure_interval,
            top_up_interval,
        }
    }

    pub fn from_config(
        config: &BatchConfig,
        accounts: Arc<EducationAccountService>,
        top_ups: Arc<TopUpService>,
    ) -> AppResult<Self> {
        Ok(Self::new(
            accounts,
            top_ups,
            parse_timezone(&config.timezone)?,
            Duration::from_secs(config.account_closure_interval_secs.max(1)),
            Duration::from_secs(config.top_up_interval_secs.max(1)),
        ))
    }

    /// Start both loops; the handles are only needed to stop them
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        info!(
            timezone = %self.timezone,
            closure_interval_secs = self.closure_interval.as_secs(),
            top_up_interval_secs = self.top_up_interval.as_secs(),
            "Starting batch scheduler"
        );

        let closure = {
            let accounts = self.accounts.clone();
            let tz = self.timezone;
            let period = self.closure_interval;
            tokio::spawn(async move {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    match accounts.auto_close(today_in(tz), SCHEDULER_ACTOR).await {
                        Ok(run) => info!(
                            batch_id = run.id,
                            status = %run.status,
                            affected = run.affected_count,
                            "Scheduled account closure finished"
                        ),
                        Err(e) => error!("Scheduled account closure could not run: {}", e),
                    }
                }
            })
        };

        let top_up = {
            let top_ups = self.top_ups.clone();
            let tz = self.timezone;
            let period = self.top_up_interval;
            tokio::spawn(async move {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    match top_ups.run_due(today_in(tz), SCHEDULER_ACTOR).await {
                        Ok(runs) if !runs.is_empty() => {
                            info!(executed = runs.len(), "Scheduled top-up rules executed")
                        }
                        Ok(_) => {}
                        Err(e) => error!("Scheduled top-up check failed: {}", e),
                    }
                }
            })
        };

        vec![closure, top_up]
    }
}
