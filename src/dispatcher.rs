//! Batch fan-out of sends with bounded concurrency and lossless accounting.
//!
//! Recipients are partitioned into contiguous groups. Groups run strictly
//! sequentially; within a group every send runs concurrently and the group
//! joins completely before the next one starts. An inter-group delay gives
//! the upstream API room to breathe. Every recipient yields exactly one
//! outcome, recorded in input order, no matter how the group resolves.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::{address::Recipient, error::SendError, message::Message, sender::Sender};

/// Grouping configuration for a dispatch run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchPolicy {
    /// Recipients per group; also the bound on concurrent in-flight sends.
    ///
    /// Default: 50
    #[serde(default = "defaults::group_size")]
    pub group_size: usize,

    /// Pause after each non-final group.
    ///
    /// Default: 1000 ms
    #[serde(default = "defaults::inter_group_delay_ms")]
    pub inter_group_delay_ms: u64,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            group_size: defaults::group_size(),
            inter_group_delay_ms: defaults::inter_group_delay_ms(),
        }
    }
}

impl BatchPolicy {
    #[must_use]
    pub const fn inter_group_delay(&self) -> Duration {
        Duration::from_millis(self.inter_group_delay_ms)
    }

    /// A group size of zero would never make progress.
    #[must_use]
    pub const fn effective_group_size(&self) -> usize {
        if self.group_size == 0 { 1 } else { self.group_size }
    }
}

mod defaults {
    pub const fn group_size() -> usize {
        50
    }

    pub const fn inter_group_delay_ms() -> u64 {
        1000
    }
}

/// Terminal result for one recipient, created once after retries exhaust and
/// never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendOutcome {
    pub recipient: Recipient,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl SendOutcome {
    #[must_use]
    pub const fn success(recipient: Recipient) -> Self {
        Self {
            recipient,
            succeeded: true,
            error: None,
        }
    }

    #[must_use]
    pub fn failure(recipient: Recipient, error: &SendError) -> Self {
        Self {
            recipient,
            succeeded: false,
            error: Some(error.to_string()),
        }
    }
}

/// Accumulated results of one dispatch run. All mutation funnels through
/// [`DispatchStats::record`], which only ever runs on the orchestrating task.
#[derive(Clone, Debug)]
pub struct DispatchStats {
    /// Number of valid recipients attempted.
    pub total: usize,
    /// Successfully delivered addresses, in dispatch input order.
    pub succeeded: Vec<Recipient>,
    /// Exhausted failures, in dispatch input order.
    pub failed: Vec<SendOutcome>,
    /// Raw strings that failed the syntax check, in encounter order.
    pub invalid: Vec<String>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

impl DispatchStats {
    #[must_use]
    pub fn begin(total: usize, invalid: Vec<String>) -> Self {
        let now = SystemTime::now();
        Self {
            total,
            succeeded: Vec::new(),
            failed: Vec::new(),
            invalid,
            started_at: now,
            finished_at: now,
        }
    }

    /// Stats for a run that never started; only the invalid list carries data.
    #[must_use]
    pub fn aborted(invalid: Vec<String>) -> Self {
        Self::begin(0, invalid)
    }

    /// The single collector step: fold one resolved send into the stats.
    pub fn record(&mut self, outcome: SendOutcome) {
        if outcome.succeeded {
            self.succeeded.push(outcome.recipient);
        } else {
            self.failed.push(outcome);
        }
    }

    /// Holds once a run completes: no recipient dropped, none double-counted.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total == self.succeeded.len() + self.failed.len()
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.finished_at
            .duration_since(self.started_at)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// Drives a [`Sender`] across a recipient list, group by group.
pub struct Dispatcher {
    sender: Arc<dyn Sender>,
    policy: BatchPolicy,
}

impl Dispatcher {
    #[must_use]
    pub fn new(sender: Arc<dyn Sender>, policy: BatchPolicy) -> Self {
        Self { sender, policy }
    }

    /// Run the whole recipient list to completion.
    ///
    /// Group `i + 1` does not start until every send in group `i` has
    /// resolved. A failing send never aborts its siblings or the run; a
    /// send whose task fails to join is recorded as a generic failure so
    /// the accounting invariant still holds.
    pub async fn dispatch(
        &self,
        recipients: Vec<Recipient>,
        invalid: Vec<String>,
        message: Arc<Message>,
    ) -> DispatchStats {
        let mut stats = DispatchStats::begin(recipients.len(), invalid);
        let group_size = self.policy.effective_group_size();
        let group_count = recipients.len().div_ceil(group_size);

        // Slots keyed by input index, so completion order inside a group
        // cannot reorder the report
        let mut slots: Vec<Option<SendOutcome>> = vec![None; recipients.len()];

        for (group_index, group) in recipients.chunks(group_size).enumerate() {
            let base = group_index * group_size;
            info!(
                group = group_index + 1,
                groups = group_count,
                size = group.len(),
                "dispatching group"
            );

            let mut join_set = JoinSet::new();
            for (offset, recipient) in group.iter().cloned().enumerate() {
                let sender = Arc::clone(&self.sender);
                let message = Arc::clone(&message);
                join_set.spawn(async move {
                    let result = sender.send(&recipient, &message).await;
                    (base + offset, recipient, result)
                });
            }

            // Fan-in barrier: the group is done only when every spawned send
            // has resolved, successfully or not
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((index, recipient, Ok(()))) => {
                        slots[index] = Some(SendOutcome::success(recipient));
                    }
                    Ok((index, recipient, Err(error))) => {
                        debug!(recipient = %recipient, error = %error, "send exhausted");
                        slots[index] = Some(SendOutcome::failure(recipient, &error));
                    }
                    Err(join_error) => {
                        warn!(
                            group = group_index + 1,
                            error = %join_error,
                            "send task failed to join"
                        );
                    }
                }
            }

            // Any slot a join failure left unresolved still gets an outcome
            for index in base..base + group.len() {
                if slots[index].is_none() {
                    let error = SendError::Orchestration("send task aborted".to_string());
                    slots[index] = Some(SendOutcome::failure(recipients[index].clone(), &error));
                }
            }

            if group_index + 1 < group_count {
                debug!(
                    delay_ms = self.policy.inter_group_delay_ms,
                    "waiting before next group"
                );
                tokio::time::sleep(self.policy.inter_group_delay()).await;
            }
        }

        for slot in slots {
            if let Some(outcome) = slot {
                stats.record(outcome);
            }
        }

        stats.finished_at = SystemTime::now();
        info!(
            total = stats.total,
            succeeded = stats.succeeded.len(),
            failed = stats.failed.len(),
            "dispatch complete"
        );
        stats
    }
}
