//! Health monitor: turns missed timeout windows into a unit-wide fault.

use std::time::Duration;

use linechat_core::{ChannelKind, LivenessEvent};
use tokio::sync::mpsc;

/// How many missed windows a channel may accumulate before the unit is
/// torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultPolicy {
    /// Consecutive unhealthy events on one channel that raise a fault.
    /// Values below 1 behave like 1.
    pub max_consecutive_timeouts: u32,
}

impl Default for FaultPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_timeouts: 1,
        }
    }
}

/// Raised by the monitor; always answered with a reconnect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{channel} channel missed {missed} consecutive {timeout:?} timeout window(s)")]
pub struct TimeoutFault {
    pub channel: ChannelKind,
    pub missed: u32,
    pub timeout: Duration,
}

/// Single consumer of the liveness events of one connected unit.
#[derive(Debug, Clone, Default)]
pub struct HealthMonitor {
    policy: FaultPolicy,
    tap: Option<mpsc::UnboundedSender<LivenessEvent>>,
}

impl HealthMonitor {
    #[must_use]
    pub const fn new(policy: FaultPolicy) -> Self {
        Self { policy, tap: None }
    }

    /// Forward a copy of every observed event to `tap`.
    #[must_use]
    pub fn with_tap(mut self, tap: Option<mpsc::UnboundedSender<LivenessEvent>>) -> Self {
        self.tap = tap;
        self
    }

    /// Consume events until the policy is violated.
    ///
    /// Never returns while the events stay healthy; the supervisor drops the
    /// future when another member of the unit finishes first.
    pub async fn watch(&self, events: &mut mpsc::UnboundedReceiver<LivenessEvent>) -> TimeoutFault {
        let threshold = self.policy.max_consecutive_timeouts.max(1);
        let mut read_missed = 0u32;
        let mut send_missed = 0u32;

        while let Some(event) = events.recv().await {
            if let Some(tap) = &self.tap {
                let _ = tap.send(event.clone());
            }

            let missed = match event.channel {
                ChannelKind::Read => &mut read_missed,
                ChannelKind::Send => &mut send_missed,
            };

            if event.healthy {
                *missed = 0;
                tracing::debug!(channel = %event.channel, "{}", event.notification());
                continue;
            }

            *missed += 1;
            tracing::warn!(
                channel = %event.channel,
                missed = *missed,
                threshold,
                "{}",
                event.notification()
            );
            if *missed >= threshold {
                return TimeoutFault {
                    channel: event.channel,
                    missed: *missed,
                    timeout: event.timeout,
                };
            }
        }

        // Every producer is gone; the unit is already unwinding.
        std::future::pending().await
    }
}
