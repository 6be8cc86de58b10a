use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::dao::invitation::InvitationDao;

/// Periodically marks overdue pending invitations as expired.
pub struct InvitationSweeper {
    invitations: Arc<InvitationDao>,
    interval: Duration,
}

impl InvitationSweeper {
    pub fn new(invitations: Arc<InvitationDao>, interval: Duration) -> Self {
        Self {
            invitations,
            interval,
        }
    }

    /// Spawns the sweep loop. Returns `None` when the interval is zero.
    pub fn spawn(self) -> Option<JoinHandle<()>> {
        if self.interval.is_zero() {
            info!("Invitation sweeper disabled");
            return None;
        }

        info!(interval_secs = self.interval.as_secs(), "Starting invitation sweeper");
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.invitations.expire_overdue().await {
                    warn!(error = %e, "Invitation sweep failed");
                }
            }
        }))
    }
}
