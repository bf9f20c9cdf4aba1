use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::loop_worker::monitor_loop;
use super::{SignalSource, ViolationHandler};

/// Owns the monitor task for the active epoch. The cancellation token is
/// shared with the session so leaving the active state stops monitoring
/// without waiting on this controller.
pub struct IntegrityMonitor {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl IntegrityMonitor {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub async fn start_monitoring(
        &mut self,
        epoch: u64,
        source: &dyn SignalSource,
        handler: Arc<dyn ViolationHandler>,
        cancel_token: CancellationToken,
    ) -> Result<()> {
        // Re-arming must never leave the previous epoch's task running.
        self.stop_monitoring().await?;

        let focus_rx = match source.subscribe_focus_lost() {
            Ok(rx) => Some(rx),
            Err(err) => {
                warn!("focus-loss signal unavailable, continuing without it: {err:#}");
                None
            }
        };
        let input_rx = match source.subscribe_restricted_input() {
            Ok(rx) => Some(rx),
            Err(err) => {
                warn!("restricted-input signal unavailable, continuing without it: {err:#}");
                None
            }
        };

        info!(
            "integrity monitor armed for epoch {} (focus: {}, input: {})",
            epoch,
            focus_rx.is_some(),
            input_rx.is_some()
        );

        let handle = tokio::spawn(monitor_loop(
            epoch,
            focus_rx,
            input_rx,
            handler,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub async fn stop_monitoring(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("integrity monitor task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for IntegrityMonitor {
    fn default() -> Self {
        Self::new()
    }
}
