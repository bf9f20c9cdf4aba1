use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use super::signals::RestrictedInput;
use super::ViolationHandler;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

enum MonitorSignal {
    FocusLost(Result<(), RecvError>),
    Input(Result<RestrictedInput, RecvError>),
}

pub async fn monitor_loop(
    epoch: u64,
    mut focus_rx: Option<broadcast::Receiver<()>>,
    mut input_rx: Option<broadcast::Receiver<RestrictedInput>>,
    handler: Arc<dyn ViolationHandler>,
    cancel_token: CancellationToken,
) {
    loop {
        let signal = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("integrity monitor for epoch {} shutting down", epoch);
                break;
            }
            res = next_signal(&mut focus_rx) => MonitorSignal::FocusLost(res),
            res = next_signal(&mut input_rx) => MonitorSignal::Input(res),
        };

        match signal {
            MonitorSignal::FocusLost(Ok(())) => handler.on_focus_lost(epoch).await,
            MonitorSignal::Input(Ok(input)) => handler.on_restricted_input(epoch, input).await,
            MonitorSignal::FocusLost(Err(RecvError::Lagged(skipped))) => {
                log_warn!("integrity monitor lagged; {} focus signals dropped", skipped);
            }
            MonitorSignal::Input(Err(RecvError::Lagged(skipped))) => {
                log_warn!("integrity monitor lagged; {} input signals dropped", skipped);
            }
            MonitorSignal::FocusLost(Err(RecvError::Closed)) => {
                log_warn!("focus signal source closed; focus check disabled");
                focus_rx = None;
            }
            MonitorSignal::Input(Err(RecvError::Closed)) => {
                log_warn!("input signal source closed; input check disabled");
                input_rx = None;
            }
        }
    }
}

/// Pends forever for a missing subscription so `select!` just skips it.
async fn next_signal<T: Clone>(rx: &mut Option<broadcast::Receiver<T>>) -> Result<T, RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
