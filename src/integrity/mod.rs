pub mod controller;
pub mod loop_worker;
pub mod signals;

use async_trait::async_trait;

pub use controller::IntegrityMonitor;
pub use signals::{ChannelSignalSource, RestrictedInput, SignalSource};

/// Receives the signals observed for one active epoch. Implementations must
/// ignore calls for an epoch that is no longer current.
#[async_trait]
pub trait ViolationHandler: Send + Sync + 'static {
    async fn on_focus_lost(&self, epoch: u64);
    async fn on_restricted_input(&self, epoch: u64, input: RestrictedInput);
}
