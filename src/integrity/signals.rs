use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const SIGNAL_CAPACITY: usize = 64;

/// Inputs that are swallowed while a quiz is running.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RestrictedInput {
    ContextMenu,
    Copy,
    Paste,
    SelectAll,
    Print,
}

impl RestrictedInput {
    /// Ctrl+C / Ctrl+V / Ctrl+A / Ctrl+P, case-insensitive.
    pub fn from_key_combo(ctrl: bool, key: char) -> Option<Self> {
        if !ctrl {
            return None;
        }
        match key.to_ascii_lowercase() {
            'c' => Some(RestrictedInput::Copy),
            'v' => Some(RestrictedInput::Paste),
            'a' => Some(RestrictedInput::SelectAll),
            'p' => Some(RestrictedInput::Print),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RestrictedInput::ContextMenu => "context menu",
            RestrictedInput::Copy => "copy",
            RestrictedInput::Paste => "paste",
            RestrictedInput::SelectAll => "select all",
            RestrictedInput::Print => "print",
        }
    }
}

/// Where focus and input signals come from. Dropping a receiver
/// unsubscribes it. A subscription error means the signal is unavailable
/// on this platform; the monitor carries on without it.
pub trait SignalSource: Send + Sync {
    fn subscribe_focus_lost(&self) -> Result<broadcast::Receiver<()>>;
    fn subscribe_restricted_input(&self) -> Result<broadcast::Receiver<RestrictedInput>>;
}

/// Signal source fed by the presentation layer.
pub struct ChannelSignalSource {
    focus_tx: broadcast::Sender<()>,
    input_tx: broadcast::Sender<RestrictedInput>,
}

impl ChannelSignalSource {
    pub fn new() -> Self {
        let (focus_tx, _) = broadcast::channel(SIGNAL_CAPACITY);
        let (input_tx, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self { focus_tx, input_tx }
    }

    /// Returns how many subscribers saw the signal; zero when no quiz is
    /// being monitored.
    pub fn report_focus_lost(&self) -> usize {
        self.focus_tx.send(()).unwrap_or(0)
    }

    pub fn report_restricted_input(&self, input: RestrictedInput) -> usize {
        self.input_tx.send(input).unwrap_or(0)
    }

    pub fn focus_subscribers(&self) -> usize {
        self.focus_tx.receiver_count()
    }
}

impl Default for ChannelSignalSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSource for ChannelSignalSource {
    fn subscribe_focus_lost(&self) -> Result<broadcast::Receiver<()>> {
        Ok(self.focus_tx.subscribe())
    }

    fn subscribe_restricted_input(&self) -> Result<broadcast::Receiver<RestrictedInput>> {
        Ok(self.input_tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_clipboard_shortcuts() {
        assert_eq!(RestrictedInput::from_key_combo(true, 'c'), Some(RestrictedInput::Copy));
        assert_eq!(RestrictedInput::from_key_combo(true, 'V'), Some(RestrictedInput::Paste));
        assert_eq!(RestrictedInput::from_key_combo(true, 'a'), Some(RestrictedInput::SelectAll));
        assert_eq!(RestrictedInput::from_key_combo(true, 'p'), Some(RestrictedInput::Print));
        assert_eq!(RestrictedInput::from_key_combo(true, 'x'), None);
        assert_eq!(RestrictedInput::from_key_combo(false, 'c'), None);
    }

    #[test]
    fn reports_reach_only_live_subscribers() {
        let source = ChannelSignalSource::new();
        assert_eq!(source.report_focus_lost(), 0);

        let mut rx = source.subscribe_focus_lost().unwrap();
        assert_eq!(source.focus_subscribers(), 1);
        assert_eq!(source.report_focus_lost(), 1);
        assert!(rx.try_recv().is_ok());

        drop(rx);
        assert_eq!(source.focus_subscribers(), 0);
        assert_eq!(source.report_focus_lost(), 0);
    }
}
