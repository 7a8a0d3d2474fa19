//! One-way signal interface to the window-owning host shell.

use log::debug;
use tokio::sync::mpsc;

use crate::{NotesError, Result};

/// Requests the host shell can service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    /// Show and focus the main window. Idempotent when already visible.
    ShowWindow,
}

/// Interface to the host shell.
///
/// The engine only ever asks for one thing: bring the main window to front.
/// The call is fire-and-forget; a failure means the shell is unavailable and
/// the caller logs it without retrying.
pub trait HostShell: Send + Sync {
    fn show_window(&self) -> Result<()>;
}

/// Forwards signals to the host shell glue over an unbounded channel.
pub struct ChannelHost {
    tx: mpsc::UnboundedSender<HostSignal>,
}

impl ChannelHost {
    /// Creates the host handle plus the receiving end the shell glue drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl HostShell for ChannelHost {
    fn show_window(&self) -> Result<()> {
        self.tx
            .send(HostSignal::ShowWindow)
            .map_err(|_| NotesError::HostUnavailable {
                message: "host shell channel closed".to_string(),
            })
    }
}

/// Host stub for headless runs; every signal is reported unavailable.
pub struct NullHost;

impl HostShell for NullHost {
    fn show_window(&self) -> Result<()> {
        debug!("No host shell attached, show-window request dropped");
        Err(NotesError::HostUnavailable {
            message: "no host shell attached".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_host_delivers_signal() {
        let (host, mut rx) = ChannelHost::new();
        host.show_window().unwrap();
        host.show_window().unwrap();
        assert_eq!(rx.try_recv().unwrap(), HostSignal::ShowWindow);
        assert_eq!(rx.try_recv().unwrap(), HostSignal::ShowWindow);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_host_reports_closed_channel() {
        let (host, rx) = ChannelHost::new();
        drop(rx);
        assert!(matches!(
            host.show_window(),
            Err(NotesError::HostUnavailable { .. })
        ));
    }

    #[test]
    fn test_null_host_is_always_unavailable() {
        assert!(NullHost.show_window().is_err());
    }
}
