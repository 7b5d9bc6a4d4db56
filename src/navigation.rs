//! Navigation signals emitted when the session can no longer be recovered.
//!
//! The client never navigates on its own; it pushes a `Redirect` into a
//! channel and the embedding application decides what to do with it (a browser
//! shell changes location, the CLI prints a hint).

use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Redirect {
    Login,
    Unauthorized,
}

impl Redirect {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Unauthorized => "/unauthorized",
        }
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "redirect to {}", self.path())
    }
}

/// Sending half, owned by the API client.
#[derive(Clone, Debug)]
pub struct Navigator {
    tx: mpsc::UnboundedSender<Redirect>,
}

/// Receiving half, owned by the application shell.
#[derive(Debug)]
pub struct NavigationEvents {
    rx: mpsc::UnboundedReceiver<Redirect>,
}

impl Navigator {
    #[must_use]
    pub fn channel() -> (Self, NavigationEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, NavigationEvents { rx })
    }

    pub fn redirect(&self, target: Redirect) {
        if self.tx.send(target).is_err() {
            debug!("navigation receiver dropped, ignoring {}", target);
        }
    }
}

impl NavigationEvents {
    /// Returns the next pending signal without waiting.
    pub fn try_next(&mut self) -> Option<Redirect> {
        self.rx.try_recv().ok()
    }

    /// Drains every pending signal in emission order.
    pub fn drain(&mut self) -> Vec<Redirect> {
        let mut pending = Vec::new();
        while let Ok(target) = self.rx.try_recv() {
            pending.push(target);
        }
        pending
    }

    pub async fn recv(&mut self) -> Option<Redirect> {
        self.rx.recv().await
    }
}
