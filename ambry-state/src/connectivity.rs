//! Connectivity seam: "are we online, and tell me when that changes".

use tokio::sync::watch;

pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
    /// A watch channel carrying the current online flag. Subscribers use
    /// `changed()` to react to transitions.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Connectivity source driven by explicit `set_online` calls. Hosts wire
/// their platform network monitor into this; tests flip it directly.
pub struct ToggleConnectivity {
    tx: watch::Sender<bool>,
}

impl ToggleConnectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx }
    }

    pub fn set_online(&self, online: bool) {
        // send_if_modified so resubscribers only wake on real transitions.
        self.tx.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
    }
}

impl Connectivity for ToggleConnectivity {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transitions_are_observable() {
        let conn = ToggleConnectivity::new(false);
        assert!(!conn.is_online());

        let mut rx = conn.subscribe();
        conn.set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
        assert!(conn.is_online());
    }

    #[test]
    fn redundant_set_does_not_signal() {
        let conn = ToggleConnectivity::new(true);
        let mut rx = conn.subscribe();
        rx.borrow_and_update();
        conn.set_online(true);
        assert!(!rx.has_changed().unwrap());
    }
}
