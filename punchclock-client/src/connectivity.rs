use crate::api_client::ApiClient;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connectivity::Online => write!(f, "online"),
            Connectivity::Offline => write!(f, "offline"),
        }
    }
}

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Two state reachability observable.
///
/// At most one callback is registered. It runs once per offline to online transition, on the
/// thread that reported the transition, so it must be cheap and idempotent.
pub struct ConnectivityMonitor {
    state: watch::Sender<Connectivity>,
    on_online: Mutex<Option<Callback>>,
}

impl ConnectivityMonitor {
    pub fn new(initial: Connectivity) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            on_online: Mutex::new(None),
        }
    }

    pub fn state(&self) -> Connectivity {
        *self.state.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.state() == Connectivity::Online
    }

    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }

    /// Replaces the registered callback.
    pub fn on_online(&self, callback: impl Fn() + Send + Sync + 'static) {
        let mut slot = self.on_online.lock().unwrap_or_else(|x| x.into_inner());
        *slot = Some(Arc::new(callback));
    }

    /// Applies a reachability signal. Returns true when the state changed.
    pub fn set(&self, next: Connectivity) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });

        if !changed {
            return false;
        }

        info!("terminal is {next}");
        if next == Connectivity::Online {
            let callback = self
                .on_online
                .lock()
                .unwrap_or_else(|x| x.into_inner())
                .clone();
            if let Some(callback) = callback {
                callback();
            }
        }

        true
    }

    /// Probes the server once and applies the result.
    pub async fn probe(&self, api: &ApiClient) -> Connectivity {
        let next = match api.health_check().await {
            Ok(_) => Connectivity::Online,
            Err(err) => {
                debug!("health probe failed {err}");
                Connectivity::Offline
            }
        };
        self.set(next);
        next
    }

    /// Probes forever at the given interval.
    pub async fn run(self: Arc<Self>, api: ApiClient, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.probe(&api).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(monitor: &ConnectivityMonitor) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        monitor.on_online(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        calls
    }

    #[test]
    fn fires_once_per_transition() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        let calls = counting(&monitor);

        assert!(monitor.set(Connectivity::Online));
        assert!(!monitor.set(Connectivity::Online));
        assert!(!monitor.set(Connectivity::Online));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(monitor.set(Connectivity::Offline));
        assert!(monitor.set(Connectivity::Online));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn going_offline_does_not_fire() {
        let monitor = ConnectivityMonitor::new(Connectivity::Online);
        let calls = counting(&monitor);

        monitor.set(Connectivity::Offline);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!monitor.is_online());
    }

    #[test]
    fn replacing_callback_keeps_single_subscription() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        let first = counting(&monitor);
        let second = counting(&monitor);

        monitor.set(Connectivity::Online);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn watchers_see_transitions() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        let mut rx = monitor.subscribe();

        monitor.set(Connectivity::Online);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Connectivity::Online);
    }
}
