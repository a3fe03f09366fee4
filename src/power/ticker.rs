//! Global power tick source

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::core::error::{Result, SignalError};
use crate::core::sync::lock;
use crate::power::grid::{PowerEvent, SharedGrid};

/// Ticks a shared grid on a fixed interval until stopped or dropped
pub struct PowerTicker {
    handle: JoinHandle<()>,
}

impl PowerTicker {
    /// Start ticking on the current tokio runtime.
    ///
    /// Every event a tick produces is handed to `sink`, outside the grid lock.
    pub fn spawn<F>(grid: SharedGrid, interval: Duration, sink: F) -> Result<Self>
    where
        F: Fn(PowerEvent) + Send + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|e| SignalError::Runtime(format!("power ticker needs a tokio runtime: {}", e)))?;

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            info!(?interval, "power ticker started");

            loop {
                ticker.tick().await;
                let (tick, events) = {
                    let mut grid = lock(&grid);
                    let events = grid.tick();
                    (grid.tick_count(), events)
                };
                debug!(tick, events = events.len(), "power tick");
                for event in events {
                    sink(event);
                }
            }
        });

        Ok(Self { handle })
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for PowerTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::grid::PowerGrid;
    use crate::power::subsystem::{Subsystem, SubsystemKind};
    use std::sync::{Arc, Mutex};

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ticker_ticks_and_reports() {
        let mut grid = PowerGrid::new();
        let reactor = grid.add(Subsystem::new(SubsystemKind::Reactor));
        grid.get_mut(reactor).unwrap().stored_fuel = 2;
        grid.power_on(reactor).unwrap();
        let grid = grid.into_shared();

        let notices = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notices);
        let ticker = PowerTicker::spawn(Arc::clone(&grid), Duration::from_millis(10), move |e| {
            sink.lock().unwrap().push(e.notice());
        })
        .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        ticker.stop();

        assert!(lock(&grid).tick_count() >= 3);
        assert!(!lock(&grid).get(reactor).unwrap().powered);
        assert_eq!(
            notices.lock().unwrap().as_slice(),
            &["Stock Reactor falters and powers off as it runs out of fuel.".to_string()]
        );
    }

    #[test]
    fn test_spawn_requires_runtime() {
        let grid = PowerGrid::new().into_shared();
        assert!(PowerTicker::spawn(grid, Duration::from_millis(10), |_| {}).is_err());
    }
}
