//! Periodic `TICK` driver.

use super::SessionController;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What paces the loop. Tests drive beats by hand.
enum Cadence {
    Every(Duration),
    #[cfg(test)]
    Manual(tokio::sync::mpsc::UnboundedReceiver<()>),
}

impl Cadence {
    /// Wait for the next beat. `false` once a manual beat source is gone.
    async fn next_beat(&mut self) -> bool {
        match self {
            Cadence::Every(interval) => {
                tokio::time::sleep(*interval).await;
                true
            }
            #[cfg(test)]
            Cadence::Manual(rx) => rx.recv().await.is_some(),
        }
    }
}

/// Handle to the background tick task.
pub(crate) struct Ticker {
    stop_tx: watch::Sender<bool>,
    iterations: watch::Receiver<u64>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Sleep `interval`, then tick if the session is running; repeat until shutdown.
    pub fn spawn(controller: SessionController, interval: Duration) -> Self {
        Self::spawn_with(controller, Cadence::Every(interval))
    }

    #[cfg(test)]
    fn spawn_manual(controller: SessionController) -> (Self, tokio::sync::mpsc::UnboundedSender<()>) {
        let (beat_tx, beat_rx) = tokio::sync::mpsc::unbounded_channel();
        (Self::spawn_with(controller, Cadence::Manual(beat_rx)), beat_tx)
    }

    fn spawn_with(controller: SessionController, cadence: Cadence) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (iter_tx, iterations) = watch::channel(0u64);
        let handle = tokio::spawn(tick_loop(controller, cadence, stop_rx, iter_tx));
        Self {
            stop_tx,
            iterations,
            handle,
        }
    }

    /// Count of completed iterations, idle ones included.
    pub fn iterations(&self) -> watch::Receiver<u64> {
        self.iterations.clone()
    }

    /// Stop scheduling iterations and wait for the loop to exit.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "ticker task ended abnormally");
        }
    }
}

async fn tick_loop(
    controller: SessionController,
    mut cadence: Cadence,
    mut stop_rx: watch::Receiver<bool>,
    iter_tx: watch::Sender<u64>,
) {
    let mut count = 0u64;
    loop {
        tokio::select! {
            beat = cadence.next_beat() => {
                if !beat {
                    break;
                }
            }
            // Also resolves if the handle was dropped without a shutdown.
            _ = stop_rx.changed() => break,
        }
        if *stop_rx.borrow() {
            break;
        }

        // Running is re-read under the session lock each iteration, so a STOP issued
        // between beats is honored here.
        match controller.tick_if_running().await {
            Ok(Some(state)) => {
                tracing::trace!(elapsed = state.elapsed_seconds, running = state.running, "tick");
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "tick failed"),
        }

        count += 1;
        iter_tx.send_replace(count);
    }
    tracing::debug!(iterations = count, "ticker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannelStore;
    use crate::model::SessionState;
    use crate::oracle::{BuiltinStopwatch, Invoker};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn controller() -> SessionController {
        let store = Arc::new(MemoryChannelStore::default());
        let oracle = Arc::new(BuiltinStopwatch::new(store.clone()));
        let (tx, _rx) = mpsc::unbounded_channel();
        SessionController::new(Invoker::new(store, oracle), tx)
    }

    async fn wait_iterations(rx: &mut watch::Receiver<u64>, n: u64) {
        rx.wait_for(|count| *count >= n).await.unwrap();
    }

    #[tokio::test]
    async fn start_tick_stop_reset_scenario() {
        let controller = controller();
        assert_eq!(controller.initialize().await.unwrap(), SessionState::default());

        let (ticker, beats) = Ticker::spawn_manual(controller.clone());
        let mut iterations = ticker.iterations();

        controller.start().await.unwrap();
        for _ in 0..3 {
            beats.send(()).unwrap();
        }
        wait_iterations(&mut iterations, 3).await;
        assert_eq!(
            controller.snapshot(),
            SessionState {
                elapsed_seconds: 3,
                running: true
            }
        );

        controller.stop().await.unwrap();
        for _ in 0..2 {
            beats.send(()).unwrap();
        }
        wait_iterations(&mut iterations, 5).await;
        assert_eq!(
            controller.snapshot(),
            SessionState {
                elapsed_seconds: 3,
                running: false
            }
        );

        assert_eq!(controller.reset().await.unwrap(), SessionState::default());
        ticker.shutdown().await;
    }

    #[tokio::test]
    async fn idle_iterations_do_not_invoke() {
        let controller = controller();
        controller.initialize().await.unwrap();
        let (ticker, beats) = Ticker::spawn_manual(controller.clone());
        let mut iterations = ticker.iterations();

        for _ in 0..4 {
            beats.send(()).unwrap();
        }
        wait_iterations(&mut iterations, 4).await;
        assert_eq!(controller.snapshot(), SessionState::default());
        ticker.shutdown().await;
    }

    #[tokio::test]
    async fn real_cadence_ticks_while_running() {
        let controller = controller();
        controller.initialize().await.unwrap();
        controller.start().await.unwrap();

        let ticker = Ticker::spawn(controller.clone(), Duration::from_millis(5));
        let mut iterations = ticker.iterations();
        wait_iterations(&mut iterations, 3).await;

        let stopped = controller.stop().await.unwrap();
        assert!(stopped.elapsed_seconds >= 3);
        let seen = *iterations.borrow();
        wait_iterations(&mut iterations, seen + 2).await;
        assert_eq!(controller.snapshot().elapsed_seconds, stopped.elapsed_seconds);

        ticker.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let controller = controller();
        let ticker = Ticker::spawn(controller, Duration::from_secs(3600));
        let iterations = ticker.iterations();
        tokio::time::timeout(Duration::from_secs(5), ticker.shutdown())
            .await
            .expect("ticker did not stop");
        assert_eq!(*iterations.borrow(), 0);
    }
}
