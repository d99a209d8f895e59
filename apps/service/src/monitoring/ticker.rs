use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

/// Spawn a loop that runs `job` every `period` until `shutdown` flips to `true`
/// or its sender is dropped.
///
/// A job that is running when shutdown is signalled finishes first. A job that
/// overruns its period delays the next run instead of stacking runs.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    run_immediately: bool,
    mut shutdown: watch::Receiver<bool>,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let first = if run_immediately { Instant::now() } else { Instant::now() + period };
        let mut ticker = interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    debug!(task = name, "Periodic task tick");
                    job().await;
                }
            }
        }

        debug!(task = name, "Periodic task stopped");
    })
}
