use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::task::JoinHandle;

/// Runs `task` now, then again `delay` after each run completes.
///
/// The next run is only scheduled once the previous one has finished, so runs
/// of the same task never overlap. The loop lives until the handle is aborted
/// or the runtime shuts down.
pub fn spawn_periodic<F, Fut>(name: &'static str, delay: Duration, task: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    spawn_periodic_after(name, Duration::ZERO, delay, task)
}

/// Like `spawn_periodic`, but the first run waits `first_delay`
pub fn spawn_periodic_after<F, Fut>(
    name: &'static str,
    first_delay: Duration,
    delay: Duration,
    mut task: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if !first_delay.is_zero() {
            tokio::time::sleep(first_delay).await;
        }
        loop {
            task().await;
            debug!("{} finished, next run in {:?}", name, delay);
            tokio::time::sleep(delay).await;
        }
    })
}
