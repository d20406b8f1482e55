use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle, time::MissedTickBehavior};
use tracing::{info, warn};

use crate::epaper::catalog::Catalog;

// ───────────── Worker types ─────────────
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReloadRequest {
    Interval,
    Signal,
}

#[derive(Clone)]
pub struct ReloadWorker {
    pub tx: mpsc::Sender<ReloadRequest>,
}

impl ReloadWorker {
    /// Queues a reload. Requests arriving while one is pending are coalesced.
    pub fn request(&self, reason: ReloadRequest) {
        if let Err(e) = self.tx.try_send(reason) {
            tracing::debug!(?reason, error = %e, "reload already pending; dropping request");
        }
    }
}

/// Spawn the task that applies catalog reloads one at a time.
pub fn spawn_reload_worker(catalog: Arc<Catalog>) -> (ReloadWorker, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<ReloadRequest>(1);

    let handle = tokio::spawn(async move {
        while let Some(reason) = rx.recv().await {
            match catalog.reload().await {
                Ok(entries) => info!(?reason, entries, "catalog reload applied"),
                // Catalog::reload already logged and kept the old snapshot.
                Err(e) => warn!(?reason, error = %e, "catalog reload skipped"),
            }
        }
    });

    (ReloadWorker { tx }, handle)
}

/// Feed the worker on a fixed period. The first tick fires after `period`.
pub fn spawn_interval_trigger(worker: ReloadWorker, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if worker.tx.is_closed() {
                break;
            }
            worker.request(ReloadRequest::Interval);
        }
    })
}

/// Feed the worker on every SIGHUP.
#[cfg(unix)]
pub fn spawn_sighup_trigger(worker: ReloadWorker) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = signal(SignalKind::hangup())?;
    Ok(tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            info!("SIGHUP received; reloading catalog");
            worker.request(ReloadRequest::Signal);
        }
    }))
}
