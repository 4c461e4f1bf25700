//! Periodic background jobs for the long-running service.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use invtrack_core::{RateCache, RateProvider};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::projector::Projector;

/// Runs the forecast sweep, acknowledged-forecast cleanup and exchange
/// rate refresh on fixed intervals until stopped.
pub struct Scheduler {
    projector: Arc<Projector>,
    sweep_interval: Duration,
    cleanup_interval: Duration,
    rates: Option<(Arc<RateCache>, Arc<dyn RateProvider>, Duration)>,
    shutdown: watch::Sender<bool>,
}

impl Scheduler {
    pub fn new(projector: Arc<Projector>, sweep_interval: Duration, cleanup_interval: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            projector,
            sweep_interval,
            cleanup_interval,
            rates: None,
            shutdown,
        }
    }

    /// Also refresh `cache` from `provider` every `interval`.
    pub fn with_rate_refresh(
        mut self,
        cache: Arc<RateCache>,
        provider: Arc<dyn RateProvider>,
        interval: Duration,
    ) -> Self {
        self.rates = Some((cache, provider, interval));
        self
    }

    /// Spawn one task per job. Each job runs once immediately.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let projector = Arc::clone(&self.projector);
        handles.push(self.spawn_job("forecast sweep", self.sweep_interval, move || {
            let projector = Arc::clone(&projector);
            async move {
                if let Err(e) = projector.sweep(Local::now().date_naive()).await {
                    error!(error = %e, "Forecast sweep failed");
                }
            }
        }));

        let projector = Arc::clone(&self.projector);
        handles.push(self.spawn_job("forecast cleanup", self.cleanup_interval, move || {
            let projector = Arc::clone(&projector);
            async move {
                if let Err(e) = projector.cleanup(Local::now().date_naive()).await {
                    error!(error = %e, "Forecast cleanup failed");
                }
            }
        }));

        if let Some((cache, provider, interval)) = &self.rates {
            let cache = Arc::clone(cache);
            let provider = Arc::clone(provider);
            handles.push(self.spawn_job("rate refresh", *interval, move || {
                let cache = Arc::clone(&cache);
                let provider = Arc::clone(&provider);
                async move {
                    cache.refresh(provider.as_ref()).await;
                }
            }));
        }

        handles
    }

    /// Signal every job to stop after its current run.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    fn spawn_job<F, Fut>(&self, name: &'static str, interval: Duration, job: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            info!(job = name, interval_secs = interval.as_secs(), "Background job started");
            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = timer.tick() => job().await,
                    _ = shutdown.changed() => break,
                }
            }
            info!(job = name, "Background job stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{invoice, ymd};
    use crate::{InvoiceStore, MemoryStore};
    use invtrack_core::Frequency;
    use invtrack_core::models::config::ForecastConfig;

    #[tokio::test]
    async fn test_scheduler_runs_sweep_and_stops() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_invoice(&invoice("1", "Contoso", "CTR-1", ymd(2020, 1, 10), Frequency::Monthly))
            .await
            .unwrap();
        let projector = Arc::new(Projector::new(store.clone(), ForecastConfig::default()));

        let scheduler = Scheduler::new(projector, Duration::from_millis(20), Duration::from_millis(20));
        let handles = scheduler.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.stop();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .unwrap()
                .unwrap();
        }

        assert_eq!(store.list_expected().await.unwrap().len(), 1);
    }
}
