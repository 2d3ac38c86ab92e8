use {
    chrono::{SecondsFormat, Utc},
    std::time::Duration,
    tokio::{task::JoinHandle, time},
};

/// Periodically logs that the service is alive. Runs until the process exits.
pub struct Heartbeat {
    interval: Duration,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run_forever().await;
        })
    }

    pub async fn run_forever(self) -> ! {
        let mut interval = time::interval(self.interval);
        loop {
            interval.tick().await;
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
            tracing::info!("[HEARTBEAT] Alive at {now}");
            Metrics::get().heartbeats.inc();
        }
    }
}

#[derive(prometheus_metric_storage::MetricStorage)]
struct Metrics {
    /// Number of heartbeats emitted since startup.
    heartbeats: prometheus::IntCounter,
}

impl Metrics {
    fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn beats_once_per_interval() {
        let before = Metrics::get().heartbeats.get();
        let handle = Heartbeat::new(Duration::from_secs(10)).spawn();

        // First beat is immediate, then one every 10 seconds.
        time::sleep(Duration::from_secs(25)).await;
        handle.abort();

        assert_eq!(Metrics::get().heartbeats.get() - before, 3);
    }
}
