use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::collectors::Sampler;
use crate::transport::Transport;

/// Loop settings derived from the resolved config and CLI flags.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub device_id: String,
    pub interval: Duration,
    /// Stop after this many successful cycles; `0` runs until interrupted.
    pub count: u64,
    /// Collect but never hand samples to the transport.
    pub dry_run: bool,
    pub verbose: bool,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The configured count was reached.
    CountReached,
    /// An interrupt was received.
    Interrupted,
}

/// Drive the collect → send cycle until the count is reached or `shutdown`
/// flips to `true`.
///
/// Failed collections and failed sends drop the sample and wait one full
/// interval; only successful cycles count towards `count`. After a success
/// the loop sleeps for whatever is left of the interval.
///
/// Returns the exit reason and the number of successful cycles.
pub async fn run<S, T>(
    sampler: &S,
    transport: &T,
    opts: &RunOptions,
    mut shutdown: watch::Receiver<bool>,
) -> (Exit, u64)
where
    S: Sampler,
    T: Transport,
{
    let mut sent: u64 = 0;

    loop {
        if *shutdown.borrow() {
            return (Exit::Interrupted, sent);
        }

        let started = Instant::now();

        let sample = match sampler.collect(&opts.device_id).await {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Error collecting system stats: {e:#}");
                if !pause(opts.interval, &mut shutdown).await {
                    return (Exit::Interrupted, sent);
                }
                continue;
            }
        };

        if opts.dry_run {
            if opts.verbose {
                match serde_json::to_string_pretty(&sample) {
                    Ok(json) => info!("Dry run, sample not sent\n{json}"),
                    Err(e) => warn!("Failed to render sample: {e}"),
                }
            }
        } else if !transport.send(&sample).await {
            if !pause(opts.interval, &mut shutdown).await {
                return (Exit::Interrupted, sent);
            }
            continue;
        }

        sent += 1;
        if opts.verbose {
            info!(sent, "Sent {sent} samples");
        }

        if opts.count > 0 && sent >= opts.count {
            return (Exit::CountReached, sent);
        }

        let remaining = opts.interval.saturating_sub(started.elapsed());
        if !pause(remaining, &mut shutdown).await {
            return (Exit::Interrupted, sent);
        }
    }
}

/// Sleep for `duration` unless shutdown is signalled first.
///
/// Returns `false` when the loop should stop.
async fn pause(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        changed = shutdown.changed() => match changed {
            Ok(()) => !*shutdown.borrow(),
            // Sender gone: nobody can interrupt us any more, finish the sleep.
            Err(_) => {
                tokio::time::sleep(duration).await;
                true
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::{memory::MemoryUsage, Sample};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// Sampler that fails on the cycles listed in `fail_on` (1-based).
    struct FakeSampler {
        calls: Cell<u64>,
        fail_on: Vec<u64>,
        /// Flipped to `true` while the first collection is in flight.
        interrupt: Option<watch::Sender<bool>>,
    }

    impl FakeSampler {
        fn new(fail_on: Vec<u64>) -> Self {
            Self {
                calls: Cell::new(0),
                fail_on,
                interrupt: None,
            }
        }
    }

    impl Sampler for FakeSampler {
        async fn collect(&self, device_id: &str) -> anyhow::Result<Sample> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if let Some(ref tx) = self.interrupt {
                tx.send(true).unwrap();
            }
            if self.fail_on.contains(&n) {
                anyhow::bail!("mpstat not found");
            }
            Ok(Sample {
                device_id: device_id.to_string(),
                timestamp: n as i64,
                cpu_usage_percent: None,
                memory: MemoryUsage::default(),
                network: vec![],
                disk: vec![],
            })
        }
    }

    /// Transport replaying scripted results, defaulting to success.
    #[derive(Default)]
    struct FakeTransport {
        script: RefCell<VecDeque<bool>>,
        attempts: Cell<u64>,
        delivered: RefCell<Vec<i64>>,
        /// Flipped to `true` while a send is in flight.
        interrupt: Option<watch::Sender<bool>>,
    }

    impl FakeTransport {
        fn scripted(results: &[bool]) -> Self {
            Self {
                script: RefCell::new(results.iter().copied().collect()),
                ..Default::default()
            }
        }
    }

    impl Transport for FakeTransport {
        async fn send(&self, sample: &Sample) -> bool {
            self.attempts.set(self.attempts.get() + 1);
            if let Some(ref tx) = self.interrupt {
                tx.send(true).unwrap();
            }
            let ok = self.script.borrow_mut().pop_front().unwrap_or(true);
            if ok {
                self.delivered.borrow_mut().push(sample.timestamp);
            }
            ok
        }
    }

    fn opts(count: u64) -> RunOptions {
        RunOptions {
            device_id: "dev1".to_string(),
            interval: Duration::from_secs(5),
            count,
            dry_run: false,
            verbose: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_three_sends_exactly_three() {
        let sampler = FakeSampler::new(vec![]);
        let transport = FakeTransport::default();
        let (_tx, rx) = watch::channel(false);

        let (exit, sent) = run(&sampler, &transport, &opts(3), rx).await;

        assert_eq!(exit, Exit::CountReached);
        assert_eq!(sent, 3);
        assert_eq!(transport.attempts.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failures_do_not_consume_count() {
        let sampler = FakeSampler::new(vec![]);
        let transport = FakeTransport::scripted(&[true, false, false, true, false, true]);
        let (_tx, rx) = watch::channel(false);

        let (exit, sent) = run(&sampler, &transport, &opts(3), rx).await;

        assert_eq!(exit, Exit::CountReached);
        assert_eq!(sent, 3);
        assert_eq!(transport.attempts.get(), 6);
        // Failed samples are dropped, never resent.
        assert_eq!(*transport.delivered.borrow(), vec![1, 4, 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collection_failure_retries_after_full_interval() {
        let sampler = FakeSampler::new(vec![1]);
        let transport = FakeTransport::default();
        let (_tx, rx) = watch::channel(false);

        let started = Instant::now();
        let (_, sent) = run(&sampler, &transport, &opts(1), rx).await;

        assert_eq!(sent, 1);
        assert_eq!(sampler.calls.get(), 2);
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cadence_close_to_interval() {
        let sampler = FakeSampler::new(vec![]);
        let transport = FakeTransport::default();
        let (_tx, rx) = watch::channel(false);

        let started = Instant::now();
        run(&sampler, &transport, &opts(3), rx).await;

        // Two sleeps between three successful cycles; no sleep after the last.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_never_sends() {
        let sampler = FakeSampler::new(vec![]);
        let transport = FakeTransport::default();
        let (_tx, rx) = watch::channel(false);
        let options = RunOptions {
            dry_run: true,
            ..opts(2)
        };

        let (exit, sent) = run(&sampler, &transport, &options, rx).await;

        assert_eq!(exit, Exit::CountReached);
        assert_eq!(sent, 2);
        assert_eq!(transport.attempts.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_stops_loop() {
        let sampler = FakeSampler::new(vec![]);
        let transport = FakeTransport::default();
        let (tx, rx) = watch::channel(false);

        let interrupt = async {
            tokio::time::sleep(Duration::from_secs(12)).await;
            tx.send(true).unwrap();
        };
        let options = opts(0);
        let ((exit, sent), ()) = tokio::join!(run(&sampler, &transport, &options, rx), interrupt);

        assert_eq!(exit, Exit::Interrupted);
        // Cycles start at t=0, 5 and 10; the interrupt lands during the third sleep.
        assert_eq!(sent, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_during_send_finishes_cycle_then_stops() {
        let sampler = FakeSampler::new(vec![]);
        let (tx, rx) = watch::channel(false);
        let transport = FakeTransport {
            interrupt: Some(tx),
            ..Default::default()
        };

        let (exit, sent) = run(&sampler, &transport, &opts(0), rx).await;

        assert_eq!(exit, Exit::Interrupted);
        // The in-flight send completes and counts; no new cycle starts.
        assert_eq!(sent, 1);
        assert_eq!(sampler.calls.get(), 1);
        assert_eq!(transport.attempts.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_during_collect_skips_next_cycle() {
        let (tx, rx) = watch::channel(false);
        let sampler = FakeSampler {
            interrupt: Some(tx),
            ..FakeSampler::new(vec![1])
        };
        let transport = FakeTransport::default();

        let (exit, sent) = run(&sampler, &transport, &opts(0), rx).await;

        assert_eq!(exit, Exit::Interrupted);
        assert_eq!(sent, 0);
        assert_eq!(sampler.calls.get(), 1);
        assert_eq!(transport.attempts.get(), 0);
    }

    #[tokio::test]
    async fn test_already_interrupted_runs_no_cycle() {
        let sampler = FakeSampler::new(vec![]);
        let transport = FakeTransport::default();
        let (_tx, rx) = watch::channel(true);

        let (exit, sent) = run(&sampler, &transport, &opts(0), rx).await;

        assert_eq!(exit, Exit::Interrupted);
        assert_eq!(sent, 0);
        assert_eq!(sampler.calls.get(), 0);
    }
}
