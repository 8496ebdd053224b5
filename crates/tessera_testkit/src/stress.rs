//! Concurrent load against one document.

use crate::fixtures::TestBackend;
use crate::integration::SyncClient;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a concurrent push run.
#[derive(Debug, Clone)]
pub struct StressResult {
    /// Push-pull cycles that succeeded.
    pub successful_cycles: usize,
    /// Push-pull cycles that failed.
    pub failed_cycles: usize,
    /// Total duration.
    pub duration: Duration,
    /// Final state of every client, in thread order.
    pub clients: Vec<SyncClient>,
}

/// Configuration for concurrent push runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of clients, one thread each.
    pub clients: usize,
    /// Push-pull cycles per client.
    pub cycles: usize,
    /// Local changes authored before each cycle.
    pub changes_per_cycle: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            clients: 4,
            cycles: 10,
            changes_per_cycle: 3,
        }
    }
}

/// Runs `config.clients` clients on their own threads, each authoring
/// changes and syncing the fixture document `name` repeatedly.
pub fn run_concurrent_clients(
    be: &Arc<TestBackend>,
    name: &str,
    config: &StressConfig,
) -> StressResult {
    let start = Instant::now();
    let handles: Vec<_> = (0..config.clients)
        .map(|index| {
            let be = Arc::clone(be);
            let name = name.to_owned();
            let config = config.clone();
            thread::spawn(move || {
                let mut client = SyncClient::attach(&be, &name);
                let mut ok = 0;
                let mut failed = 0;
                for cycle in 0..config.cycles {
                    for change in 0..config.changes_per_cycle {
                        client.set(&format!("c{index}"), (cycle * 100 + change) as i64);
                    }
                    match client.sync(&be) {
                        Ok(_) => ok += 1,
                        Err(_) => failed += 1,
                    }
                }
                (client, ok, failed)
            })
        })
        .collect();

    let mut result = StressResult {
        successful_cycles: 0,
        failed_cycles: 0,
        duration: Duration::ZERO,
        clients: Vec::with_capacity(config.clients),
    };
    for handle in handles {
        let (client, ok, failed) = handle.join().expect("Client thread panicked");
        result.successful_cycles += ok;
        result.failed_cycles += failed;
        result.clients.push(client);
    }
    result.duration = start.elapsed();
    result
}
