//! Type-segregated worker pools.
//!
//! Each transaction type gets its own bounded queue and pool of workers, so a
//! slow or unavailable withdrawal provider can never starve transfer
//! processing. A withdrawal that comes back AWAITING is re-enqueued after a
//! short delay, forming the saga's retry loop. The queues are in-memory only;
//! the recovery watcher covers dispatch signals lost to restarts or drops.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{TransactionStatus, TransactionType};
use crate::services::CommandExecutor;

/// Delay before an AWAITING withdrawal is polled again.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

const QUEUE_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct Dispatcher {
    transfer_queue: mpsc::Sender<Uuid>,
    withdrawal_queue: mpsc::Sender<Uuid>,
}

impl Dispatcher {
    /// Spawns both worker pools and returns their shared dispatch handle.
    pub fn start(
        transfer_executor: Arc<dyn CommandExecutor>,
        withdrawal_executor: Arc<dyn CommandExecutor>,
        transfer_workers: usize,
        withdrawal_workers: usize,
    ) -> Self {
        let (transfer_queue, transfer_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (withdrawal_queue, withdrawal_rx) = mpsc::channel(QUEUE_CAPACITY);

        spawn_workers(
            "transfer",
            transfer_workers,
            transfer_rx,
            transfer_executor,
            None,
        );
        spawn_workers(
            "withdrawal",
            withdrawal_workers,
            withdrawal_rx,
            withdrawal_executor,
            Some(withdrawal_queue.clone()),
        );

        Self {
            transfer_queue,
            withdrawal_queue,
        }
    }

    pub async fn dispatch(&self, transaction_type: TransactionType, transaction_id: Uuid) {
        let queue = match transaction_type {
            TransactionType::Transfer => &self.transfer_queue,
            TransactionType::Withdrawal => &self.withdrawal_queue,
        };

        // A dropped dispatch is recovered later by the recovery watcher.
        if queue.send(transaction_id).await.is_err() {
            error!(
                "Dispatch queue for {} is closed, dropping transaction {}",
                transaction_type, transaction_id
            );
        }
    }
}

fn spawn_workers(
    pool_name: &'static str,
    count: usize,
    receiver: mpsc::Receiver<Uuid>,
    executor: Arc<dyn CommandExecutor>,
    requeue: Option<mpsc::Sender<Uuid>>,
) {
    info!("Starting {} worker pool with {} workers", pool_name, count);
    let receiver = Arc::new(Mutex::new(receiver));

    for _ in 0..count {
        let receiver = receiver.clone();
        let executor = executor.clone();
        let requeue = requeue.clone();

        tokio::spawn(async move {
            loop {
                // The lock is held only while waiting for the next id, never
                // across an execution.
                let transaction_id = { receiver.lock().await.recv().await };
                let Some(transaction_id) = transaction_id else {
                    break;
                };

                match executor.execute(transaction_id).await {
                    Ok(Some(TransactionStatus::Awaiting)) => {
                        if let Some(requeue) = &requeue {
                            let requeue = requeue.clone();
                            tokio::spawn(async move {
                                tokio::time::sleep(RETRY_DELAY).await;
                                let _ = requeue.send(transaction_id).await;
                            });
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(
                            "Failed to process {} transaction {}: {}",
                            pool_name, transaction_id, e
                        );
                    }
                }
            }
        });
    }
}
