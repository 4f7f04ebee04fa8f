//! Stuck-transaction recovery watcher.
//!
//! The dispatch queues are not persisted; this loop is the durability
//! mechanism for dispatch signals lost to process restarts, crashed workers,
//! or dropped sends. Re-dispatching a transaction that a live worker is
//! still driving is safe: the executor blocks on the row lock and then
//! no-ops on the now-authoritative status.

use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::services::dispatcher::Dispatcher;
use crate::services::query::QueryService;

pub async fn run_recovery_watcher(
    query_service: QueryService,
    dispatcher: Dispatcher,
    scan_interval: Duration,
) {
    info!(
        "Stuck transaction recovery watcher started, scanning every {:?}",
        scan_interval
    );

    let mut ticker = interval(scan_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match query_service.stuck_transactions().await {
            Ok(stuck) => {
                if !stuck.is_empty() {
                    info!("Re-dispatching {} stuck transaction(s)", stuck.len());
                }
                for transaction in stuck {
                    dispatcher
                        .dispatch(transaction.transaction_type, transaction.id)
                        .await;
                }
            }
            Err(e) => error!("Failed to recover stuck transactions: {}", e),
        }
    }
}
