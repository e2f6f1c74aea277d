//! # Transaction Synchronizer
//!
//! Submits state-changing requests and polls for their receipt.
//!
//! ```text
//! Submitted ──► Polling ──► Confirmed
//!                  │  ▲
//!                  │  └── no receipt yet, wait poll_interval
//!                  ├──────► TimedOut   (elapsed since submission > timeout)
//!                  └──────► Errored    (receipt query failed; never retried)
//! ```
//!
//! The poll is linear: block inclusion has a roughly fixed cadence. There is
//! no cancellation; dropping the future is the only way to stop waiting.

use crate::adapters::eth::EthRpc;
use crate::config::SyncConfig;
use crate::domain::params::TxParams;
use crate::domain::receipt::{decode_logs, DecodedLog, TransactionReceipt};
use crate::domain::schema::EventEntry;
use crate::domain::value_objects::{Address, Hash};
use crate::errors::{ContractError, ContractResult};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A confirmed state-changing invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub tx: Hash,
    pub receipt: TransactionReceipt,
    /// Decoded logs; always empty for legacy artifacts.
    pub logs: Vec<DecodedLog>,
}

/// Poll bookkeeping for one submitted transaction. Lives only as long as
/// the wait.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub tx: Hash,
    pub submitted_at: Instant,
    pub timeout: Option<Duration>,
    pub attempts: u32,
}

impl PendingTransaction {
    #[must_use]
    pub fn new(tx: Hash, timeout: Option<Duration>) -> Self {
        Self {
            tx,
            submitted_at: Instant::now(),
            timeout,
            attempts: 0,
        }
    }

    /// True once more than `timeout` has passed since submission.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.timeout
            .is_some_and(|limit| self.submitted_at.elapsed() > limit)
    }
}

#[derive(Debug, Clone)]
pub struct TransactionSynchronizer {
    rpc: EthRpc,
    config: SyncConfig,
}

impl TransactionSynchronizer {
    pub fn new(rpc: EthRpc, config: SyncConfig) -> Self {
        Self { rpc, config }
    }

    /// Submits a transaction without waiting.
    ///
    /// # Errors
    ///
    /// Transport errors pass through.
    pub async fn submit(&self, params: &TxParams) -> ContractResult<Hash> {
        Ok(self.rpc.send_transaction(params).await?)
    }

    /// Polls until a receipt for `tx` satisfies `accept`.
    ///
    /// Receipts that fail `accept` count as not yet arrived.
    ///
    /// # Errors
    ///
    /// [`ContractError::TransactionTimeout`] past the configured timeout,
    /// [`ContractError::PollLimitReached`] past `max_attempts`, and any
    /// transport error from the receipt query, unretried.
    pub async fn wait_until<F>(&self, tx: Hash, accept: F) -> ContractResult<TransactionReceipt>
    where
        F: Fn(&TransactionReceipt) -> bool,
    {
        let mut pending = PendingTransaction::new(tx, self.config.timeout());

        loop {
            pending.attempts += 1;
            debug!(tx = ?tx, attempt = pending.attempts, "Polling for receipt");

            if let Some(receipt) = self.rpc.transaction_receipt(tx).await? {
                if accept(&receipt) {
                    info!(tx = ?tx, attempts = pending.attempts, "Transaction confirmed");
                    return Ok(receipt);
                }
            }

            if pending.expired() {
                warn!(tx = ?tx, timeout_ms = self.config.timeout_ms, "Transaction not processed in time");
                return Err(ContractError::TransactionTimeout {
                    tx,
                    timeout_ms: self.config.timeout_ms,
                });
            }

            if let Some(max) = self.config.max_attempts {
                if pending.attempts >= max {
                    return Err(ContractError::PollLimitReached {
                        tx,
                        attempts: pending.attempts,
                    });
                }
            }

            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    /// Polls until any receipt for `tx` arrives.
    ///
    /// # Errors
    ///
    /// See [`Self::wait_until`].
    pub async fn wait_for_receipt(&self, tx: Hash) -> ContractResult<TransactionReceipt> {
        self.wait_until(tx, |_| true).await
    }

    /// Submits `params`, waits for the receipt and, when `events` is given,
    /// decodes its logs with `context` as the contract address.
    ///
    /// # Errors
    ///
    /// A submission error fails immediately; otherwise see [`Self::wait_until`].
    pub async fn send_and_confirm(
        &self,
        params: &TxParams,
        events: Option<&HashMap<Hash, EventEntry>>,
        context: Address,
    ) -> ContractResult<TransactionOutcome> {
        let tx = self.submit(params).await?;
        let receipt = self.wait_for_receipt(tx).await?;
        let logs = events
            .map(|index| decode_logs(&receipt.logs, index, context))
            .unwrap_or_default();
        Ok(TransactionOutcome { tx, receipt, logs })
    }
}

// =============================================================================
// TESTS
// =============================================================================
