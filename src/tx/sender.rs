//! Trade-log submission: fetch sequence, build, sign, submit, confirm

use super::builder::{build_envelope, string_arg, EntryFunction, ModuleId};
use super::clock::{Clock, SystemClock};
use super::gas::{GasBudget, GasEstimator};
use super::sequence::SequenceManager;
use crate::chain::{AccountAddress, ChainClient, FinalityWaiter, TxHash};
use crate::config::{ChainConfig, SubmissionConfig};
use crate::error::{TradelogError, TradelogResult};
use crate::metrics;
use crate::wallet::LocalAccount;

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Submits one action string per call to the configured entry function
pub struct SubmissionWorkflow {
    client: Arc<dyn ChainClient>,
    account: Arc<LocalAccount>,
    sequence: Arc<SequenceManager>,
    gas: GasEstimator,
    finality: FinalityWaiter,
    module: ModuleId,
    function: String,
    chain_id: u8,
    expiration_secs: u64,
    clock: Arc<dyn Clock>,
}

impl SubmissionWorkflow {
    pub fn new(
        client: Arc<dyn ChainClient>,
        account: Arc<LocalAccount>,
        chain: &ChainConfig,
        submission: &SubmissionConfig,
    ) -> TradelogResult<Self> {
        let module_address = AccountAddress::from_hex(&chain.module_address)
            .map_err(|e| TradelogError::Config(format!("chain.module_address: {}", e)))?;
        let module = ModuleId::new(module_address, &chain.module_name)
            .map_err(|e| TradelogError::Config(format!("chain.module_name: {}", e)))?;
        EntryFunction::new(module.clone(), &chain.function_name, Vec::new())
            .map_err(|e| TradelogError::Config(format!("chain.function_name: {}", e)))?;

        info!(
            "Submission workflow for {} targeting {}::{} on chain {}",
            account.address(),
            module,
            chain.function_name,
            chain.chain_id
        );

        Ok(Self {
            client,
            account,
            sequence: Arc::new(SequenceManager::new()),
            gas: GasEstimator::from_config(submission),
            finality: FinalityWaiter::from_config(submission),
            module,
            function: chain.function_name.clone(),
            chain_id: chain.chain_id,
            expiration_secs: submission.expiration_secs,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Record `action` on chain and return its hash once committed
    ///
    /// There is no retry here: a caller that retries re-runs the whole cycle,
    /// which picks up a fresh sequence number.
    pub async fn submit_action(&self, action: &str) -> TradelogResult<TxHash> {
        if action.trim().is_empty() {
            return Err(TradelogError::InvalidInput(
                "Action description must not be empty".into(),
            ));
        }

        let gas = self.gas.budget(self.client.as_ref()).await;
        let sender = self.account.address();

        let _guard = self.sequence.lock(sender).await;
        let started = Instant::now();

        match self.run(action, sender, gas).await {
            Ok(hash) => {
                metrics::record_tx_confirmed(self.chain_id);
                metrics::record_tx_latency(self.chain_id, started.elapsed().as_secs_f64());
                info!("Logged action in {} ({:?})", hash, started.elapsed());
                Ok(hash)
            }
            Err(e) => {
                metrics::record_tx_failed(self.chain_id, &e);
                error!("Failed to log action for {}: {}", sender, e);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        action: &str,
        sender: AccountAddress,
        gas: GasBudget,
    ) -> TradelogResult<TxHash> {
        let client = self.client.as_ref();

        // 1. sequence number, fetched right before the envelope is built
        let sequence_number = self.sequence.fetch(client, sender).await?;

        // 2. envelope
        let payload = EntryFunction::new(
            self.module.clone(),
            &self.function,
            vec![string_arg(action)?],
        )?;
        let expiration = self.clock.now_secs().saturating_add(self.expiration_secs);
        let raw = build_envelope(
            sender,
            sequence_number,
            payload,
            gas,
            expiration,
            self.chain_id,
        );

        // 3. sign
        let signed = self.account.sign_transaction(raw)?;

        // 4. submit
        let hash = client.submit_transaction(&signed).await?;
        metrics::record_tx_submitted(self.chain_id);
        debug!(
            "Submitted {} (sequence {}, expires {}, max fee {} octas)",
            hash,
            sequence_number,
            expiration,
            gas.max_cost()
        );

        // 5. confirm
        self.finality.wait(client, &hash).await?;
        Ok(hash)
    }
}
