use {
    crate::{
        infra::blockchain::{self, ChainClient, ChainError, DeployParams},
        record,
    },
    alloy::{
        dyn_abi::DynSolValue,
        primitives::{Address, U256},
        signers::local::PrivateKeySigner,
    },
    contracts::CompiledContract,
    std::sync::Arc,
    tracing::instrument,
};

/// Constructor argument of the token, in whole tokens. The contract scales it
/// by its 18 decimals.
pub const INITIAL_SUPPLY: u64 = 1_000_000;
pub const GAS_LIMIT: u64 = 3_000_000;
/// 1 gwei.
pub const GAS_PRICE: u128 = 1_000_000_000;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Record(#[from] record::Error),
}

/// Deploys fresh instances of the token and records the latest one.
///
/// Every call creates a new contract, there is no check whether the token was
/// deployed before.
pub struct Deployer {
    contract: Arc<CompiledContract>,
    chain: Arc<dyn ChainClient>,
    records: Arc<record::Store>,
    private_key: String,
    chain_id: u64,
}

impl Deployer {
    pub fn new(
        contract: Arc<CompiledContract>,
        chain: Arc<dyn ChainClient>,
        records: Arc<record::Store>,
        private_key: String,
        chain_id: u64,
    ) -> Self {
        Self {
            contract,
            chain,
            records,
            private_key,
            chain_id,
        }
    }

    /// Deploys the token and persists its address. The record is only
    /// touched once the deployment is confirmed.
    #[instrument(skip_all)]
    pub async fn deploy(&self) -> Result<Address, Error> {
        let result = self.deploy_inner().await;
        Metrics::get().on_deployment(&result);
        result
    }

    async fn deploy_inner(&self) -> Result<Address, Error> {
        let signer = self.signer()?;
        let sender = signer.address();

        let nonce = self.chain.next_nonce(sender).await?;
        tracing::debug!(?sender, nonce, "building deployment transaction");
        let tx = blockchain::build_deploy_tx(
            &self.contract,
            &[DynSolValue::Uint(U256::from(INITIAL_SUPPLY), 256)],
            DeployParams {
                sender,
                nonce,
                chain_id: self.chain_id,
                gas_limit: GAS_LIMIT,
                gas_price: GAS_PRICE,
            },
        )?;
        let signed = blockchain::sign(tx, &signer).await?;

        let tx_hash = self.chain.send(signed).await?;
        tracing::info!(?tx_hash, "sent deployment transaction");
        let receipt = self.chain.wait_for_receipt(tx_hash).await?;
        let address = receipt
            .contract_address
            .ok_or(ChainError::MissingContractAddress(tx_hash))?;
        tracing::info!(
            ?address,
            ?tx_hash,
            block = ?receipt.block_number,
            "token deployed"
        );

        self.records.save(&address.to_checksum(None)).await?;
        Ok(address)
    }

    fn signer(&self) -> Result<PrivateKeySigner, Error> {
        if self.private_key.is_empty() {
            return Err(Error::Configuration("PRIVATE_KEY is not set".into()));
        }
        self.private_key
            .parse()
            .map_err(|err| Error::Configuration(format!("PRIVATE_KEY is not a valid key: {err}")))
    }
}

#[derive(prometheus_metric_storage::MetricStorage)]
struct Metrics {
    /// Number of deployment attempts by outcome.
    #[metric(labels("result"))]
    deployments: prometheus::IntCounterVec,
}

impl Metrics {
    fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }

    fn on_deployment(&self, result: &Result<Address, Error>) {
        let label = match result {
            Ok(_) => "success",
            Err(Error::Configuration(_)) => "configuration_error",
            Err(Error::Chain(_)) => "chain_error",
            Err(Error::Record(_)) => "record_error",
        };
        self.deployments.with_label_values(&[label]).inc();
    }
}
