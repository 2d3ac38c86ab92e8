//! Access to the chain the token is deployed to.

use {
    alloy::{
        dyn_abi::DynSolValue,
        eips::eip2718::Encodable2718,
        network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
        primitives::{Address, Bytes, TxHash},
        providers::{DynProvider, Provider, ProviderBuilder},
        rpc::{client::ClientBuilder, types::TransactionRequest},
        signers::local::PrivateKeySigner,
        transports::TransportError,
    },
    contracts::CompiledContract,
    std::time::Duration,
    url::Url,
};

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("node request failed: {0}")]
    Rpc(#[from] TransportError),
    #[error("failed to build deployment transaction: {0}")]
    Encoding(#[from] contracts::Error),
    #[error("failed to sign transaction: {0}")]
    Signing(String),
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
    #[error("transaction {0} was not mined within {1:?}")]
    Timeout(TxHash, Duration),
    #[error("receipt of transaction {0} has no contract address")]
    MissingContractAddress(TxHash),
}

/// The parts of a transaction receipt a deployment cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
    pub contract_address: Option<Address>,
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    /// Number of transactions sent from `address`, i.e. the nonce of its next
    /// transaction.
    async fn next_nonce(&self, address: Address) -> Result<u64, ChainError>;

    /// Broadcasts an EIP-2718 encoded signed transaction.
    async fn send(&self, signed_tx: Bytes) -> Result<TxHash, ChainError>;

    /// Waits until the transaction is mined. Fails if it reverted or wasn't
    /// mined in time.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<DeploymentReceipt, ChainError>;
}

/// Parameters of a contract creation transaction.
#[derive(Clone, Copy, Debug)]
pub struct DeployParams {
    pub sender: Address,
    pub nonce: u64,
    pub chain_id: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
}

/// Builds an unsigned legacy contract creation transaction whose input is the
/// contract bytecode followed by the encoded constructor arguments.
pub fn build_deploy_tx(
    contract: &CompiledContract,
    constructor_args: &[DynSolValue],
    params: DeployParams,
) -> Result<TransactionRequest, ChainError> {
    let code = contract.deployment_code(constructor_args)?;
    Ok(TransactionRequest::default()
        .with_from(params.sender)
        .with_deploy_code(code)
        .with_nonce(params.nonce)
        .with_chain_id(params.chain_id)
        .with_gas_limit(params.gas_limit)
        .with_gas_price(params.gas_price))
}

/// Signs the transaction and returns its EIP-2718 encoding, ready to be
/// broadcast.
pub async fn sign(tx: TransactionRequest, signer: &PrivateKeySigner) -> Result<Bytes, ChainError> {
    let wallet = EthereumWallet::from(signer.clone());
    let envelope = tx
        .build(&wallet)
        .await
        .map_err(|err| ChainError::Signing(err.to_string()))?;
    Ok(envelope.encoded_2718().into())
}

/// [`ChainClient`] talking to a JSON-RPC node.
pub struct Rpc {
    provider: DynProvider,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl Rpc {
    pub fn new(url: Url, receipt_timeout: Duration, poll_interval: Duration) -> Self {
        let client = ClientBuilder::default().http(url);
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_client(client)
            .erased();
        Self {
            provider,
            receipt_timeout,
            poll_interval,
        }
    }

    async fn poll_receipt(&self, tx_hash: TxHash) -> Result<DeploymentReceipt, ChainError> {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;
            let Some(receipt) = self.provider.get_transaction_receipt(tx_hash).await? else {
                tracing::trace!(?tx_hash, "transaction not mined yet");
                continue;
            };
            return Ok(DeploymentReceipt {
                transaction_hash: receipt.transaction_hash(),
                block_number: receipt.block_number(),
                success: receipt.status(),
                contract_address: receipt.contract_address(),
            });
        }
    }
}

#[async_trait::async_trait]
impl ChainClient for Rpc {
    async fn next_nonce(&self, address: Address) -> Result<u64, ChainError> {
        Ok(self.provider.get_transaction_count(address).await?)
    }

    async fn send(&self, signed_tx: Bytes) -> Result<TxHash, ChainError> {
        let pending = self.provider.send_raw_transaction(&signed_tx).await?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<DeploymentReceipt, ChainError> {
        let receipt = tokio::time::timeout(self.receipt_timeout, self.poll_receipt(tx_hash))
            .await
            .map_err(|_| ChainError::Timeout(tx_hash, self.receipt_timeout))??;
        if !receipt.success {
            return Err(ChainError::Reverted(tx_hash));
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::{
            consensus::{Transaction, TxEnvelope},
            eips::eip2718::Decodable2718,
            json_abi::JsonAbi,
            primitives::{TxKind, U256, address},
        },
        axum::{Json, routing::post},
        serde_json::{Value, json},
        std::future::IntoFuture,
    };

    fn contract() -> CompiledContract {
        CompiledContract {
            abi: JsonAbi::parse(["constructor(uint256 initialSupply)"]).unwrap(),
            bytecode: Bytes::from_static(&[0x60, 0x80]),
        }
    }

    fn params(signer: &PrivateKeySigner) -> DeployParams {
        DeployParams {
            sender: signer.address(),
            nonce: 7,
            chain_id: 9636,
            gas_limit: 3_000_000,
            gas_price: 1_000_000_000,
        }
    }

    #[test]
    fn deploy_tx_creates_contract() {
        let signer = PrivateKeySigner::random();
        let tx = build_deploy_tx(
            &contract(),
            &[DynSolValue::Uint(U256::from(1_000_000), 256)],
            params(&signer),
        )
        .unwrap();

        assert_eq!(tx.to, Some(TxKind::Create));
        assert_eq!(tx.from, Some(signer.address()));
        assert_eq!(tx.nonce, Some(7));
        assert_eq!(tx.chain_id, Some(9636));
        assert_eq!(tx.gas, Some(3_000_000));
        assert_eq!(tx.gas_price, Some(1_000_000_000));
        let input = tx.input.input().unwrap();
        assert_eq!(input.len(), 2 + 32);
        assert_eq!(U256::from_be_slice(&input[2..]), U256::from(1_000_000));
    }

    #[test]
    fn deploy_tx_rejects_bad_constructor_args() {
        let signer = PrivateKeySigner::random();
        assert!(matches!(
            build_deploy_tx(&contract(), &[], params(&signer)),
            Err(ChainError::Encoding(_))
        ));
    }

    #[tokio::test]
    async fn signed_tx_decodes_to_legacy_creation() {
        let signer = PrivateKeySigner::random();
        let tx = build_deploy_tx(
            &contract(),
            &[DynSolValue::Uint(U256::from(1_000_000), 256)],
            params(&signer),
        )
        .unwrap();

        let raw = sign(tx, &signer).await.unwrap();
        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap();

        assert!(envelope.is_legacy());
        assert_eq!(envelope.kind(), TxKind::Create);
        assert_eq!(envelope.nonce(), 7);
        assert_eq!(envelope.chain_id(), Some(9636));
        assert_eq!(envelope.gas_limit(), 3_000_000);
        assert_eq!(envelope.gas_price(), Some(1_000_000_000));
    }

    #[tokio::test]
    async fn unreachable_node_is_an_rpc_error() {
        // Nothing listens on the discard port.
        let rpc = Rpc::new(
            "http://127.0.0.1:9".parse().unwrap(),
            Duration::from_millis(100),
            Duration::from_millis(10),
        );
        assert!(matches!(
            rpc.next_nonce(Address::ZERO).await,
            Err(ChainError::Rpc(_))
        ));
    }

    /// Starts a JSON-RPC node answering every request with `result`.
    async fn node(result: Value) -> Url {
        let app = axum::Router::new().route(
            "/",
            post(move |Json(request): Json<Value>| {
                let result = result.clone();
                async move {
                    Json(json!({
                        "jsonrpc": "2.0",
                        "id": request["id"],
                        "result": result,
                    }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(axum::serve(listener, app).into_future());
        format!("http://{addr}").parse().unwrap()
    }

    fn receipt(tx_hash: TxHash, status: &str, contract_address: Option<Address>) -> Value {
        json!({
            "type": "0x0",
            "status": status,
            "cumulativeGasUsed": "0x5208",
            "logs": [],
            "logsBloom": format!("0x{}", "0".repeat(512)),
            "transactionHash": tx_hash,
            "transactionIndex": "0x0",
            "blockHash": TxHash::repeat_byte(0x22),
            "blockNumber": "0x7",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "from": address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            "to": null,
            "contractAddress": contract_address,
        })
    }

    fn rpc(url: Url) -> Rpc {
        Rpc::new(url, Duration::from_millis(200), Duration::from_millis(20))
    }

    #[tokio::test]
    async fn mined_receipt_carries_contract_address() {
        let tx_hash = TxHash::repeat_byte(0x11);
        let deployed = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
        let rpc = rpc(node(receipt(tx_hash, "0x1", Some(deployed))).await);

        assert_eq!(
            rpc.wait_for_receipt(tx_hash).await.unwrap(),
            DeploymentReceipt {
                transaction_hash: tx_hash,
                block_number: Some(7),
                success: true,
                contract_address: Some(deployed),
            }
        );
    }

    #[tokio::test]
    async fn reverted_receipt_is_an_error() {
        let tx_hash = TxHash::repeat_byte(0x11);
        let rpc = rpc(node(receipt(tx_hash, "0x0", None)).await);

        assert!(matches!(
            rpc.wait_for_receipt(tx_hash).await,
            Err(ChainError::Reverted(hash)) if hash == tx_hash
        ));
    }

    #[tokio::test]
    async fn unmined_transaction_times_out() {
        let tx_hash = TxHash::repeat_byte(0x01);
        let rpc = rpc(node(Value::Null).await);

        assert!(matches!(
            rpc.wait_for_receipt(tx_hash).await,
            Err(ChainError::Timeout(hash, timeout))
                if hash == tx_hash && timeout == Duration::from_millis(200)
        ));
    }
}
