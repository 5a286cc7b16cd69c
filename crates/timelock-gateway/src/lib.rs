//! Timelock Gateway - Shared, serialized access to the ledger network
//!
//! The gateway owns the single ledger connection. It is constructed once,
//! injected into the escrow service, and shared behind an async mutex:
//!
//! ```text
//! EscrowLifecycleService ──► TransactionGateway ──► LedgerTransport
//!                               (tokio Mutex)        ├─ WebSocketTransport (wss://…)
//!                                                    └─ LocalSimLedger (in-process)
//! ```
//!
//! # Pipeline
//!
//! 1. `prepare` - autofill `Sequence`, `Fee` and `LastLedgerSequence`
//! 2. `sign` - obtain the signed blob and hash
//! 3. `submit` - send the blob and wait for a validated result
//!
//! [`TransactionGateway::execute`] runs all three under one lock acquisition,
//! so two concurrent creates can never be assigned the same sequence.
//!
//! No step is retried.

pub mod error;
pub mod local_sim;
pub mod transport;
pub mod ws;

pub use error::{GatewayError, GatewayResult};
pub use local_sim::{LocalSimLedger, SimEscrow, SimTransaction};
pub use transport::LedgerTransport;
pub use ws::WebSocketTransport;

use std::future::Future;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use timelock_types::{
    AutofillFields, Credential, Drops, FinalizedTransaction, LedgerTransaction, NetworkEndpoint,
    PreparedTransaction, SignedTransaction,
};

/// Rejection code used when a transaction can no longer be included
pub const LAST_LEDGER_EXPIRED: &str = "LastLedgerSequenceExpired";

// ============================================================================
// Configuration
// ============================================================================

/// Gateway deadlines and autofill settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Deadline for each individual ledger request
    pub request_timeout: Duration,
    /// Deadline for submit-and-wait as a whole
    pub submit_timeout: Duration,
    /// Delay between validation polls
    pub poll_interval: Duration,
    /// Ledgers added to the current index for `LastLedgerSequence`
    pub ledger_offset: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            submit_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            ledger_offset: 20,
        }
    }
}

// ============================================================================
// Gateway
// ============================================================================

/// The shared ledger connection
pub struct TransactionGateway {
    endpoint: NetworkEndpoint,
    transport: Mutex<Box<dyn LedgerTransport>>,
    config: GatewayConfig,
}

impl TransactionGateway {
    /// Create a gateway over an explicit transport
    pub fn new(
        endpoint: NetworkEndpoint,
        transport: Box<dyn LedgerTransport>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            endpoint,
            transport: Mutex::new(transport),
            config,
        }
    }

    /// Create a gateway speaking WebSocket to `endpoint`
    pub fn websocket(endpoint: NetworkEndpoint, config: GatewayConfig) -> Self {
        let transport = WebSocketTransport::new(endpoint.url.clone());
        Self::new(endpoint, Box::new(transport), config)
    }

    /// Create a gateway over an in-process ledger
    pub fn local_sim(ledger: LocalSimLedger, config: GatewayConfig) -> Self {
        Self::new(NetworkEndpoint::local_sim(), Box::new(ledger), config)
    }

    pub fn endpoint(&self) -> &NetworkEndpoint {
        &self.endpoint
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Open the connection if it is not already open.
    pub async fn connect(&self) -> GatewayResult<()> {
        let mut transport = self.transport.lock().await;
        self.ensure_open(&mut **transport).await
    }

    /// Close the connection if it is open.
    pub async fn disconnect(&self) -> GatewayResult<()> {
        let mut transport = self.transport.lock().await;
        if transport.is_open() {
            transport.close().await?;
            info!(url = %self.endpoint.url, "Disconnected from ledger");
        }
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_open()
    }

    /// Autofill network-assigned fields.
    pub async fn prepare(&self, tx: LedgerTransaction) -> GatewayResult<PreparedTransaction> {
        let mut transport = self.transport.lock().await;
        self.ensure_open(&mut **transport).await?;
        self.autofill(&mut **transport, tx).await
    }

    /// Sign a prepared transaction with `credential`.
    pub async fn sign(
        &self,
        prepared: &PreparedTransaction,
        credential: &Credential,
    ) -> GatewayResult<SignedTransaction> {
        let mut transport = self.transport.lock().await;
        self.ensure_open(&mut **transport).await?;
        self.sign_with(&mut **transport, prepared, credential).await
    }

    /// Submit a signed transaction and wait until it is validated.
    pub async fn submit(&self, signed: &SignedTransaction) -> GatewayResult<FinalizedTransaction> {
        let mut transport = self.transport.lock().await;
        self.ensure_open(&mut **transport).await?;
        self.submit_and_wait(&mut **transport, signed).await
    }

    /// Prepare, sign and submit under a single lock acquisition.
    ///
    /// Returns the prepared transaction (whose `Sequence` identifies a new
    /// escrow) together with the validated result.
    pub async fn execute(
        &self,
        tx: LedgerTransaction,
        credential: &Credential,
    ) -> GatewayResult<(PreparedTransaction, FinalizedTransaction)> {
        let mut transport = self.transport.lock().await;
        self.ensure_open(&mut **transport).await?;

        let prepared = self.autofill(&mut **transport, tx).await?;
        let signed = self
            .sign_with(&mut **transport, &prepared, credential)
            .await?;
        let finalized = self.submit_and_wait(&mut **transport, &signed).await?;
        Ok((prepared, finalized))
    }

    // ========================================================================
    // Pipeline steps (caller holds the lock)
    // ========================================================================

    async fn ensure_open(&self, transport: &mut dyn LedgerTransport) -> GatewayResult<()> {
        if transport.is_open() {
            return Ok(());
        }
        bounded(self.config.request_timeout, transport.open()).await?;
        info!(url = %self.endpoint.url, network = %self.endpoint.kind, "Connected to ledger");
        Ok(())
    }

    async fn call(
        &self,
        transport: &mut dyn LedgerTransport,
        command: &str,
        params: Value,
    ) -> GatewayResult<Value> {
        bounded(self.config.request_timeout, transport.request(command, params)).await
    }

    async fn autofill(
        &self,
        transport: &mut dyn LedgerTransport,
        tx: LedgerTransaction,
    ) -> GatewayResult<PreparedTransaction> {
        let account = self
            .call(
                transport,
                "account_info",
                json!({ "account": tx.account().as_str(), "ledger_index": "current" }),
            )
            .await?;
        let sequence = read_u32(&account, &["account_data", "Sequence"])?;

        let fee = self.call(transport, "fee", Value::Null).await?;
        let fee = read_drops(&fee, &["drops", "open_ledger_fee"])
            .or_else(|_| read_drops(&fee, &["drops", "base_fee"]))?;

        let current = self.call(transport, "ledger_current", Value::Null).await?;
        let current = read_u32(&current, &["ledger_current_index"])?;

        let autofill = AutofillFields {
            sequence,
            fee,
            last_ledger_sequence: current.saturating_add(self.config.ledger_offset),
        };
        debug!(
            tx_type = tx.type_name(),
            sequence,
            fee = %fee,
            last_ledger_sequence = autofill.last_ledger_sequence,
            "Transaction prepared"
        );
        Ok(PreparedTransaction::new(tx, autofill))
    }

    async fn sign_with(
        &self,
        transport: &mut dyn LedgerTransport,
        prepared: &PreparedTransaction,
        credential: &Credential,
    ) -> GatewayResult<SignedTransaction> {
        let tx_json = prepared
            .to_tx_json()
            .map_err(|e| GatewayError::protocol(e.to_string()))?;

        let result = self
            .call(
                transport,
                "sign",
                json!({ "tx_json": tx_json, "secret": credential.secret().expose() }),
            )
            .await?;

        let tx_blob = read_str(&result, &["tx_blob"])?.to_string();
        let hash = read_str(&result, &["tx_json", "hash"])?.to_string();
        Ok(SignedTransaction {
            tx_blob,
            hash,
            last_ledger_sequence: prepared.last_ledger_sequence(),
        })
    }

    async fn submit_and_wait(
        &self,
        transport: &mut dyn LedgerTransport,
        signed: &SignedTransaction,
    ) -> GatewayResult<FinalizedTransaction> {
        bounded(self.config.submit_timeout, self.submit_inner(transport, signed)).await
    }

    async fn submit_inner(
        &self,
        transport: &mut dyn LedgerTransport,
        signed: &SignedTransaction,
    ) -> GatewayResult<FinalizedTransaction> {
        let result = self
            .call(transport, "submit", json!({ "tx_blob": signed.tx_blob }))
            .await?;
        let engine_result = read_str(&result, &["engine_result"])?.to_string();
        let engine_message = result
            .get("engine_result_message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if is_immediate_rejection(&engine_result) {
            warn!(hash = %signed.hash, code = %engine_result, "Submission rejected");
            return Err(GatewayError::rejected(engine_result, engine_message));
        }
        debug!(hash = %signed.hash, engine_result = %engine_result, "Submitted, awaiting validation");

        loop {
            tokio::time::sleep(self.config.poll_interval).await;

            match self
                .call(transport, "tx", json!({ "transaction": signed.hash }))
                .await
            {
                Ok(tx) if tx.get("validated").and_then(Value::as_bool) == Some(true) => {
                    let code = read_str(&tx, &["meta", "TransactionResult"])?.to_string();
                    let ledger_index = read_u32(&tx, &["ledger_index"])?;

                    if code != "tesSUCCESS" {
                        let message = if code == engine_result && !engine_message.is_empty() {
                            engine_message
                        } else {
                            transport::describe_result(&code).to_string()
                        };
                        warn!(hash = %signed.hash, code = %code, "Transaction failed in validated ledger");
                        return Err(GatewayError::rejected(code, message));
                    }

                    info!(hash = %signed.hash, ledger_index, "Transaction validated");
                    return Ok(FinalizedTransaction {
                        hash: signed.hash.clone(),
                        ledger_index,
                        result: code,
                    });
                }
                Ok(_) => {}
                Err(GatewayError::Request { ref error, .. }) if error == "txnNotFound" => {}
                Err(e) => return Err(e),
            }

            let current = self.call(transport, "ledger_current", Value::Null).await?;
            let current = read_u32(&current, &["ledger_current_index"])?;
            if current > signed.last_ledger_sequence {
                warn!(
                    hash = %signed.hash,
                    last_ledger_sequence = signed.last_ledger_sequence,
                    "Transaction expired before validation"
                );
                return Err(GatewayError::rejected(
                    LAST_LEDGER_EXPIRED,
                    "The ledger passed LastLedgerSequence before the transaction was validated",
                ));
            }
        }
    }
}

/// `tem`, `tef` and `tel` results mean the transaction will never apply.
pub fn is_immediate_rejection(engine_result: &str) -> bool {
    ["tem", "tef", "tel"]
        .iter()
        .any(|class| engine_result.starts_with(class))
}

async fn bounded<T>(
    limit: Duration,
    fut: impl Future<Output = GatewayResult<T>>,
) -> GatewayResult<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| GatewayError::Timeout(limit))?
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> GatewayResult<&'a Value> {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .ok_or_else(|| GatewayError::protocol(format!("missing field {}", path.join("."))))
}

fn read_str<'a>(value: &'a Value, path: &[&str]) -> GatewayResult<&'a str> {
    lookup(value, path)?
        .as_str()
        .ok_or_else(|| GatewayError::protocol(format!("{} is not a string", path.join("."))))
}

fn read_u32(value: &Value, path: &[&str]) -> GatewayResult<u32> {
    lookup(value, path)?
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| GatewayError::protocol(format!("{} is not a 32-bit integer", path.join("."))))
}

fn read_drops(value: &Value, path: &[&str]) -> GatewayResult<Drops> {
    read_str(value, path)?
        .parse::<u64>()
        .map(Drops::new)
        .map_err(|e| GatewayError::protocol(format!("{}: {}", path.join("."), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_rejection_classes() {
        assert!(is_immediate_rejection("tefPAST_SEQ"));
        assert!(is_immediate_rejection("temBAD_EXPIRATION"));
        assert!(is_immediate_rejection("telINSUF_FEE_P"));
        assert!(!is_immediate_rejection("tesSUCCESS"));
        assert!(!is_immediate_rejection("tecNO_PERMISSION"));
        assert!(!is_immediate_rejection("terQUEUED"));
    }

    #[test]
    fn test_field_readers() {
        let value = json!({"drops": {"base_fee": "10"}, "ledger_current_index": 42});
        assert_eq!(read_drops(&value, &["drops", "base_fee"]).unwrap(), Drops::new(10));
        assert_eq!(read_u32(&value, &["ledger_current_index"]).unwrap(), 42);
        assert!(matches!(
            read_str(&value, &["drops", "open_ledger_fee"]),
            Err(GatewayError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: GatewayResult<()> = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(GatewayError::Timeout(_))));
    }

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.submit_timeout, Duration::from_secs(60));
        assert_eq!(config.ledger_offset, 20);
    }
}
