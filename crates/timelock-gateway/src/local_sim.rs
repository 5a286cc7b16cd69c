//! LocalSim ledger: an in-process ledger node with the escrow rules of the real network.
//!
//! This transport is used by the test suites and by the server when
//! `network = "local-sim"`. It answers the same commands the gateway sends
//! to a real node:
//!
//! - `account_info`, `fee`, `ledger_current`, `server_info`
//! - `sign`: checks the secret against the funded account and returns a blob
//! - `submit`: applies the transaction to the open ledger
//! - `tx`: looks up an applied transaction
//!
//! # Design
//!
//! Every served request closes the open ledger, so a submitted transaction
//! is validated by the time the next request arrives. Ledger close time is
//! wall-clock time plus an offset that tests move forward with
//! [`LocalSimLedger::advance`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use sha2::{Digest, Sha512};
use tracing::debug;

use timelock_types::{
    to_ledger_time, AccountAddress, Drops, EscrowSequence, LedgerTransaction, PreparedTransaction,
    LOCAL_SIM_URL,
};

use crate::error::{GatewayError, GatewayResult};
use crate::transport::{describe_result, LedgerTransport};

/// Fee charged for every applied transaction
pub const SIM_BASE_FEE: Drops = Drops::new(10);

const GENESIS_LEDGER: u32 = 1_000;

// ── Ledger objects ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SimAccount {
    secret: String,
    balance: Drops,
    sequence: u32,
}

/// An escrow object held by the simulated ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimEscrow {
    pub owner: AccountAddress,
    pub destination: AccountAddress,
    pub amount: Drops,
    /// Ledger epoch seconds
    pub finish_after: u32,
    /// Ledger epoch seconds
    pub cancel_after: u32,
    pub destination_tag: u32,
}

/// A transaction applied to a simulated ledger
#[derive(Debug, Clone)]
pub struct SimTransaction {
    pub hash: String,
    pub tx_json: Value,
    pub ledger_index: u32,
    pub result: String,
}

#[derive(Debug)]
struct SimState {
    accounts: HashMap<AccountAddress, SimAccount>,
    escrows: HashMap<(AccountAddress, u32), SimEscrow>,
    transactions: HashMap<String, SimTransaction>,
    /// Index of the open ledger
    ledger_index: u32,
    time_offset_secs: i64,
    offline: bool,
}

impl SimState {
    fn close_time(&self) -> u32 {
        to_ledger_time(Utc::now().timestamp() + self.time_offset_secs)
    }
}

// ── LocalSim ledger ──────────────────────────────────────────────────────────

/// In-process ledger. Clones share the same ledger state.
#[derive(Clone)]
pub struct LocalSimLedger {
    state: Arc<Mutex<SimState>>,
    open: bool,
}

impl Default for LocalSimLedger {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                accounts: HashMap::new(),
                escrows: HashMap::new(),
                transactions: HashMap::new(),
                ledger_index: GENESIS_LEDGER,
                time_offset_secs: 0,
                offline: false,
            })),
            open: false,
        }
    }
}

impl LocalSimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or top up) an account that signs with `secret`.
    pub fn fund(&self, address: &AccountAddress, secret: impl Into<String>, balance: Drops) {
        let mut state = self.state.lock();
        let secret = secret.into();
        state
            .accounts
            .entry(address.clone())
            .and_modify(|account| {
                account.secret = secret.clone();
                account.balance = Drops::new(account.balance.as_u64().saturating_add(balance.as_u64()));
            })
            .or_insert(SimAccount {
                secret,
                balance,
                sequence: 1,
            });
    }

    /// Move ledger time forward
    pub fn advance(&self, by: Duration) {
        let secs = i64::try_from(by.as_secs()).unwrap_or(i64::MAX);
        let mut state = self.state.lock();
        state.time_offset_secs = state.time_offset_secs.saturating_add(secs);
    }

    /// Close time of the open ledger, in ledger epoch seconds
    pub fn close_time(&self) -> u32 {
        self.state.lock().close_time()
    }

    pub fn ledger_index(&self) -> u32 {
        self.state.lock().ledger_index
    }

    pub fn balance(&self, address: &AccountAddress) -> Option<Drops> {
        self.state.lock().accounts.get(address).map(|a| a.balance)
    }

    pub fn escrow(&self, owner: &AccountAddress, sequence: EscrowSequence) -> Option<SimEscrow> {
        self.state
            .lock()
            .escrows
            .get(&(owner.clone(), sequence.value()))
            .cloned()
    }

    pub fn transaction(&self, hash: &str) -> Option<SimTransaction> {
        self.state.lock().transactions.get(hash).cloned()
    }

    /// Simulate the node becoming unreachable (or reachable again)
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    fn handle(&self, command: &str, params: &Value) -> GatewayResult<Value> {
        let mut state = self.state.lock();
        if state.offline {
            return Err(GatewayError::Transport("local-sim ledger is offline".to_string()));
        }

        let result = match command {
            "server_info" => Ok(server_info(&state)),
            "ledger_current" => Ok(json!({ "ledger_current_index": state.ledger_index })),
            "fee" => Ok(fee(&state)),
            "account_info" => account_info(&state, params),
            "sign" => sign(&state, params),
            "submit" => submit(&mut state, params),
            "tx" => tx(&state, params),
            other => Err(request_error("unknownCmd", format!("Unknown method: {}", other))),
        };

        state.ledger_index += 1;
        result
    }
}

#[async_trait]
impl LedgerTransport for LocalSimLedger {
    fn endpoint(&self) -> &str {
        LOCAL_SIM_URL
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn open(&mut self) -> GatewayResult<()> {
        if self.state.lock().offline {
            return Err(GatewayError::Transport("local-sim ledger is offline".to_string()));
        }
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> GatewayResult<()> {
        self.open = false;
        Ok(())
    }

    async fn request(&mut self, command: &str, params: Value) -> GatewayResult<Value> {
        if !self.open {
            return Err(GatewayError::NotConnected);
        }

        let result = self.handle(command, &params);
        if matches!(result, Err(GatewayError::Transport(_))) {
            self.open = false;
        }
        result
    }
}

// ── Commands ─────────────────────────────────────────────────────────────────

fn request_error(error: &str, message: impl Into<String>) -> GatewayError {
    GatewayError::Request {
        error: error.to_string(),
        message: message.into(),
    }
}

fn server_info(state: &SimState) -> Value {
    json!({
        "info": {
            "build_version": "local-sim",
            "server_state": "full",
            "network": LOCAL_SIM_URL,
            "validated_ledger": {
                "seq": state.ledger_index - 1,
                "close_time": state.close_time(),
                "base_fee_xrp": 0.00001,
            }
        }
    })
}

fn fee(state: &SimState) -> Value {
    let base = SIM_BASE_FEE.to_string();
    json!({
        "ledger_current_index": state.ledger_index,
        "drops": {
            "base_fee": base,
            "minimum_fee": base,
            "open_ledger_fee": base,
        }
    })
}

fn param_address(params: &Value, field: &str) -> GatewayResult<AccountAddress> {
    params
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| request_error("invalidParams", format!("Missing field '{}'.", field)))
        .and_then(|raw| {
            AccountAddress::parse(raw).map_err(|_| request_error("actMalformed", "Account malformed."))
        })
}

fn account_info(state: &SimState, params: &Value) -> GatewayResult<Value> {
    let address = param_address(params, "account")?;
    let account = state
        .accounts
        .get(&address)
        .ok_or_else(|| request_error("actNotFound", "Account not found."))?;

    Ok(json!({
        "ledger_current_index": state.ledger_index,
        "account_data": {
            "Account": address.as_str(),
            "Balance": account.balance.to_string(),
            "Sequence": account.sequence,
        }
    }))
}

fn transaction_hash(blob: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(b"TXN\0");
    hasher.update(blob);
    hex::encode_upper(&hasher.finalize()[..32])
}

fn sign(state: &SimState, params: &Value) -> GatewayResult<Value> {
    let tx_json = params
        .get("tx_json")
        .filter(|v| v.is_object())
        .ok_or_else(|| request_error("invalidParams", "Missing field 'tx_json'."))?;
    let secret = params
        .get("secret")
        .and_then(Value::as_str)
        .ok_or_else(|| request_error("invalidParams", "Missing field 'secret'."))?;
    let address = param_address(tx_json, "Account")?;

    match state.accounts.get(&address) {
        Some(account) if account.secret == secret => {}
        _ => return Err(request_error("badSecret", "Secret does not match account.")),
    }

    let bytes = serde_json::to_vec(tx_json).map_err(|e| GatewayError::protocol(e.to_string()))?;
    let hash = transaction_hash(&bytes);
    let mut signed = tx_json.clone();
    signed["hash"] = Value::from(hash);

    Ok(json!({
        "tx_blob": hex::encode_upper(&bytes),
        "tx_json": signed,
    }))
}

fn submit(state: &mut SimState, params: &Value) -> GatewayResult<Value> {
    let blob = params
        .get("tx_blob")
        .and_then(Value::as_str)
        .ok_or_else(|| request_error("invalidParams", "Missing field 'tx_blob'."))?;
    let bytes = hex::decode(blob).map_err(|_| request_error("invalidTransaction", "Blob is not hex."))?;
    let prepared: PreparedTransaction = serde_json::from_slice(&bytes)
        .map_err(|e| request_error("invalidTransaction", e.to_string()))?;
    let tx_json: Value = serde_json::from_slice(&bytes)
        .map_err(|e| request_error("invalidTransaction", e.to_string()))?;
    let hash = transaction_hash(&bytes);

    let code = if state.transactions.contains_key(&hash) {
        "tefALREADY"
    } else {
        match preflight(state, &prepared) {
            Some(code) => code,
            None => {
                let code = apply(state, &prepared);
                state.transactions.insert(
                    hash.clone(),
                    SimTransaction {
                        hash: hash.clone(),
                        tx_json: tx_json.clone(),
                        ledger_index: state.ledger_index,
                        result: code.to_string(),
                    },
                );
                code
            }
        }
    };

    debug!(
        tx_type = prepared.transaction.type_name(),
        hash = %hash,
        engine_result = code,
        "LocalSim applied submission"
    );

    let mut tx_json = tx_json;
    tx_json["hash"] = Value::from(hash);
    Ok(json!({
        "engine_result": code,
        "engine_result_message": describe_result(code),
        "accepted": !code.starts_with("tem") && !code.starts_with("tef"),
        "tx_blob": blob,
        "tx_json": tx_json,
    }))
}

fn tx(state: &SimState, params: &Value) -> GatewayResult<Value> {
    let hash = params
        .get("transaction")
        .and_then(Value::as_str)
        .ok_or_else(|| request_error("invalidParams", "Missing field 'transaction'."))?;
    let record = state
        .transactions
        .get(hash)
        .ok_or_else(|| request_error("txnNotFound", "Transaction not found."))?;

    let mut result = record.tx_json.clone();
    result["hash"] = Value::from(record.hash.clone());
    result["ledger_index"] = Value::from(record.ledger_index);
    result["validated"] = Value::from(record.ledger_index < state.ledger_index);
    result["meta"] = json!({ "TransactionResult": record.result });
    Ok(result)
}

// ── Transaction engine ───────────────────────────────────────────────────────

/// Checks that reject a transaction without applying it
fn preflight(state: &SimState, prepared: &PreparedTransaction) -> Option<&'static str> {
    if let LedgerTransaction::EscrowCreate(create) = &prepared.transaction {
        if create.amount.as_u64() == 0 {
            return Some("temBAD_AMOUNT");
        }
        if create.finish_after >= create.cancel_after {
            return Some("temBAD_EXPIRATION");
        }
    }

    let account = match state.accounts.get(prepared.transaction.account()) {
        Some(account) => account,
        None => return Some("terNO_ACCOUNT"),
    };

    if prepared.sequence() < account.sequence {
        return Some("tefPAST_SEQ");
    }
    if prepared.sequence() > account.sequence {
        return Some("terPRE_SEQ");
    }
    if prepared.last_ledger_sequence() < state.ledger_index {
        return Some("tefMAX_LEDGER");
    }
    if account.balance < prepared.autofill.fee {
        return Some("terINSUF_FEE_B");
    }
    None
}

/// Apply a transaction that passed preflight. The fee is charged and the
/// sequence consumed whatever the result.
fn apply(state: &mut SimState, prepared: &PreparedTransaction) -> &'static str {
    let now = state.close_time();
    let fee = prepared.autofill.fee;
    let submitter = prepared.transaction.account().clone();

    if let Some(account) = state.accounts.get_mut(&submitter) {
        account.balance = Drops::new(account.balance.as_u64() - fee.as_u64());
        account.sequence += 1;
    }

    match &prepared.transaction {
        LedgerTransaction::EscrowCreate(create) => {
            if !state.accounts.contains_key(&create.destination) {
                return "tecNO_DST";
            }
            let Some(owner) = state.accounts.get_mut(&create.account) else {
                return "terNO_ACCOUNT";
            };
            match owner.balance.checked_sub(create.amount) {
                Some(rest) => owner.balance = rest,
                None => return "tecUNFUNDED",
            }
            state.escrows.insert(
                (create.account.clone(), prepared.sequence()),
                SimEscrow {
                    owner: create.account.clone(),
                    destination: create.destination.clone(),
                    amount: create.amount,
                    finish_after: create.finish_after,
                    cancel_after: create.cancel_after,
                    destination_tag: create.destination_tag,
                },
            );
            "tesSUCCESS"
        }
        LedgerTransaction::EscrowFinish(finish) => {
            let key = (finish.owner.clone(), finish.offer_sequence.value());
            match state.escrows.get(&key) {
                None => return "tecNO_TARGET",
                Some(escrow) if now < escrow.finish_after || now >= escrow.cancel_after => {
                    return "tecNO_PERMISSION"
                }
                Some(_) => {}
            }
            if let Some(escrow) = state.escrows.remove(&key) {
                credit(state, &escrow.destination, escrow.amount);
            }
            "tesSUCCESS"
        }
        LedgerTransaction::EscrowCancel(cancel) => {
            let key = (cancel.owner.clone(), cancel.offer_sequence.value());
            match state.escrows.get(&key) {
                None => return "tecNO_TARGET",
                Some(escrow) if now < escrow.cancel_after => return "tecNO_PERMISSION",
                Some(_) => {}
            }
            if let Some(escrow) = state.escrows.remove(&key) {
                credit(state, &escrow.owner, escrow.amount);
            }
            "tesSUCCESS"
        }
    }
}

fn credit(state: &mut SimState, address: &AccountAddress, amount: Drops) {
    if let Some(account) = state.accounts.get_mut(address) {
        account.balance = account.balance.checked_add(amount).unwrap_or(account.balance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buyer() -> AccountAddress {
        AccountAddress::parse("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh").unwrap()
    }

    async fn open_sim() -> LocalSimLedger {
        let mut sim = LocalSimLedger::new();
        sim.fund(&buyer(), "sBuyerSecret", Drops::new(1_000_000_000));
        sim.open().await.unwrap();
        sim
    }

    #[tokio::test]
    async fn test_request_requires_open() {
        let mut sim = LocalSimLedger::new();
        let err = sim.request("ledger_current", Value::Null).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotConnected));
    }

    #[tokio::test]
    async fn test_each_request_closes_a_ledger() {
        let mut sim = open_sim().await;
        let first = sim.request("ledger_current", Value::Null).await.unwrap();
        let second = sim.request("ledger_current", Value::Null).await.unwrap();
        assert_eq!(
            second["ledger_current_index"].as_u64().unwrap(),
            first["ledger_current_index"].as_u64().unwrap() + 1
        );
    }

    #[tokio::test]
    async fn test_account_info() {
        let mut sim = open_sim().await;
        let info = sim
            .request("account_info", json!({ "account": buyer().as_str() }))
            .await
            .unwrap();
        assert_eq!(info["account_data"]["Sequence"], 1);
        assert_eq!(info["account_data"]["Balance"], "1000000000");

        let err = sim
            .request("account_info", json!({ "account": "rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe" }))
            .await
            .unwrap_err();
        assert_eq!(err.ledger_code(), Some("actNotFound"));
    }

    #[tokio::test]
    async fn test_sign_checks_secret() {
        let mut sim = open_sim().await;
        let tx_json = json!({ "TransactionType": "EscrowCancel", "Account": buyer().as_str() });

        let err = sim
            .request("sign", json!({ "tx_json": tx_json, "secret": "sWrong" }))
            .await
            .unwrap_err();
        assert_eq!(err.ledger_code(), Some("badSecret"));

        let signed = sim
            .request("sign", json!({ "tx_json": tx_json, "secret": "sBuyerSecret" }))
            .await
            .unwrap();
        let hash = signed["tx_json"]["hash"].as_str().unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_offline_drops_connection() {
        let mut sim = open_sim().await;
        sim.set_offline(true);

        let err = sim.request("fee", Value::Null).await.unwrap_err();
        assert!(err.is_transport());
        assert!(!sim.is_open());
        assert!(sim.open().await.is_err());

        sim.set_offline(false);
        sim.open().await.unwrap();
        assert!(sim.request("fee", Value::Null).await.is_ok());
    }

    #[test]
    fn test_advance_moves_close_time() {
        let sim = LocalSimLedger::new();
        let before = sim.close_time();
        sim.advance(Duration::from_secs(3_600));
        assert!(sim.close_time() >= before + 3_600);
    }

    #[test]
    fn test_fund_tops_up() {
        let sim = LocalSimLedger::new();
        sim.fund(&buyer(), "s1", Drops::new(5));
        sim.fund(&buyer(), "s1", Drops::new(7));
        assert_eq!(sim.balance(&buyer()), Some(Drops::new(12)));
    }
}
