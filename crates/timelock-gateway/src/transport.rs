//! Ledger transport seam
//!
//! A transport speaks the node's request/response protocol: one JSON command
//! in, one JSON envelope out. The gateway layers autofill, signing and
//! submission on top of it.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{GatewayError, GatewayResult};

/// Connection to a ledger node
#[async_trait]
pub trait LedgerTransport: Send {
    /// Endpoint this transport talks to
    fn endpoint(&self) -> &str;

    /// Whether the connection is currently open
    fn is_open(&self) -> bool;

    /// Open the connection
    async fn open(&mut self) -> GatewayResult<()>;

    /// Close the connection
    async fn close(&mut self) -> GatewayResult<()>;

    /// Send one command and return the `result` object of its response
    async fn request(&mut self, command: &str, params: Value) -> GatewayResult<Value>;
}

/// Build a request envelope: `{"id": .., "command": .., ...params}`
pub fn build_request(id: u64, command: &str, params: Value) -> GatewayResult<Value> {
    let mut body = match params {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(GatewayError::protocol(format!(
                "command parameters must be an object, got {}",
                other
            )))
        }
    };
    body.insert("id".to_string(), Value::from(id));
    body.insert("command".to_string(), Value::from(command));
    Ok(Value::Object(body))
}

/// Unwrap a response envelope.
///
/// Success envelopes yield their `result`; error envelopes become
/// [`GatewayError::Request`] with the node's error token and message.
pub fn parse_response(envelope: Value) -> GatewayResult<Value> {
    let status = envelope
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("success");

    if status == "error" || envelope.get("error").is_some() {
        let source = if envelope.get("error").is_some() {
            &envelope
        } else {
            envelope.get("result").unwrap_or(&envelope)
        };
        let error = source
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let message = source
            .get("error_message")
            .or_else(|| source.get("error_exception"))
            .and_then(Value::as_str)
            .unwrap_or(&error)
            .to_string();
        return Err(GatewayError::Request { error, message });
    }

    match envelope {
        Value::Object(mut map) => map
            .remove("result")
            .ok_or_else(|| GatewayError::protocol("response has no result")),
        other => Err(GatewayError::protocol(format!("unexpected response: {}", other))),
    }
}

/// Response id, if the message is a response to a request
pub fn response_id(message: &Value) -> Option<u64> {
    if message.get("type").and_then(Value::as_str) == Some("response") || message.get("status").is_some() {
        message.get("id").and_then(Value::as_u64)
    } else {
        None
    }
}

/// Human-readable text for an engine result code
pub fn describe_result(code: &str) -> &'static str {
    match code {
        "tesSUCCESS" => "The transaction was applied.",
        "tecNO_PERMISSION" => "No permission to perform requested operation.",
        "tecNO_TARGET" => "Target of transaction not found.",
        "tecNO_DST" => "Destination does not exist.",
        "tecUNFUNDED" => "Insufficient balance to fund the escrow.",
        "tefPAST_SEQ" => "This sequence number has already passed.",
        "tefMAX_LEDGER" => "Ledger sequence too high.",
        "tefALREADY" => "The exact transaction was already in this ledger.",
        "temBAD_AMOUNT" => "Can only send positive amounts.",
        "temBAD_EXPIRATION" => "Malformed: Bad expiration.",
        "terPRE_SEQ" => "Missing/inapplicable prior transaction.",
        "terNO_ACCOUNT" => "The source account does not exist.",
        "terINSUF_FEE_B" => "Account balance can't pay fee.",
        _ => "Transaction failed.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_request() {
        let req = build_request(7, "account_info", json!({"account": "rX"})).unwrap();
        assert_eq!(req["id"], 7);
        assert_eq!(req["command"], "account_info");
        assert_eq!(req["account"], "rX");

        let req = build_request(1, "fee", Value::Null).unwrap();
        assert_eq!(req["command"], "fee");

        assert!(build_request(1, "fee", json!([1, 2])).is_err());
    }

    #[test]
    fn test_parse_success() {
        let result = parse_response(json!({
            "id": 1,
            "status": "success",
            "type": "response",
            "result": {"ledger_current_index": 42}
        }))
        .unwrap();
        assert_eq!(result["ledger_current_index"], 42);
    }

    #[test]
    fn test_parse_error() {
        let err = parse_response(json!({
            "id": 2,
            "status": "error",
            "type": "response",
            "error": "actNotFound",
            "error_message": "Account not found."
        }))
        .unwrap_err();

        match err {
            GatewayError::Request { error, message } => {
                assert_eq!(error, "actNotFound");
                assert_eq!(message, "Account not found.");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_response_id_ignores_stream_messages() {
        assert_eq!(response_id(&json!({"id": 3, "type": "response"})), Some(3));
        assert_eq!(response_id(&json!({"type": "ledgerClosed", "ledger_index": 9})), None);
    }
}
