//! JSON-RPC ledger gateway
//!
//! Talks to a full node over its JSON-RPC surface: typed event queries,
//! object reads, dry runs, and transaction submission. Reads are retried
//! with bounded exponential backoff on transient failures; submissions are
//! sent exactly once and ambiguous outcomes are reported as-is.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::error::{QueryError, SubmitError};
use crate::gateway::{
    CostEstimate, EventId, LedgerGateway, LedgerObject, LedgerReceipt, LedgerTransaction,
    RawLedgerEvent, TransactionSummary,
};

/// Gateway backed by a remote full node
pub struct RpcLedgerGateway {
    config: LedgerConfig,
    client: reqwest::Client,
}

/// Outcome of one RPC call, before mapping into the read or write taxonomy.
enum CallError {
    /// Transport-level fault; the request may never have reached the node
    Unreachable(String),
    /// The deadline elapsed with no response
    TimedOut(String),
    /// The node answered with an error object
    Node(String),
    /// The node answered with something unparseable
    Garbled(String),
}

impl RpcLedgerGateway {
    /// Create a gateway for the configured node endpoint.
    pub fn new(config: LedgerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    /// Issue one JSON-RPC call, no retries.
    async fn call(&self, method: &str, params: Value) -> Result<Value, CallError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.config.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CallError::TimedOut(format!("{method}: {e}"))
                } else {
                    CallError::Unreachable(format!("{method}: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(CallError::Unreachable(format!(
                "{method}: node returned status {}",
                response.status()
            )));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| CallError::Garbled(format!("{method}: {e}")))?;

        if let Some(err) = envelope.get("error") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unspecified node error");
            return Err(CallError::Node(format!("{method}: {message}")));
        }

        envelope
            .get("result")
            .cloned()
            .ok_or_else(|| CallError::Garbled(format!("{method}: response carries no result")))
    }

    /// Issue a read call, retrying transient failures with bounded backoff.
    async fn read_call(&self, method: &str, params: Value) -> Result<Value, QueryError> {
        let retry = &self.config.retry;
        let mut backoff_ms = retry.initial_backoff_ms;
        let mut attempt = 0;

        loop {
            let err = match self.call(method, params.clone()).await {
                Ok(result) => return Ok(result),
                Err(e) => Self::read_error(e),
            };

            if !err.is_transient() || attempt >= retry.max_retries {
                return Err(err);
            }

            attempt += 1;
            warn!(method, attempt, backoff_ms, error = %err, "retrying ledger read");
            tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
            backoff_ms =
                std::cmp::min((backoff_ms as f64 * retry.multiplier) as u64, retry.max_backoff_ms);
        }
    }

    fn read_error(err: CallError) -> QueryError {
        match err {
            CallError::Unreachable(msg) => QueryError::NetworkUnavailable(msg),
            CallError::TimedOut(msg) => QueryError::Timeout(msg),
            CallError::Node(msg) | CallError::Garbled(msg) => QueryError::MalformedResponse(msg),
        }
    }

    fn submit_error(err: CallError) -> SubmitError {
        match err {
            CallError::Unreachable(msg) => SubmitError::NetworkUnavailable(msg),
            CallError::TimedOut(msg) => SubmitError::Timeout(msg),
            CallError::Node(msg) => SubmitError::Rejected(msg),
            // The node answered something unparseable after we sent the
            // transaction: the outcome is unknown, not a rejection.
            CallError::Garbled(msg) => SubmitError::NetworkUnavailable(msg),
        }
    }
}

#[async_trait]
impl LedgerGateway for RpcLedgerGateway {
    async fn submit_transaction(
        &self,
        tx: &LedgerTransaction,
    ) -> Result<LedgerReceipt, SubmitError> {
        let payload = tx.encode()?;
        let params = json!([payload, [], { "showEffects": true }, "WaitForLocalExecution"]);

        // Exactly one attempt: a retry after an ambiguous fault could
        // land the transaction twice.
        let result = self
            .call("iota_executeTransactionBlock", params)
            .await
            .map_err(Self::submit_error)?;

        parse_receipt(&result)
    }

    async fn query_events_by_type(
        &self,
        event_type: &str,
    ) -> Result<Vec<RawLedgerEvent>, QueryError> {
        let mut events = Vec::new();
        let mut cursor = Value::Null;

        for page in 0..self.config.max_event_pages {
            let params = json!([
                { "MoveEventType": event_type },
                cursor,
                self.config.event_page_size,
                false,
            ]);
            let result = self.read_call("iotax_queryEvents", params).await?;
            let (page_events, next_cursor, has_next) = parse_event_page(&result)?;

            debug!(page, count = page_events.len(), "fetched event page");
            events.extend(page_events);

            if !has_next {
                return Ok(events);
            }
            cursor = next_cursor;
        }

        warn!(
            max_pages = self.config.max_event_pages,
            collected = events.len(),
            "event query hit the page bound with more pages remaining"
        );
        Ok(events)
    }

    async fn query_transactions_by_address(
        &self,
        address: &str,
    ) -> Result<Vec<TransactionSummary>, QueryError> {
        let mut transactions = Vec::new();
        let mut cursor = Value::Null;

        for _ in 0..self.config.max_event_pages {
            let params = json!([
                { "filter": { "FromAddress": address }, "options": { "showEffects": true } },
                cursor,
                self.config.event_page_size,
                false,
            ]);
            let result = self
                .read_call("iotax_queryTransactionBlocks", params)
                .await?;
            let (page, next_cursor, has_next) = parse_transaction_page(&result)?;
            transactions.extend(page);

            if !has_next {
                return Ok(transactions);
            }
            cursor = next_cursor;
        }

        warn!(
            address,
            collected = transactions.len(),
            "address history query hit the page bound with more pages remaining"
        );
        Ok(transactions)
    }

    async fn get_object(&self, object_id: &str) -> Result<LedgerObject, QueryError> {
        let params = json!([object_id, { "showContent": true, "showBcs": true }]);
        let result = self.read_call("iota_getObject", params).await?;
        parse_object(&result)
    }

    async fn estimate_cost(&self, tx: &LedgerTransaction) -> Result<CostEstimate, QueryError> {
        let payload = tx
            .encode()
            .map_err(|e| QueryError::MalformedResponse(e.to_string()))?;
        let result = self
            .read_call("iota_dryRunTransactionBlock", json!([payload]))
            .await?;
        parse_cost(&result)
    }
}

// ============================================================================
// Response parsing
// ============================================================================

/// Accept a u64 encoded either as a JSON number or a decimal string (the
/// node uses strings for anything that can exceed 2^53).
fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_receipt(result: &Value) -> Result<LedgerReceipt, SubmitError> {
    let tx_digest = result
        .get("digest")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            SubmitError::NetworkUnavailable(
                "execution response carries no digest; outcome unknown".to_string(),
            )
        })?
        .to_string();
    let timestamp_ms = result.get("timestampMs").and_then(parse_u64).unwrap_or(0);
    Ok(LedgerReceipt {
        tx_digest,
        timestamp_ms,
    })
}

fn parse_event_page(result: &Value) -> Result<(Vec<RawLedgerEvent>, Value, bool), QueryError> {
    let data = result
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| QueryError::MalformedResponse("event page carries no data".to_string()))?;

    let mut events = Vec::with_capacity(data.len());
    for item in data {
        events.push(parse_raw_event(item)?);
    }

    let has_next = result
        .get("hasNextPage")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let next_cursor = result.get("nextCursor").cloned().unwrap_or(Value::Null);
    Ok((events, next_cursor, has_next))
}

fn parse_raw_event(item: &Value) -> Result<RawLedgerEvent, QueryError> {
    let id = item
        .get("id")
        .ok_or_else(|| QueryError::MalformedResponse("event carries no id".to_string()))?;
    let tx_digest = id
        .get("txDigest")
        .and_then(Value::as_str)
        .ok_or_else(|| QueryError::MalformedResponse("event id carries no txDigest".to_string()))?
        .to_string();
    let event_seq = id.get("eventSeq").and_then(parse_u64).ok_or_else(|| {
        QueryError::MalformedResponse("event id carries no eventSeq".to_string())
    })?;
    let timestamp_ms = item.get("timestampMs").and_then(parse_u64).ok_or_else(|| {
        QueryError::MalformedResponse("event carries no timestampMs".to_string())
    })?;
    let event_type = item
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let parsed = item.get("parsedJson").cloned().unwrap_or(Value::Null);

    Ok(RawLedgerEvent {
        id: EventId {
            tx_digest,
            event_seq,
        },
        event_type,
        timestamp_ms,
        parsed,
    })
}

fn parse_transaction_page(
    result: &Value,
) -> Result<(Vec<TransactionSummary>, Value, bool), QueryError> {
    let data = result.get("data").and_then(Value::as_array).ok_or_else(|| {
        QueryError::MalformedResponse("transaction page carries no data".to_string())
    })?;

    let mut transactions = Vec::with_capacity(data.len());
    for item in data {
        let tx_digest = item
            .get("digest")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                QueryError::MalformedResponse("transaction carries no digest".to_string())
            })?
            .to_string();
        let timestamp_ms = item.get("timestampMs").and_then(parse_u64).unwrap_or(0);
        transactions.push(TransactionSummary {
            tx_digest,
            timestamp_ms,
        });
    }

    let has_next = result
        .get("hasNextPage")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let next_cursor = result.get("nextCursor").cloned().unwrap_or(Value::Null);
    Ok((transactions, next_cursor, has_next))
}

fn parse_object(result: &Value) -> Result<LedgerObject, QueryError> {
    let data = result
        .get("data")
        .ok_or_else(|| QueryError::MalformedResponse("object response carries no data".to_string()))?;
    let object_id = data
        .get("objectId")
        .and_then(Value::as_str)
        .ok_or_else(|| QueryError::MalformedResponse("object carries no objectId".to_string()))?
        .to_string();
    let version = data.get("version").and_then(parse_u64).unwrap_or(0);

    // Move objects nest their fields under content.fields.
    let content = data
        .get("content")
        .map(|c| c.get("fields").unwrap_or(c).clone())
        .ok_or_else(|| QueryError::MalformedResponse("object carries no content".to_string()))?;
    let bcs = data
        .get("bcs")
        .and_then(|b| b.get("bcsBytes"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(LedgerObject {
        object_id,
        version,
        content,
        bcs,
    })
}

fn parse_cost(result: &Value) -> Result<CostEstimate, QueryError> {
    let gas = result
        .get("effects")
        .and_then(|e| e.get("gasUsed"))
        .ok_or_else(|| {
            QueryError::MalformedResponse("dry run response carries no gasUsed".to_string())
        })?;
    let computation_cost = gas
        .get("computationCost")
        .and_then(parse_u64)
        .unwrap_or(0);
    let storage_cost = gas.get("storageCost").and_then(parse_u64).unwrap_or(0);
    Ok(CostEstimate {
        computation_cost,
        storage_cost,
    })
}
