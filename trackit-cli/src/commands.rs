//! Command handlers for the CLI

use chrono::NaiveDate;
use std::sync::Arc;

use trackit_core::{JourneyEvent, JourneyStage, ProductCondition, ProductId};
use trackit_engine::{
    AppendError, AppendProtocol, AppendRequest, LedgerConfig, LedgerGateway, LedgerTransaction,
    Registration, VerificationFront, VerifyError,
};

type CmdResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Handle `trackit register`
pub async fn handle_register<G: LedgerGateway>(
    gateway: Arc<G>,
    name: String,
    origin: String,
    date: NaiveDate,
    description: String,
    submitted_by: String,
    base_uri: String,
) -> CmdResult {
    let protocol = AppendProtocol::new(gateway);
    let registered = protocol
        .register_product(Registration {
            name,
            origin,
            manufacture_date: date,
            description,
            submitted_by,
            base_uri,
        })
        .await?;

    println!("Product registered successfully!");
    println!("  Product ID: {}", registered.record.id);
    println!("  Reference:  {}", registered.reference);
    println!("  Tx digest:  {}", registered.tx_digest);
    Ok(())
}

/// Handle `trackit append`
pub async fn handle_append<G: LedgerGateway>(
    gateway: Arc<G>,
    product_id: String,
    stage: String,
    location: String,
    condition: String,
    notes: Option<String>,
    submitted_by: String,
) -> CmdResult {
    let protocol = AppendProtocol::new(gateway);
    let result = protocol
        .append_event(AppendRequest {
            product_id,
            stage: JourneyStage::from_label(&stage),
            location,
            condition: ProductCondition::from_label(&condition),
            notes,
            submitted_by,
        })
        .await;

    match result {
        Ok(accepted) => {
            println!("Journey event recorded!");
            println!("  Product ID: {}", accepted.product_id);
            println!("  Tx digest:  {}", accepted.tx_digest);
            Ok(())
        }
        Err(AppendError::Undetermined(msg)) => {
            println!("Submission outcome UNKNOWN: {msg}");
            println!("The event may or may not have been recorded.");
            println!("Run `trackit verify <product-id>` and check the timeline");
            println!("before resubmitting - a blind retry can duplicate the event.");
            Err(AppendError::Undetermined(msg).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Handle `trackit verify`
pub async fn handle_verify<G: LedgerGateway>(
    gateway: Arc<G>,
    config: LedgerConfig,
    input: &str,
) -> CmdResult {
    let front = VerificationFront::new(gateway, config);
    let view = match front.verify(input).await {
        Ok(view) => view,
        Err(VerifyError::UnknownProduct(id)) => {
            println!("No product is registered under {id}.");
            return Err(VerifyError::UnknownProduct(id).into());
        }
        Err(VerifyError::TemporarilyUnavailable(msg)) => {
            println!("The ledger could not be reached - this does NOT mean the");
            println!("product is missing. Try again in a moment.");
            return Err(VerifyError::TemporarilyUnavailable(msg).into());
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", view.record.name);
    println!("  Product ID: {}", view.record.id);
    println!("  Origin:     {}", view.record.origin);
    println!("  Registered: {}", view.record.registered_at);
    if !view.record.description.is_empty() {
        println!("  {}", view.record.description);
    }

    println!();
    println!("Journey ({} checkpoints):", view.timeline.len());
    for entry in &view.timeline {
        println!(
            "  [{}] {} @ {} - {}{}",
            entry.ledger_timestamp_ms,
            entry.event.stage,
            entry.event.location,
            entry.event.condition,
            if entry.verified { " (verified)" } else { "" },
        );
        if let Some(notes) = &entry.event.notes {
            println!("      notes: {notes}");
        }
    }
    if view.skipped_events > 0 {
        println!(
            "  ({} unreadable event(s) were skipped)",
            view.skipped_events
        );
    }
    Ok(())
}

/// Handle `trackit history`
pub async fn handle_history<G: LedgerGateway>(gateway: Arc<G>, address: &str) -> CmdResult {
    let transactions = gateway.query_transactions_by_address(address).await?;

    if transactions.is_empty() {
        println!("No transactions found for {address}.");
        return Ok(());
    }

    println!("Transactions submitted by {address}:");
    for tx in &transactions {
        println!("  [{}] {}", tx.timestamp_ms, tx.tx_digest);
    }
    Ok(())
}

/// Handle `trackit cost`
pub async fn handle_cost<G: LedgerGateway>(
    gateway: Arc<G>,
    product_id: String,
    stage: String,
    location: String,
    condition: String,
) -> CmdResult {
    let event = JourneyEvent {
        product_id: ProductId::parse(product_id.trim())?,
        stage: JourneyStage::from_label(&stage),
        location,
        condition: ProductCondition::from_label(&condition),
        notes: None,
        reported_at: chrono::Utc::now(),
        submitted_by: "cost-estimate".to_string(),
    };

    let estimate = gateway
        .estimate_cost(&LedgerTransaction::RecordJourneyEvent { event })
        .await?;

    println!("Estimated cost (dry run, nothing committed):");
    println!("  Computation: {}", estimate.computation_cost);
    println!("  Storage:     {}", estimate.storage_cost);
    println!("  Total:       {}", estimate.total());
    Ok(())
}
