//! Order Reliability Binary
//!
//! Runs a short scripted session against the in-memory paper broker and
//! prints the outcome of each operation.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-reliability -- config.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `ORDER_RELIABILITY_CONFIG`: Config file path when no argument is given
//! - `RUST_LOG`: Log filter (default: `order_reliability=info`)

use std::sync::Arc;

use anyhow::Context;
use order_reliability::application::OrderReliability;
use order_reliability::config::{Config, load_config};
use order_reliability::domain::order::{CloseRequest, ModifyRequest, OrderKind, OrderRequest};
use order_reliability::error::OperationResultExt;
use order_reliability::infrastructure::{PaperBroker, TokioSleeper};
use order_reliability::observability::{MetricsConfig, init_metrics, init_tracing};
use rust_decimal::Decimal;

type Engine = OrderReliability<PaperBroker, PaperBroker, TokioSleeper>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = load()?;
    init_tracing(&config.observability.logging).context("failed to initialize tracing")?;

    if config.observability.metrics.enabled {
        let metrics = MetricsConfig::try_from(&config.observability.metrics)?;
        init_metrics(&metrics)?;
        tracing::info!(addr = %metrics.listen_addr, "Metrics exporter listening");
    }

    tracing::info!(
        instrument = %config.paper.instrument,
        max_retries = config.reliability.max_retries,
        limit_to_market = config.reliability.limit_to_market,
        "Starting paper session"
    );

    let broker = Arc::new(PaperBroker::new(&config.paper));
    let engine = OrderReliability::new(
        Arc::clone(&broker),
        Arc::clone(&broker),
        Arc::new(TokioSleeper),
        config.reliability.clone(),
    );

    run_session(&engine, &config).await;

    tracing::info!(calls = ?broker.calls(), "Paper session finished");
    Ok(())
}

/// Config path from argv, then the environment; defaults otherwise.
fn load() -> anyhow::Result<Config> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("ORDER_RELIABILITY_CONFIG").ok());
    match path {
        Some(path) => load_config(Some(&path)).with_context(|| format!("failed to load config from {path}")),
        None => Ok(Config::default()),
    }
}

async fn run_session(engine: &Engine, config: &Config) {
    let paper = &config.paper;
    let spread = paper.ask - paper.bid;
    let distance = Decimal::from(paper.stop_level) * paper.point * Decimal::from(20);

    let market = engine
        .send_order(
            OrderRequest::new(&paper.instrument, OrderKind::Buy, Decimal::ONE, paper.ask)
                .with_slippage(3)
                .with_stops(paper.bid - distance, paper.ask + distance)
                .with_comment("session market"),
        )
        .await;
    report("SendOrder", market.ticket_or_sentinel(), &market);

    let pending = engine
        .send_order(
            OrderRequest::new(&paper.instrument, OrderKind::SellLimit, Decimal::ONE, paper.bid + spread)
                .with_stops(paper.bid + distance, Decimal::ZERO),
        )
        .await;
    report("SendOrder (pending)", pending.ticket_or_sentinel(), &pending);

    let two_step = engine
        .send_order_two_step(
            OrderRequest::new(&paper.instrument, OrderKind::Sell, Decimal::ONE, paper.bid)
                .with_slippage(3)
                .with_stops(paper.ask + distance, paper.bid - distance),
        )
        .await;
    report("SendOrderTwoStep", two_step.ticket_or_sentinel(), &two_step);

    if let Ok(ticket) = market {
        let modified = engine
            .modify_order(ModifyRequest::new(ticket, Decimal::ZERO, paper.bid - distance / Decimal::TWO, Decimal::ZERO))
            .await;
        report("ModifyOrder", i64::from(modified.succeeded()), &modified);

        let closed = engine
            .close_order_with_live_repricing(CloseRequest::new(ticket, Decimal::ZERO, paper.bid, 3))
            .await;
        report("CloseOrderWithLiveRepricing", i64::from(closed.succeeded()), &closed);
    }

    if let Ok(ticket) = two_step {
        let closed = engine
            .close_order(CloseRequest::new(ticket, Decimal::ZERO, Decimal::ZERO, 3))
            .await;
        report("CloseOrder", i64::from(closed.succeeded()), &closed);
    }

    if let Ok(ticket) = pending {
        let cancelled = engine.cancel_pending_order(ticket).await;
        report("CancelPendingOrder", i64::from(cancelled.succeeded()), &cancelled);
    }
}

fn report<T, E: std::fmt::Display>(operation: &str, value: i64, result: &Result<T, E>) {
    match result {
        Ok(_) => println!("{operation:<28} ok     {value}"),
        Err(e) => println!("{operation:<28} failed {value}  {e}"),
    }
}
