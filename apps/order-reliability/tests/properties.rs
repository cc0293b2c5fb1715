//! Retry Loop Property Tests
//!
//! Invariants checked across generated reply sequences and quotes:
//! - submissions never exceed the attempt cap
//! - requote/price-changed replies never sleep; other retryable replies do
//! - simulated contexts call the endpoint exactly once, unmodified
//! - live repricing never sends a price beyond the caller's tolerance

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use order_reliability::infrastructure::PaperCall;
use order_reliability::{
    BrokerErrorCode, CloseRequest, OrderKind, OrderReliability, OrderRequest, PaperBroker, RecordingSleeper,
    ReliabilityConfig, config::PaperConfig,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use test_case::test_case;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

fn engine_with(
    paper: &PaperConfig,
    config: ReliabilityConfig,
) -> (Arc<PaperBroker>, Arc<RecordingSleeper>, OrderReliability<PaperBroker, PaperBroker, RecordingSleeper>) {
    let broker = Arc::new(PaperBroker::new(paper));
    let sleeper = Arc::new(RecordingSleeper::default());
    let engine = OrderReliability::new(Arc::clone(&broker), Arc::clone(&broker), Arc::clone(&sleeper), config);
    (broker, sleeper, engine)
}

fn retryable_code() -> impl Strategy<Value = BrokerErrorCode> {
    prop_oneof![
        Just(BrokerErrorCode::ServerBusy),
        Just(BrokerErrorCode::NoConnection),
        Just(BrokerErrorCode::TradeContextBusy),
        Just(BrokerErrorCode::OffQuotes),
        Just(BrokerErrorCode::Requote),
        Just(BrokerErrorCode::PriceChanged),
        Just(BrokerErrorCode::InvalidPrice),
        Just(BrokerErrorCode::InvalidStops),
    ]
}

proptest! {
    #[test]
    fn submissions_never_exceed_cap(
        max_retries in 0u32..8,
        codes in prop::collection::vec(retryable_code(), 0..20),
    ) {
        let config = ReliabilityConfig::default().with_max_retries(max_retries);
        let (broker, _, engine) = engine_with(&PaperConfig::default(), config);
        broker.script_rejects(PaperCall::Submit, &codes);

        let request = OrderRequest::new("EURUSD", OrderKind::Buy, dec!(1), dec!(1.20020)).with_slippage(3);
        let result = runtime().block_on(engine.send_order(request));

        let calls = broker.calls().submit;
        prop_assert!(calls <= max_retries + 1);
        // every scripted reply is retryable, so only the cap can stop a success
        prop_assert_eq!(result.is_ok(), codes.len() <= max_retries as usize);
    }

    #[test]
    fn live_repricing_stays_within_tolerance(
        offset in -30i64..30,
        tolerance in 0u32..10,
        short in any::<bool>(),
    ) {
        let (broker, _, engine) = engine_with(&PaperConfig::default(), ReliabilityConfig::default().with_max_retries(0));
        let kind = if short { OrderKind::Sell } else { OrderKind::Buy };
        // requested price `offset` increments away from the current entry side
        let entry = if short { dec!(1.20000) } else { dec!(1.20020) };
        let requested = entry + Decimal::from(offset) * dec!(0.0001);
        let request = OrderRequest::new("EURUSD", kind, dec!(1), requested).with_slippage(tolerance);

        let _ = runtime().block_on(engine.send_order_with_live_repricing(request));

        for sent in broker.submissions() {
            let sign = if short { Decimal::NEGATIVE_ONE } else { Decimal::ONE };
            let adverse = (sent.price - requested) * sign / dec!(0.0001);
            prop_assert!(adverse <= Decimal::from(tolerance));
            prop_assert!(adverse + Decimal::from(sent.slippage) <= Decimal::from(tolerance));
        }
    }
}

#[test_case(BrokerErrorCode::Requote, 0 ; "requote does not sleep")]
#[test_case(BrokerErrorCode::PriceChanged, 0 ; "price changed does not sleep")]
#[test_case(BrokerErrorCode::ServerBusy, 3 ; "busy sleeps")]
#[test_case(BrokerErrorCode::TradeContextBusy, 3 ; "context busy sleeps")]
#[test_case(BrokerErrorCode::InvalidStops, 3 ; "invalid stops sleeps")]
fn sleeps_per_reply(code: BrokerErrorCode, expected_sleeps: usize) {
    let (broker, sleeper, engine) = engine_with(&PaperConfig::default(), ReliabilityConfig::default());
    broker.script_rejects(PaperCall::Submit, &[code; 3]);

    let request = OrderRequest::new("EURUSD", OrderKind::Buy, dec!(1), dec!(1.20020)).with_slippage(3);
    runtime().block_on(engine.send_order(request)).unwrap();

    assert_eq!(broker.calls().submit, 4);
    assert_eq!(sleeper.count(), expected_sleeps);
}

#[test]
fn simulated_context_calls_once_without_corrections() {
    let paper = PaperConfig {
        simulated: true,
        ..PaperConfig::default()
    };
    let (broker, sleeper, engine) = engine_with(&paper, ReliabilityConfig::default());
    broker.script_rejects(PaperCall::Submit, &[BrokerErrorCode::InvalidStops]);
    // stop inside the minimum distance and a stale price: both left as given
    let request = OrderRequest::new("EURUSD", OrderKind::Buy, dec!(1), dec!(1.19000)).with_stops(dec!(1.19990), dec!(0));

    let result = runtime().block_on(engine.send_order(request.clone()));

    assert!(result.is_err());
    assert_eq!(broker.calls().submit, 1);
    assert_eq!(broker.submissions(), vec![request]);
    assert_eq!(sleeper.count(), 0);
}

#[test]
fn simulated_close_calls_once() {
    let paper = PaperConfig {
        simulated: true,
        ..PaperConfig::default()
    };
    let (broker, _, engine) = engine_with(&paper, ReliabilityConfig::default());
    let rt = runtime();
    let ticket = rt
        .block_on(engine.send_order(OrderRequest::new("EURUSD", OrderKind::Buy, dec!(1), dec!(1.20020))))
        .unwrap();
    broker.script_rejects(PaperCall::Close, &[BrokerErrorCode::Requote]);

    let result = rt.block_on(engine.close_order(CloseRequest::new(ticket, dec!(0), dec!(1.20000), 0)));

    assert!(result.is_err());
    assert_eq!(broker.calls().close, 1);
}

#[test]
fn simulation_opt_in_retries() {
    let paper = PaperConfig {
        simulated: true,
        ..PaperConfig::default()
    };
    let (broker, sleeper, engine) = engine_with(&paper, ReliabilityConfig::default().with_retry_in_simulation(true));
    broker.script_rejects(PaperCall::Submit, &[BrokerErrorCode::ServerBusy]);

    let request = OrderRequest::new("EURUSD", OrderKind::Buy, dec!(1), dec!(1.20020));
    runtime().block_on(engine.send_order(request)).unwrap();

    assert_eq!(broker.calls().submit, 2);
    // simulated contexts never sleep
    assert_eq!(sleeper.count(), 0);
}
