//! Retry Orchestrator
//!
//! Per-operation retry loop expressed as an explicit state machine:
//!
//! ```text
//! Init -> Attempting -> Succeeded
//!                    -> CorrectingAndRetrying -> Attempting
//!                    -> BackoffThenRetry      -> Attempting
//!                    -> ImmediateRetry        -> Attempting
//!                    -> Verifying             (caller reconciles)
//!                    -> Failed
//! ```
//!
//! [`next_phase`] is the pure transition function. The loop in
//! [`RetryOrchestrator::run`] refreshes the market snapshot before every
//! attempt, lets the [`AttemptDriver`] reprice or hold the request, submits it,
//! classifies the reply and acts on the phase. The backoff sleep is the only
//! suspension point.
//!
//! Attempts are counted per iteration, including iterations where the driver
//! holds the request back without contacting the endpoint, so an operation
//! never exceeds `max_attempts` iterations.

use async_trait::async_trait;
use serde_json::Value;

use super::order_details::OrderDetailsAccessor;
use crate::application::ports::{MarketDataPort, OrderEndpointPort, Sleeper};
use crate::broker::{BackoffPolicy, BrokerErrorCode, ClassificationPolicy, ErrorCategory, OperationKind, classify};
use crate::domain::corrections::SlippageCheck;
use crate::domain::instrument::InstrumentMetadata;
use crate::error::OperationError;
use crate::observability::{self, OperationLog, Verbosity};

/// Mutable bookkeeping of one operation. Never shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Iterations consumed so far.
    pub attempts: u32,
    /// Iteration cap (initial attempt plus retries).
    pub max_attempts: u32,
    /// A pending price has been snapped once; later corrections nudge.
    pub fixed_invalid_price: bool,
    /// Last raw code returned by the endpoint.
    pub last_code: Option<BrokerErrorCode>,
}

impl RetryState {
    /// Fresh state for an operation.
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            fixed_invalid_price: false,
            last_code: None,
        }
    }

    /// Returns true once the cap is reached.
    #[must_use]
    pub const fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Iterations left.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    fn exhausted_error(&self) -> OperationError {
        OperationError::RetriesExhausted {
            code: self.last_code,
            attempts: self.attempts,
        }
    }
}

/// Phase following a classified reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    /// Correct the request, back off, resubmit.
    CorrectingAndRetrying,
    /// Back off, resubmit unchanged.
    BackoffThenRetry,
    /// Resubmit without sleeping.
    ImmediateRetry,
    /// Outcome unknown; verify against order state.
    Verifying,
    /// Done.
    Succeeded,
    /// Abandon.
    Failed,
}

/// Transition out of `Attempting` for a reply of `category`.
///
/// A retryable reply at the attempt cap fails regardless of category.
#[must_use]
pub const fn next_phase(category: ErrorCategory, state: &RetryState) -> RetryPhase {
    match category {
        ErrorCategory::Success => RetryPhase::Succeeded,
        ErrorCategory::Ambiguous => RetryPhase::Verifying,
        ErrorCategory::Fatal => RetryPhase::Failed,
        _ if state.exhausted() => RetryPhase::Failed,
        ErrorCategory::RetryableTransient => RetryPhase::BackoffThenRetry,
        ErrorCategory::RetryableImmediate => RetryPhase::ImmediateRetry,
        ErrorCategory::RetryableCorrectable => RetryPhase::CorrectingAndRetrying,
    }
}

/// What to do with the request before an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preparation {
    /// Submit the request.
    Submit,
    /// Do not contact the endpoint this iteration; treat as transient.
    Hold(SlippageCheck),
}

/// Result of correcting the request after a correctable reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// Request changed; the label names the correction.
    Applied(&'static str),
    /// Leave the loop and resubmit as a market order.
    ConvertToMarket(SlippageCheck),
    /// Nothing to correct; retried as transient.
    NotApplicable,
}

/// One operation kind's view of the loop.
#[async_trait]
pub trait AttemptDriver: Send {
    /// Successful result of one submission.
    type Output: Send;

    /// Classification rows to use.
    fn operation(&self) -> OperationKind;

    /// Instrument whose snapshot is refreshed before every attempt.
    fn instrument(&self) -> &str;

    /// Reprice or hold the request against a fresh snapshot.
    fn prepare(&mut self, _meta: &InstrumentMetadata) -> Preparation {
        Preparation::Submit
    }

    /// Call the endpoint primitive once.
    async fn submit(&mut self) -> Result<Self::Output, BrokerErrorCode>;

    /// Correct the request after a correctable reply.
    fn correct(&mut self, _code: BrokerErrorCode, _meta: &InstrumentMetadata, _state: &mut RetryState) -> Correction {
        Correction::NotApplicable
    }

    /// Output for a success-class code returned in place of a result.
    fn success_without_result(&self) -> Option<Self::Output> {
        None
    }

    /// Current request parameters, for logs.
    fn describe(&self) -> Value;
}

/// Terminal outcome of one loop.
#[derive(Debug)]
pub enum LoopOutcome<T> {
    /// Endpoint reported success.
    Succeeded {
        /// Submission result.
        output: T,
        /// Iterations consumed.
        attempts: u32,
    },
    /// Endpoint reply does not establish whether the operation executed.
    Ambiguous {
        /// Reply code.
        code: BrokerErrorCode,
        /// Iterations consumed.
        attempts: u32,
    },
    /// Pending order must be resubmitted as a market order.
    ConvertToMarket {
        /// Slippage measured at conversion.
        check: SlippageCheck,
        /// Iterations consumed.
        attempts: u32,
    },
    /// Operation failed.
    Failed(OperationError),
}

impl<T> LoopOutcome<T> {
    /// Collapse to a result for operations that neither convert nor verify.
    ///
    /// # Errors
    ///
    /// Every outcome other than `Succeeded` is an error.
    pub fn into_result(self, operation: &str) -> Result<T, OperationError> {
        match self {
            Self::Succeeded { output, .. } => Ok(output),
            Self::Ambiguous { code, attempts } => Err(OperationError::Ambiguous {
                reason: format!("{operation} reply {code} after {attempts} attempt(s) does not establish the outcome"),
            }),
            Self::ConvertToMarket { .. } => Err(OperationError::InvalidRequest(format!(
                "{operation} cannot convert to a market order"
            ))),
            Self::Failed(error) => Err(error),
        }
    }
}

/// Drives an [`AttemptDriver`] to a terminal outcome.
pub struct RetryOrchestrator<'a, E, M, S> {
    accessor: OrderDetailsAccessor<'a, E, M>,
    sleeper: &'a S,
    backoff: BackoffPolicy,
    policy: ClassificationPolicy,
    log: OperationLog,
}

impl<'a, E, M, S> RetryOrchestrator<'a, E, M, S>
where
    E: OrderEndpointPort,
    M: MarketDataPort,
    S: Sleeper,
{
    /// Create an orchestrator.
    pub const fn new(
        accessor: OrderDetailsAccessor<'a, E, M>,
        sleeper: &'a S,
        backoff: BackoffPolicy,
        policy: ClassificationPolicy,
        log: OperationLog,
    ) -> Self {
        Self {
            accessor,
            sleeper,
            backoff,
            policy,
            log,
        }
    }

    /// Run `driver` until a terminal outcome, continuing from `state`.
    pub async fn run<D>(&self, driver: &mut D, state: &mut RetryState) -> LoopOutcome<D::Output>
    where
        D: AttemptDriver,
    {
        let operation = driver.operation();
        let tag = self.log.operation();

        loop {
            if state.exhausted() {
                return self.fail(driver, state.exhausted_error());
            }

            let meta = match self.accessor.instrument_metadata(driver.instrument()).await {
                Ok(meta) => meta,
                Err(e) => return self.fail(driver, e.into()),
            };

            if let Preparation::Hold(check) = driver.prepare(&meta) {
                state.attempts += 1;
                if self.log.allows(Verbosity::Warn) {
                    tracing::warn!(
                        operation = tag,
                        attempt = state.attempts,
                        slipped_points = %check.slipped_points,
                        "Slippage beyond tolerance, not submitting"
                    );
                }
                if state.exhausted() {
                    return self.fail(driver, state.exhausted_error());
                }
                self.back_off(operation).await;
                continue;
            }

            state.attempts += 1;
            observability::record_submission(operation.as_str());

            let code = match driver.submit().await {
                Ok(output) => return self.succeed(driver, output, state.attempts),
                Err(code) => code,
            };
            state.last_code = Some(code);

            let category = classify(code, operation, self.policy);
            observability::record_outcome(operation.as_str(), category.as_str());

            match next_phase(category, state) {
                RetryPhase::Succeeded => {
                    if let Some(output) = driver.success_without_result() {
                        return self.succeed(driver, output, state.attempts);
                    }
                    return self.ambiguous(code, state.attempts);
                }
                RetryPhase::Verifying => return self.ambiguous(code, state.attempts),
                RetryPhase::Failed => {
                    let error = if category == ErrorCategory::Fatal {
                        OperationError::Fatal {
                            code,
                            attempts: state.attempts,
                        }
                    } else {
                        state.exhausted_error()
                    };
                    return self.fail(driver, error);
                }
                RetryPhase::ImmediateRetry => {
                    self.retrying(code, category, state);
                }
                RetryPhase::BackoffThenRetry => {
                    self.retrying(code, category, state);
                    self.back_off(operation).await;
                }
                RetryPhase::CorrectingAndRetrying => {
                    self.retrying(code, category, state);
                    let meta = match self.accessor.instrument_metadata(driver.instrument()).await {
                        Ok(meta) => meta,
                        Err(e) => return self.fail(driver, e.into()),
                    };
                    match driver.correct(code, &meta, state) {
                        Correction::ConvertToMarket(check) => {
                            return LoopOutcome::ConvertToMarket {
                                check,
                                attempts: state.attempts,
                            };
                        }
                        Correction::Applied(label) => {
                            observability::record_correction(operation.as_str(), label);
                            if self.log.allows(Verbosity::Info) {
                                tracing::info!(operation = tag, correction = label, request = %driver.describe(), "Request corrected");
                            }
                        }
                        Correction::NotApplicable => {}
                    }
                    self.back_off(operation).await;
                }
            }
        }
    }

    async fn back_off(&self, operation: OperationKind) {
        if let Some(delay) = self.backoff.delay_for(self.accessor.is_simulated()) {
            observability::record_backoff(operation.as_str(), delay);
            self.sleeper.sleep(delay).await;
        }
    }

    fn retrying(&self, code: BrokerErrorCode, category: ErrorCategory, state: &RetryState) {
        if self.log.allows(Verbosity::Warn) {
            tracing::warn!(
                operation = self.log.operation(),
                %code,
                %category,
                attempt = state.attempts,
                max_attempts = state.max_attempts,
                "Retryable error"
            );
        }
    }

    fn succeed<D: AttemptDriver>(&self, driver: &D, output: D::Output, attempts: u32) -> LoopOutcome<D::Output> {
        if self.log.allows(Verbosity::Info) {
            tracing::info!(
                operation = self.log.operation(),
                attempts,
                request = %driver.describe(),
                "Operation succeeded"
            );
        }
        LoopOutcome::Succeeded { output, attempts }
    }

    fn ambiguous<T>(&self, code: BrokerErrorCode, attempts: u32) -> LoopOutcome<T> {
        if self.log.allows(Verbosity::Warn) {
            tracing::warn!(
                operation = self.log.operation(),
                %code,
                attempts,
                "Ambiguous reply, verification required"
            );
        }
        LoopOutcome::Ambiguous { code, attempts }
    }

    fn fail<D: AttemptDriver>(&self, driver: &D, error: OperationError) -> LoopOutcome<D::Output> {
        self.log.failure(&error, &driver.describe());
        LoopOutcome::Failed(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaperConfig;
    use crate::infrastructure::clock::RecordingSleeper;
    use crate::infrastructure::paper::PaperBroker;
    use serde_json::json;
    use std::collections::VecDeque;
    use test_case::test_case;

    struct Scripted {
        replies: VecDeque<Result<u32, BrokerErrorCode>>,
        calls: u32,
        corrections: u32,
        hold_first: u32,
    }

    impl Scripted {
        fn new(replies: Vec<Result<u32, BrokerErrorCode>>) -> Self {
            Self {
                replies: replies.into(),
                calls: 0,
                corrections: 0,
                hold_first: 0,
            }
        }
    }

    #[async_trait]
    impl AttemptDriver for Scripted {
        type Output = u32;

        fn operation(&self) -> OperationKind {
            OperationKind::Send
        }

        fn instrument(&self) -> &str {
            "EURUSD"
        }

        fn prepare(&mut self, _meta: &InstrumentMetadata) -> Preparation {
            if self.hold_first > 0 {
                self.hold_first -= 1;
                return Preparation::Hold(SlippageCheck {
                    delta: rust_decimal::Decimal::ONE,
                    slipped_points: rust_decimal::Decimal::TEN,
                    within_tolerance: false,
                    remaining_points: 0,
                });
            }
            Preparation::Submit
        }

        async fn submit(&mut self) -> Result<u32, BrokerErrorCode> {
            self.calls += 1;
            self.replies.pop_front().unwrap_or(Err(BrokerErrorCode::ServerBusy))
        }

        fn correct(&mut self, _code: BrokerErrorCode, _meta: &InstrumentMetadata, _state: &mut RetryState) -> Correction {
            self.corrections += 1;
            Correction::Applied("test")
        }

        fn describe(&self) -> Value {
            json!({"calls": self.calls})
        }
    }

    fn orchestrator<'a>(
        broker: &'a PaperBroker,
        sleeper: &'a RecordingSleeper,
    ) -> RetryOrchestrator<'a, PaperBroker, PaperBroker, RecordingSleeper> {
        RetryOrchestrator::new(
            OrderDetailsAccessor::new(broker, broker),
            sleeper,
            BackoffPolicy::default(),
            ClassificationPolicy::default(),
            OperationLog::new("test", 3, false),
        )
    }

    #[test_case(ErrorCategory::Success, 0 => RetryPhase::Succeeded)]
    #[test_case(ErrorCategory::Ambiguous, 0 => RetryPhase::Verifying)]
    #[test_case(ErrorCategory::Fatal, 0 => RetryPhase::Failed)]
    #[test_case(ErrorCategory::RetryableTransient, 1 => RetryPhase::BackoffThenRetry)]
    #[test_case(ErrorCategory::RetryableImmediate, 1 => RetryPhase::ImmediateRetry)]
    #[test_case(ErrorCategory::RetryableCorrectable, 1 => RetryPhase::CorrectingAndRetrying)]
    #[test_case(ErrorCategory::RetryableTransient, 6 => RetryPhase::Failed)]
    #[test_case(ErrorCategory::RetryableImmediate, 6 => RetryPhase::Failed)]
    #[test_case(ErrorCategory::Success, 6 => RetryPhase::Succeeded)]
    fn transition_table(category: ErrorCategory, attempts: u32) -> RetryPhase {
        let state = RetryState {
            attempts,
            ..RetryState::new(6)
        };
        next_phase(category, &state)
    }

    #[tokio::test]
    async fn requote_then_busy_then_success() {
        let broker = PaperBroker::new(&PaperConfig::default());
        let sleeper = RecordingSleeper::default();
        let mut driver = Scripted::new(vec![
            Err(BrokerErrorCode::Requote),
            Err(BrokerErrorCode::ServerBusy),
            Ok(77),
        ]);
        let mut state = RetryState::new(6);

        let outcome = orchestrator(&broker, &sleeper).run(&mut driver, &mut state).await;

        assert!(matches!(outcome, LoopOutcome::Succeeded { output: 77, attempts: 3 }));
        assert_eq!(driver.calls, 3);
        assert_eq!(sleeper.count(), 1);
    }

    #[tokio::test]
    async fn correctable_until_cap() {
        let broker = PaperBroker::new(&PaperConfig::default());
        let sleeper = RecordingSleeper::default();
        let mut driver = Scripted::new(vec![Err(BrokerErrorCode::InvalidStops); 10]);
        let mut state = RetryState::new(6);

        let outcome = orchestrator(&broker, &sleeper).run(&mut driver, &mut state).await;

        let LoopOutcome::Failed(error) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(driver.calls, 6);
        assert_eq!(driver.corrections, 5);
        assert_eq!(sleeper.count(), 5);
        assert!(error.to_string().contains("Retry attempts maxed"));
        assert_eq!(error.last_code(), Some(BrokerErrorCode::InvalidStops));
    }

    #[tokio::test]
    async fn fatal_stops_immediately() {
        let broker = PaperBroker::new(&PaperConfig::default());
        let sleeper = RecordingSleeper::default();
        let mut driver = Scripted::new(vec![Err(BrokerErrorCode::MarketClosed)]);
        let mut state = RetryState::new(6);

        let outcome = orchestrator(&broker, &sleeper).run(&mut driver, &mut state).await;

        assert!(matches!(
            outcome,
            LoopOutcome::Failed(OperationError::Fatal {
                code: BrokerErrorCode::MarketClosed,
                attempts: 1
            })
        ));
        assert_eq!(driver.calls, 1);
        assert_eq!(sleeper.count(), 0);
    }

    #[tokio::test]
    async fn no_result_on_send_is_ambiguous() {
        let broker = PaperBroker::new(&PaperConfig::default());
        let sleeper = RecordingSleeper::default();
        let mut driver = Scripted::new(vec![Err(BrokerErrorCode::NoResult)]);
        let mut state = RetryState::new(6);

        let outcome = orchestrator(&broker, &sleeper).run(&mut driver, &mut state).await;

        assert!(matches!(
            outcome,
            LoopOutcome::Ambiguous {
                code: BrokerErrorCode::NoResult,
                attempts: 1
            }
        ));
    }

    #[tokio::test]
    async fn holds_count_toward_cap() {
        let broker = PaperBroker::new(&PaperConfig::default());
        let sleeper = RecordingSleeper::default();
        let mut driver = Scripted::new(vec![Ok(1)]);
        driver.hold_first = 10;
        let mut state = RetryState::new(4);

        let outcome = orchestrator(&broker, &sleeper).run(&mut driver, &mut state).await;

        let LoopOutcome::Failed(error) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(driver.calls, 0);
        assert_eq!(state.attempts, 4);
        assert_eq!(sleeper.count(), 3);
        assert!(error.to_string().contains("slippage beyond tolerance"));
    }

    #[tokio::test]
    async fn simulated_context_never_sleeps() {
        let broker = PaperBroker::new(&PaperConfig {
            simulated: true,
            ..PaperConfig::default()
        });
        let sleeper = RecordingSleeper::default();
        let mut driver = Scripted::new(vec![Err(BrokerErrorCode::ServerBusy), Ok(5)]);
        let mut state = RetryState::new(6);

        let outcome = orchestrator(&broker, &sleeper).run(&mut driver, &mut state).await;

        assert!(matches!(outcome, LoopOutcome::Succeeded { output: 5, attempts: 2 }));
        assert_eq!(sleeper.count(), 0);
    }

    #[tokio::test]
    async fn resumes_from_carried_state() {
        let broker = PaperBroker::new(&PaperConfig::default());
        let sleeper = RecordingSleeper::default();
        let mut driver = Scripted::new(vec![Err(BrokerErrorCode::ServerBusy); 10]);
        let mut state = RetryState {
            attempts: 4,
            ..RetryState::new(6)
        };

        let outcome = orchestrator(&broker, &sleeper).run(&mut driver, &mut state).await;

        assert!(matches!(outcome, LoopOutcome::Failed(OperationError::RetriesExhausted { attempts: 6, .. })));
        assert_eq!(driver.calls, 2);
    }
}
