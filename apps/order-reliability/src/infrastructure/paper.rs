//! In-memory paper broker.
//!
//! Implements both the order endpoint and market-data ports against a local
//! order book. Without scripted replies it enforces the same constraints a
//! live endpoint does (minimum stop distance, pending price distance, price
//! deviation versus the allowed slippage) and fills market orders at the far
//! side of the spread plus an optional adverse fill slippage.
//!
//! Replies can be scripted per call type to reproduce endpoint behavior:
//! [`PaperReply::Reject`] returns a code without executing, while
//! [`PaperReply::LostAfterExecution`] executes the call and then reports the
//! code, modelling a reply lost after the fact.
//!
//! Used by the binary and as the test fixture.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::application::ports::{MarketDataPort, OrderEndpointPort};
use crate::broker::BrokerErrorCode;
use crate::config::PaperConfig;
use crate::domain::instrument::{InstrumentMetadata, MarketSnapshot};
use crate::domain::order::{
    CloseRequest, Direction, ModifyRequest, OrderDetails, OrderKind, OrderRequest, Ticket,
};
use crate::error::EndpointError;

const FIRST_TICKET: i64 = 1000;

/// Scripted endpoint reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperReply {
    /// Return the code without executing.
    Reject(BrokerErrorCode),
    /// Execute, then return the code.
    LostAfterExecution(BrokerErrorCode),
}

/// Endpoint call type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaperCall {
    /// `submit_order`.
    Submit,
    /// `amend_order`.
    Amend,
    /// `close_order`.
    Close,
    /// `cancel_pending_order`.
    Cancel,
}

/// Number of calls received per primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaperCalls {
    /// Order submissions.
    pub submit: u32,
    /// Amendments.
    pub amend: u32,
    /// Closes.
    pub close: u32,
    /// Cancels.
    pub cancel: u32,
    /// Order lookups.
    pub lookup: u32,
    /// Market snapshots.
    pub snapshot: u32,
}

#[derive(Debug, Default)]
struct PaperState {
    quotes: HashMap<String, MarketSnapshot>,
    quote_script: HashMap<String, VecDeque<(Decimal, Decimal)>>,
    replies: HashMap<PaperCall, VecDeque<PaperReply>>,
    orders: BTreeMap<Ticket, OrderDetails>,
    next_ticket: i64,
    fill_slippage: Decimal,
    ignore_close: bool,
    calls: PaperCalls,
    submissions: Vec<OrderRequest>,
    amendments: Vec<ModifyRequest>,
    closes: Vec<CloseRequest>,
}

/// In-memory broker implementing every driven port.
#[derive(Debug)]
pub struct PaperBroker {
    state: Mutex<PaperState>,
    simulated: AtomicBool,
}

impl PaperBroker {
    /// Create a broker quoting the configured instrument.
    #[must_use]
    pub fn new(config: &PaperConfig) -> Self {
        let mut quotes = HashMap::new();
        quotes.insert(
            config.instrument.clone(),
            MarketSnapshot {
                bid: config.bid,
                ask: config.ask,
                point: config.point,
                stop_level: config.stop_level,
                digits: config.digits,
            },
        );

        Self {
            state: Mutex::new(PaperState {
                quotes,
                next_ticket: FIRST_TICKET,
                fill_slippage: config.fill_slippage,
                ..PaperState::default()
            }),
            simulated: AtomicBool::new(config.simulated),
        }
    }

    fn state(&self) -> MutexGuard<'_, PaperState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Quote an additional instrument.
    pub fn add_instrument(&self, instrument: impl Into<String>, snapshot: MarketSnapshot) {
        self.state().quotes.insert(instrument.into(), snapshot);
    }

    /// Move the market for `instrument`.
    pub fn set_quote(&self, instrument: &str, bid: Decimal, ask: Decimal) {
        if let Some(quote) = self.state().quotes.get_mut(instrument) {
            quote.bid = bid;
            quote.ask = ask;
        }
    }

    /// Queue quotes applied one per snapshot read, in order.
    pub fn push_quote(&self, instrument: &str, bid: Decimal, ask: Decimal) {
        self.state()
            .quote_script
            .entry(instrument.to_string())
            .or_default()
            .push_back((bid, ask));
    }

    /// Queue a scripted reply for `call`.
    pub fn script(&self, call: PaperCall, reply: PaperReply) {
        self.state().replies.entry(call).or_default().push_back(reply);
    }

    /// Queue rejections with each of `codes` for `call`.
    pub fn script_rejects(&self, call: PaperCall, codes: &[BrokerErrorCode]) {
        let mut state = self.state();
        let queue = state.replies.entry(call).or_default();
        queue.extend(codes.iter().copied().map(PaperReply::Reject));
    }

    /// Acknowledge closes without closing anything.
    pub fn ignore_closes(&self, ignore: bool) {
        self.state().ignore_close = ignore;
    }

    /// Adverse slippage applied to market fills, in price units.
    pub fn set_fill_slippage(&self, slippage: Decimal) {
        self.state().fill_slippage = slippage;
    }

    /// Report a simulated context.
    pub fn set_simulated(&self, simulated: bool) {
        self.simulated.store(simulated, Ordering::SeqCst);
    }

    /// Insert an order directly, bypassing validation.
    pub fn insert_order(&self, details: OrderDetails) {
        self.state().orders.insert(details.ticket, details);
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> PaperCalls {
        self.state().calls
    }

    /// Every submitted request, in order.
    #[must_use]
    pub fn submissions(&self) -> Vec<OrderRequest> {
        self.state().submissions.clone()
    }

    /// Every amendment request, in order.
    #[must_use]
    pub fn amendments(&self) -> Vec<ModifyRequest> {
        self.state().amendments.clone()
    }

    /// Every close request, in order.
    #[must_use]
    pub fn closes(&self) -> Vec<CloseRequest> {
        self.state().closes.clone()
    }

    /// Current state of an order, without counting a lookup.
    #[must_use]
    pub fn order(&self, ticket: Ticket) -> Option<OrderDetails> {
        self.state().orders.get(&ticket).cloned()
    }
}

impl PaperState {
    fn next_reply(&mut self, call: PaperCall) -> Option<PaperReply> {
        self.replies.get_mut(&call).and_then(VecDeque::pop_front)
    }

    fn metadata(&self, instrument: &str) -> Result<InstrumentMetadata, BrokerErrorCode> {
        self.quotes
            .get(instrument)
            .map(InstrumentMetadata::from_snapshot)
            .ok_or(BrokerErrorCode::UnknownSymbol)
    }

    fn allocate_ticket(&mut self) -> Ticket {
        let ticket = Ticket::new(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    fn submit(&mut self, request: &OrderRequest) -> Result<Ticket, BrokerErrorCode> {
        let meta = self.metadata(&request.instrument)?;
        let direction = request.kind.direction();

        let open_price = if request.kind.is_market() {
            let current = meta.entry_price(direction);
            let deviation = meta.to_points((request.price - current).abs());
            if deviation > Decimal::from(request.slippage) {
                return Err(BrokerErrorCode::Requote);
            }
            check_position_stops(&meta, direction, request.stop_loss, request.take_profit)?;
            meta.round(current + self.fill_slippage * direction.sign())
        } else {
            check_pending_price(&meta, request.kind, request.price)?;
            check_stops_around(&meta, direction, request.price, request.stop_loss, request.take_profit)?;
            request.price
        };

        let ticket = self.allocate_ticket();
        self.orders.insert(
            ticket,
            OrderDetails {
                ticket,
                instrument: request.instrument.clone(),
                kind: request.kind,
                volume: request.volume,
                open_price,
                stop_loss: request.stop_loss,
                take_profit: request.take_profit,
                close_time: None,
            },
        );
        Ok(ticket)
    }

    fn amend(&mut self, request: &ModifyRequest) -> Result<(), BrokerErrorCode> {
        let order = self
            .orders
            .get(&request.ticket)
            .filter(|o| o.is_open())
            .cloned()
            .ok_or(BrokerErrorCode::InvalidTicket)?;
        let meta = self.metadata(&order.instrument)?;
        let direction = order.kind.direction();

        let price = if order.kind.is_pending() {
            request.price
        } else {
            order.open_price
        };
        if price == order.open_price && request.stop_loss == order.stop_loss && request.take_profit == order.take_profit
        {
            return Err(BrokerErrorCode::NoResult);
        }

        if order.kind.is_pending() {
            check_pending_price(&meta, order.kind, price)?;
            check_stops_around(&meta, direction, price, request.stop_loss, request.take_profit)?;
        } else {
            check_position_stops(&meta, direction, request.stop_loss, request.take_profit)?;
        }

        if let Some(stored) = self.orders.get_mut(&request.ticket) {
            stored.open_price = price;
            stored.stop_loss = request.stop_loss;
            stored.take_profit = request.take_profit;
        }
        Ok(())
    }

    fn close(&mut self, request: &CloseRequest) -> Result<(), BrokerErrorCode> {
        let order = self
            .orders
            .get(&request.ticket)
            .filter(|o| o.is_open() && o.kind.is_market())
            .cloned()
            .ok_or(BrokerErrorCode::InvalidTicket)?;
        let meta = self.metadata(&order.instrument)?;

        let current = meta.exit_price(order.kind.direction());
        let deviation = meta.to_points((request.price - current).abs());
        if deviation > Decimal::from(request.slippage) {
            return Err(BrokerErrorCode::Requote);
        }
        if request.volume > order.volume {
            return Err(BrokerErrorCode::InvalidTradeVolume);
        }
        if self.ignore_close {
            return Ok(());
        }

        let remainder = if request.volume.is_zero() {
            Decimal::ZERO
        } else {
            order.volume - request.volume
        };
        if let Some(stored) = self.orders.get_mut(&request.ticket) {
            stored.close_time = Some(Utc::now());
        }
        if remainder > Decimal::ZERO {
            let ticket = self.allocate_ticket();
            self.orders.insert(
                ticket,
                OrderDetails {
                    ticket,
                    volume: remainder,
                    close_time: None,
                    ..order
                },
            );
        }
        Ok(())
    }

    fn cancel(&mut self, ticket: Ticket) -> Result<(), BrokerErrorCode> {
        let stored = self
            .orders
            .get_mut(&ticket)
            .filter(|o| o.is_open() && o.kind.is_pending())
            .ok_or(BrokerErrorCode::InvalidTicket)?;
        stored.close_time = Some(Utc::now());
        Ok(())
    }
}

fn check_pending_price(meta: &InstrumentMetadata, kind: OrderKind, price: Decimal) -> Result<(), BrokerErrorCode> {
    if price <= Decimal::ZERO {
        return Err(BrokerErrorCode::InvalidPrice);
    }
    let min_dist = meta.min_distance();
    let admissible = match kind {
        OrderKind::BuyLimit => price <= meta.ask - min_dist,
        OrderKind::BuyStop => price >= meta.ask + min_dist,
        OrderKind::SellLimit => price >= meta.bid + min_dist,
        OrderKind::SellStop => price <= meta.bid - min_dist,
        OrderKind::Buy | OrderKind::Sell => true,
    };
    if admissible {
        Ok(())
    } else {
        Err(BrokerErrorCode::InvalidPrice)
    }
}

/// Stops of an open position are measured from the price it would close at.
fn check_position_stops(
    meta: &InstrumentMetadata,
    direction: Direction,
    stop_loss: Decimal,
    take_profit: Decimal,
) -> Result<(), BrokerErrorCode> {
    check_stops_around(meta, direction, meta.exit_price(direction), stop_loss, take_profit)
}

fn check_stops_around(
    meta: &InstrumentMetadata,
    direction: Direction,
    price: Decimal,
    stop_loss: Decimal,
    take_profit: Decimal,
) -> Result<(), BrokerErrorCode> {
    if stop_loss < Decimal::ZERO || take_profit < Decimal::ZERO {
        return Err(BrokerErrorCode::InvalidStops);
    }
    let min_dist = meta.min_distance();
    let (sl_ok, tp_ok) = match direction {
        Direction::Long => (stop_loss <= price - min_dist, take_profit >= price + min_dist),
        Direction::Short => (stop_loss >= price + min_dist, take_profit <= price - min_dist),
    };
    if (stop_loss.is_zero() || sl_ok) && (take_profit.is_zero() || tp_ok) {
        Ok(())
    } else {
        Err(BrokerErrorCode::InvalidStops)
    }
}

/// Run `execute` unless a scripted reply overrides it.
fn respond<T>(
    reply: Option<PaperReply>,
    execute: impl FnOnce() -> Result<T, BrokerErrorCode>,
) -> Result<T, BrokerErrorCode> {
    match reply {
        None => execute(),
        Some(PaperReply::Reject(code)) => Err(code),
        Some(PaperReply::LostAfterExecution(code)) => {
            execute()?;
            Err(code)
        }
    }
}

#[async_trait]
impl OrderEndpointPort for PaperBroker {
    async fn submit_order(&self, request: &OrderRequest) -> Result<Ticket, BrokerErrorCode> {
        let mut state = self.state();
        state.calls.submit += 1;
        state.submissions.push(request.clone());
        let reply = state.next_reply(PaperCall::Submit);
        respond(reply, || state.submit(request))
    }

    async fn amend_order(&self, request: &ModifyRequest) -> Result<(), BrokerErrorCode> {
        let mut state = self.state();
        state.calls.amend += 1;
        state.amendments.push(request.clone());
        let reply = state.next_reply(PaperCall::Amend);
        respond(reply, || state.amend(request))
    }

    async fn close_order(&self, request: &CloseRequest) -> Result<(), BrokerErrorCode> {
        let mut state = self.state();
        state.calls.close += 1;
        state.closes.push(request.clone());
        let reply = state.next_reply(PaperCall::Close);
        respond(reply, || state.close(request))
    }

    async fn cancel_pending_order(&self, ticket: Ticket) -> Result<(), BrokerErrorCode> {
        let mut state = self.state();
        state.calls.cancel += 1;
        let reply = state.next_reply(PaperCall::Cancel);
        respond(reply, || state.cancel(ticket))
    }

    async fn lookup_order(&self, ticket: Ticket) -> Result<OrderDetails, EndpointError> {
        let mut state = self.state();
        state.calls.lookup += 1;
        state
            .orders
            .get(&ticket)
            .cloned()
            .ok_or(EndpointError::OrderNotFound { ticket })
    }
}

#[async_trait]
impl MarketDataPort for PaperBroker {
    async fn market_snapshot(&self, instrument: &str) -> Result<MarketSnapshot, EndpointError> {
        let mut state = self.state();
        state.calls.snapshot += 1;

        let next = state.quote_script.get_mut(instrument).and_then(VecDeque::pop_front);
        let quote = state
            .quotes
            .get_mut(instrument)
            .ok_or_else(|| EndpointError::MarketDataUnavailable {
                instrument: instrument.to_string(),
            })?;
        if let Some((bid, ask)) = next {
            quote.bid = bid;
            quote.ask = ask;
        }
        Ok(quote.clone())
    }

    fn is_simulated(&self) -> bool {
        self.simulated.load(Ordering::SeqCst)
    }
}
