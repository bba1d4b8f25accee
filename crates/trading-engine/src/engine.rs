//! Order execution against live quotes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use trading_core::error::{DataError, EngineError, LimitKind};
use trading_core::events::{EventSink, NullSink, TradeEvent};
use trading_core::traits::Broker;
use trading_core::types::{
    Account, Order, OrderRequest, OrderStatus, OrderType, Position, Side, Trade, TradeStats,
    TradingLimits,
};
use trading_data::DataSourceManager;
use uuid::Uuid;

use crate::stats::trade_stats;

/// Engine construction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Account identifier
    pub account_id: String,
    /// Whether orders are accepted right away
    pub enabled: bool,
    /// Starting cash
    pub initial_cash: Decimal,
    /// Cash multiplier for buying power
    pub buying_power_multiplier: Decimal,
    /// Trading limits
    pub limits: TradingLimits,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            account_id: "paper".to_string(),
            enabled: true,
            initial_cash: dec!(100000),
            buying_power_multiplier: dec!(2),
            limits: TradingLimits::default(),
        }
    }
}

struct EngineState {
    enabled: bool,
    limits: TradingLimits,
    orders: HashMap<Uuid, Order>,
    /// Order ids in submission order
    order_log: Vec<Uuid>,
    positions: BTreeMap<String, Position>,
    account: Account,
    trades: Vec<Trade>,
    fill_day: NaiveDate,
    fills_today: u32,
}

impl EngineState {
    fn store(&mut self, order: Order) {
        let id = order.id;
        if self.orders.insert(id, order).is_none() {
            self.order_log.push(id);
        }
    }

    /// Fills recorded on `day`, resetting the counter when the day rolls over.
    fn fills_on(&mut self, day: NaiveDate) -> u32 {
        if self.fill_day != day {
            self.fill_day = day;
            self.fills_today = 0;
        }
        self.fills_today
    }
}

/// In-process trading engine.
///
/// All order, position and account state sits behind one lock. A market
/// order holds that lock while its quote is fetched, so fills are applied
/// strictly one at a time.
pub struct TradingEngine {
    name: String,
    data: Arc<DataSourceManager>,
    events: Arc<dyn EventSink>,
    state: Mutex<EngineState>,
}

impl TradingEngine {
    /// Create an engine quoting through `data`.
    pub fn new(data: Arc<DataSourceManager>, settings: EngineSettings) -> Self {
        let account = Account::new(
            settings.account_id.clone(),
            settings.initial_cash,
            settings.buying_power_multiplier,
        );
        Self {
            name: settings.account_id,
            data,
            events: Arc::new(NullSink),
            state: Mutex::new(EngineState {
                enabled: settings.enabled,
                limits: settings.limits,
                orders: HashMap::new(),
                order_log: Vec::new(),
                positions: BTreeMap::new(),
                account,
                trades: Vec::new(),
                fill_day: Utc::now().date_naive(),
                fills_today: 0,
            }),
        }
    }

    /// Send fill and close events to `events`.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    async fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().await
    }

    pub async fn is_enabled(&self) -> bool {
        self.lock().await.enabled
    }

    pub async fn enable(&self) {
        self.lock().await.enabled = true;
        info!(engine = %self.name, "Trading enabled");
    }

    pub async fn disable(&self) {
        self.lock().await.enabled = false;
        info!(engine = %self.name, "Trading disabled");
    }

    pub async fn limits(&self) -> TradingLimits {
        self.lock().await.limits.clone()
    }

    /// Replace the limits. Existing positions keep their protection levels.
    pub async fn set_limits(&self, limits: TradingLimits) {
        self.lock().await.limits = limits;
    }

    /// Orders created within `[from, to]`, oldest first.
    pub async fn get_order_history(
        &self,
        symbol: Option<&str>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Order> {
        let state = self.lock().await;
        state
            .order_log
            .iter()
            .filter_map(|id| state.orders.get(id))
            .filter(|o| symbol.map_or(true, |s| o.symbol == s))
            .filter(|o| o.created_at >= from && o.created_at <= to)
            .cloned()
            .collect()
    }

    /// Trades opened at or after `from` and closed at or before `to`.
    pub async fn get_trades(
        &self,
        symbol: Option<&str>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Trade> {
        self.lock()
            .await
            .trades
            .iter()
            .filter(|t| symbol.map_or(true, |s| t.symbol == s))
            .filter(|t| t.opened_at >= from && t.closed_at <= to)
            .cloned()
            .collect()
    }

    /// Statistics over the trades in `[from, to]`.
    pub async fn get_trade_stats(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> TradeStats {
        let state = self.lock().await;
        trade_stats(
            state
                .trades
                .iter()
                .filter(|t| t.opened_at >= from && t.closed_at <= to),
        )
    }

    /// Mark open positions to the given prices.
    pub async fn update_prices(&self, prices: &HashMap<String, Decimal>) {
        let mut state = self.lock().await;
        for (symbol, position) in state.positions.iter_mut() {
            if let Some(&price) = prices.get(symbol) {
                position.update_price(price);
            }
        }
        let EngineState {
            account, positions, ..
        } = &mut *state;
        account.recalculate(positions.values());
    }

    fn validate(state: &mut EngineState, request: &OrderRequest) -> Result<(), EngineError> {
        if !state.enabled {
            return Err(EngineError::TradingDisabled);
        }
        if request.symbol.trim().is_empty() {
            return Err(EngineError::InvalidSymbol(request.symbol.clone()));
        }
        if request.quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidQuantity(request.quantity));
        }
        if request.order_type != OrderType::Market {
            match request.price {
                Some(price) if price >= Decimal::ZERO => {}
                Some(price) => return Err(EngineError::InvalidPrice(price.to_string())),
                None => {
                    return Err(EngineError::InvalidPrice(format!(
                        "{} order requires a price",
                        request.order_type
                    )))
                }
            }
        }

        let limits = &state.limits;
        if request.side == Side::Buy && state.positions.len() >= limits.max_positions {
            return Err(EngineError::LimitExceeded {
                limit: LimitKind::MaxPositions,
                detail: format!(
                    "{} open positions, maximum {}",
                    state.positions.len(),
                    limits.max_positions
                ),
            });
        }
        let max_daily_trades = limits.max_daily_trades;
        if max_daily_trades > 0 {
            let fills = state.fills_on(Utc::now().date_naive());
            if fills >= max_daily_trades {
                return Err(EngineError::LimitExceeded {
                    limit: LimitKind::MaxDailyTrades,
                    detail: format!("{} fills today, maximum {}", fills, max_daily_trades),
                });
            }
        }

        if request.side == Side::Sell {
            let position = state
                .positions
                .get(&request.symbol)
                .ok_or_else(|| EngineError::NoPositionToSell(request.symbol.clone()))?;
            if request.quantity > position.quantity {
                return Err(EngineError::InvalidQuantity(request.quantity));
            }
        }

        Ok(())
    }

    /// Best trade price from the primary source.
    async fn quote_price(&self, symbol: &str) -> Result<Decimal, DataError> {
        let source = self.data.primary().await?;
        let quote = source.get_real_time_quote(symbol).await?;
        quote
            .trade_price_decimal()
            .ok_or_else(|| DataError::NoDataAvailable(symbol.to_string()))
    }

    /// Reject a buy whose resulting position cost would exceed the
    /// configured share of equity.
    fn position_size_breach(state: &EngineState, order: &Order, price: Decimal) -> Option<String> {
        let percent = state.limits.max_position_size_percent;
        if order.side != Side::Buy || percent <= Decimal::ZERO {
            return None;
        }
        let held = state
            .positions
            .get(&order.symbol)
            .map_or(Decimal::ZERO, |p| p.cost_basis);
        let cost = held + order.quantity * price;
        let cap = state.account.equity * percent / dec!(100);
        (cost > cap).then(|| {
            format!(
                "{} exceeded: {} position cost {} is over {}% of equity ({})",
                LimitKind::MaxPositionSize,
                order.symbol,
                cost.round_dp(2),
                percent,
                cap.round_dp(2)
            )
        })
    }

    /// Fill `order` at `price` and apply it to positions and the account.
    fn apply_fill(&self, state: &mut EngineState, order: &mut Order, price: Decimal) {
        if let Some(reason) = Self::position_size_breach(state, order, price) {
            warn!(order_id = %order.id, symbol = %order.symbol, %reason, "Order rejected");
            order.reject(reason);
            state.store(order.clone());
            return;
        }

        order.fill(price);
        let today = Utc::now().date_naive();
        state.fills_on(today);
        state.fills_today += 1;

        let quantity = order.quantity;
        let notional = quantity * price;
        let mut closed = None;

        match order.side {
            Side::Buy => {
                state.account.cash -= notional;
                let limits = &state.limits;
                let position = state
                    .positions
                    .entry(order.symbol.clone())
                    .and_modify(|p| p.increase(quantity, price))
                    .or_insert_with(|| Position::open(order.symbol.clone(), quantity, price, order.id));
                position.set_protection(limits.stop_loss_percent, limits.take_profit_percent);
            }
            Side::Sell => {
                state.account.cash += notional;
                if let Some(position) = state.positions.get_mut(&order.symbol) {
                    let realized = position.reduce(quantity, price);
                    state.account.realized_pnl += realized;
                    if position.is_closed() {
                        closed = state.positions.remove(&order.symbol);
                    }
                }
            }
        }

        state.store(order.clone());

        let trade = closed.map(|position| {
            let closed_at = order.filled_at.unwrap_or_else(Utc::now);
            let entry_order = state
                .orders
                .get(&position.entry_order_id)
                .cloned()
                .unwrap_or_else(|| order.clone());
            let sold_cost = position.closed_quantity * position.entry_price;
            let pnl_percent = if sold_cost.is_zero() {
                Decimal::ZERO
            } else {
                position.realized_pnl / sold_cost * dec!(100)
            };
            if position.opened_at.date_naive() == closed_at.date_naive() {
                state.account.day_trade_count += 1;
            }
            Trade {
                id: Uuid::new_v4(),
                symbol: position.symbol.clone(),
                entry_order,
                exit_order: Some(order.clone()),
                entry_price: position.entry_price,
                exit_price: price,
                quantity: position.closed_quantity,
                realized_pnl: position.realized_pnl,
                pnl_percent,
                opened_at: position.opened_at,
                closed_at,
                hold_time_hours: (closed_at - position.opened_at).num_milliseconds() as f64
                    / 3_600_000.0,
            }
        });

        let EngineState {
            account, positions, ..
        } = &mut *state;
        account.recalculate(positions.values());

        info!(
            order_id = %order.id,
            symbol = %order.symbol,
            side = %order.side,
            quantity = %quantity,
            price = %price,
            "Order filled"
        );
        self.events.emit(TradeEvent::OrderFilled {
            order: order.clone(),
        });

        if let Some(trade) = trade {
            info!(
                symbol = %trade.symbol,
                realized_pnl = %trade.realized_pnl,
                hold_hours = trade.hold_time_hours,
                "Position closed"
            );
            state.trades.push(trade.clone());
            self.events.emit(TradeEvent::PositionClosed { trade });
        }
    }
}

#[async_trait]
impl Broker for TradingEngine {
    async fn submit_order(&self, request: OrderRequest) -> Result<Order, EngineError> {
        let mut state = self.lock().await;
        Self::validate(&mut state, &request)?;

        let mut order = Order::from_request(&request);
        order.transition(OrderStatus::Accepted);
        state.store(order.clone());
        debug!(order_id = %order.id, symbol = %order.symbol, order_type = %order.order_type, "Order accepted");

        if order.order_type == OrderType::Market {
            match self.quote_price(&order.symbol).await {
                Ok(price) => self.apply_fill(&mut state, &mut order, price),
                Err(err) => {
                    warn!(
                        order_id = %order.id,
                        symbol = %order.symbol,
                        error = %err,
                        "No quote for market order, leaving it accepted"
                    );
                }
            }
        }

        Ok(order)
    }

    async fn cancel_order(&self, order_id: Uuid) -> Result<Order, EngineError> {
        let mut state = self.lock().await;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(EngineError::OrderNotFound(order_id))?;
        if order.status.is_terminal() {
            return Err(EngineError::OrderNotCancelable {
                id: order_id,
                status: order.status,
            });
        }
        order.transition(OrderStatus::Canceled);
        info!(order_id = %order_id, symbol = %order.symbol, "Order canceled");
        Ok(order.clone())
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Order, EngineError> {
        self.lock()
            .await
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(EngineError::OrderNotFound(order_id))
    }

    async fn get_open_orders(&self) -> Result<Vec<Order>, EngineError> {
        let state = self.lock().await;
        Ok(state
            .order_log
            .iter()
            .filter_map(|id| state.orders.get(id))
            .filter(|o| o.status.is_active())
            .cloned()
            .collect())
    }

    async fn get_positions(&self) -> Result<Vec<Position>, EngineError> {
        Ok(self.lock().await.positions.values().cloned().collect())
    }

    async fn get_position(&self, symbol: &str) -> Result<Position, EngineError> {
        self.lock()
            .await
            .positions
            .get(symbol)
            .cloned()
            .ok_or_else(|| EngineError::PositionNotFound(symbol.to_string()))
    }

    async fn close_position(
        &self,
        symbol: &str,
        quantity: Option<Decimal>,
    ) -> Result<Order, EngineError> {
        let held = {
            let state = self.lock().await;
            state
                .positions
                .get(symbol)
                .map(|p| p.quantity)
                .ok_or_else(|| EngineError::PositionNotFound(symbol.to_string()))?
        }; // guard dropped before resubmitting

        let quantity = match quantity {
            Some(q) if q > Decimal::ZERO && q <= held => q,
            _ => held,
        };
        self.submit_order(OrderRequest::market(symbol, Side::Sell, quantity))
            .await
    }

    async fn get_account(&self) -> Result<Account, EngineError> {
        Ok(self.lock().await.account.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
