use crate::api::{NorenClient, OrderParams};
use crate::models::{Instrument, OrderIntent, OrderSide, PriceType};

/// Places orders over the broker session, fire-and-forget
///
/// A failed submission is logged and swallowed: no retry, no error to the
/// caller, and no confirmation that an order was accepted or filled. In
/// dry-run mode the would-be orders are logged without touching the broker.
pub struct OrderDispatcher {
    client: NorenClient,
    dry_run: bool,
}

impl OrderDispatcher {
    pub fn new(client: NorenClient, dry_run: bool) -> Self {
        Self { client, dry_run }
    }

    /// Submit the strategy's intents in order
    pub async fn dispatch(&self, instrument: &Instrument, intents: &[OrderIntent]) {
        for intent in intents {
            match intent {
                OrderIntent::MarketSell { quantity } => {
                    self.market_sell(instrument, *quantity).await;
                }
                OrderIntent::StopLossBuy {
                    quantity,
                    trigger_price,
                } => {
                    self.stoploss_buy(instrument, *quantity, *trigger_price).await;
                }
            }
        }
    }

    /// Market buy at the current price
    pub async fn market_buy(&self, instrument: &Instrument, quantity: u32) {
        self.submit(
            instrument,
            OrderSide::Buy,
            quantity,
            PriceType::Market,
            None,
            "supertrend buy",
        )
        .await;
    }

    /// Market sell at the current price
    pub async fn market_sell(&self, instrument: &Instrument, quantity: u32) {
        self.submit(
            instrument,
            OrderSide::Sell,
            quantity,
            PriceType::Market,
            None,
            "supertrend sell",
        )
        .await;
    }

    /// Protective stop-loss buy, triggered at `trigger_price`
    pub async fn stoploss_buy(&self, instrument: &Instrument, quantity: u32, trigger_price: f64) {
        self.submit(
            instrument,
            OrderSide::Buy,
            quantity,
            PriceType::StopLossMarket,
            Some(trigger_price),
            "stoploss buy",
        )
        .await;
    }

    async fn submit(
        &self,
        instrument: &Instrument,
        side: OrderSide,
        quantity: u32,
        price_type: PriceType,
        trigger_price: Option<f64>,
        remarks: &str,
    ) {
        if self.dry_run {
            tracing::info!(
                "  → Would place {} {} x{} {} (trigger: {:?})",
                side.code(),
                instrument.symbol,
                quantity,
                price_type.code(),
                trigger_price
            );
            return;
        }

        let order = OrderParams {
            side,
            exchange: instrument.exchange.clone(),
            symbol: instrument.symbol.clone(),
            quantity,
            price_type,
            trigger_price,
            remarks: remarks.to_string(),
        };

        match self.client.place_order(&order).await {
            Ok(order_no) => {
                tracing::info!(
                    "  ✓ {} {} x{} {} accepted, order {}",
                    side.code(),
                    instrument.symbol,
                    quantity,
                    price_type.code(),
                    order_no
                );
            }
            Err(e) => {
                tracing::error!(
                    "  ✗ {} {} x{} {} failed: {}",
                    side.code(),
                    instrument.symbol,
                    quantity,
                    price_type.code(),
                    e
                );
            }
        }
    }
}
