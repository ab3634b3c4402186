//! Stand-ins for on-chain fee accounting, the trade event feed and swap
//! execution. Numbers are random and nothing is persisted.

use chrono::Utc;
use rand::Rng;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::catalog::demo_tokens;
use crate::config::SimulatorConfig;
use crate::error::SwapError;
use crate::ids::random_base36;
use crate::model::{FeeData, SwapReceipt, SwapRequest, TradeEvent};

pub fn fetch_fee_data(partner_key: &str) -> FeeData {
    let mut rng = rand::thread_rng();
    let fees = FeeData {
        unclaimed: rng.gen_range(0.0..2.5),
        lifetime: 100.0 + rng.gen_range(0.0..500.0),
    };
    tracing::debug!(partner_key, unclaimed = fees.unclaimed, "simulated fee data");
    fees
}

/// Clamp to `[0, 1]`; NaN and infinities count as "never".
fn hit_probability(p: f64) -> f64 {
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// One timer tick: with probability `p` produce an event.
pub fn roll_trade_event<R: Rng + ?Sized>(rng: &mut R, p: f64) -> Option<TradeEvent> {
    if !rng.gen_bool(hit_probability(p)) {
        return None;
    }

    let tokens = demo_tokens();
    let symbol = tokens[rng.gen_range(0..tokens.len())].symbol.clone();
    Some(TradeEvent {
        id: random_base36(rng, 6),
        token_symbol: symbol,
        amount_usd: rng.gen_range(5..205),
        timestamp: Utc::now().timestamp_millis(),
        user_address: format!("Anon...{}", random_base36(rng, 4).to_uppercase()),
    })
}

/// Handle to a running trade event feed. Dropping it stops the feed.
#[derive(Debug)]
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[derive(Debug, Clone)]
pub struct TradeFeed {
    interval: Duration,
    probability: f64,
}

impl TradeFeed {
    pub fn new(interval: Duration, probability: f64) -> Self {
        Self {
            interval,
            probability: hit_probability(probability),
        }
    }

    pub fn from_config(config: &SimulatorConfig) -> Self {
        Self::new(config.poll_interval, config.event_probability)
    }

    /// Deliver synthetic events to `on_event` every `interval` tick that
    /// rolls a hit. Must be called inside a tokio runtime.
    pub fn subscribe<F>(&self, partner_key: &str, mut on_event: F) -> Subscription
    where
        F: FnMut(TradeEvent) + Send + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();
        let period = self.interval.max(Duration::from_millis(1));
        let p = self.probability;
        let partner_key = partner_key.to_string();

        tokio::spawn(async move {
            // first tick fires one full period after subscribing
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        let event = roll_trade_event(&mut rand::thread_rng(), p);
                        if let Some(event) = event {
                            tracing::debug!(partner_key = %partner_key, symbol = %event.token_symbol, "trade event");
                            on_event(event);
                        }
                    }
                }
            }
            tracing::debug!(partner_key = %partner_key, "trade feed stopped");
        });

        Subscription { token }
    }

    /// Channel flavour of [`subscribe`](Self::subscribe). The feed stops when
    /// the subscription is dropped or the receiver goes away.
    pub fn subscribe_channel(&self, partner_key: &str) -> (Subscription, mpsc::Receiver<TradeEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let watch = tx.clone();
        let key = partner_key.to_string();
        let subscription = self.subscribe(partner_key, move |event| {
            if let Err(mpsc::error::TrySendError::Full(event)) = tx.try_send(event) {
                tracing::debug!(partner_key = %key, id = %event.id, "subscriber lagging, event dropped");
            }
        });

        // receiver gone: stop the ticker rather than roll into a closed channel
        let stop = subscription.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = watch.closed() => stop.cancel(),
                _ = stop.cancelled() => {}
            }
        });

        (subscription, rx)
    }
}

#[derive(Debug, Clone)]
pub struct SwapSimulator {
    latency: Duration,
}

impl SwapSimulator {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub async fn execute(&self, request: SwapRequest) -> Result<SwapReceipt, SwapError> {
        validate_swap(&request)?;
        tokio::time::sleep(self.latency).await;

        tracing::info!(
            from = %request.from,
            to = %request.to,
            amount = request.amount,
            partner_key = %request.partner_key,
            "swap executed, fee attributed"
        );

        Ok(SwapReceipt {
            id: random_base36(&mut rand::thread_rng(), 12),
            from: request.from,
            to: request.to,
            amount: request.amount,
            partner_key: request.partner_key,
            executed_at: Utc::now(),
        })
    }
}

fn validate_swap(request: &SwapRequest) -> Result<(), SwapError> {
    if request.from.trim().is_empty() || request.to.trim().is_empty() {
        return Err(SwapError::InvalidInput("token symbol is required"));
    }
    if request.from.eq_ignore_ascii_case(&request.to) {
        return Err(SwapError::InvalidInput("cannot swap a token for itself"));
    }
    if !request.amount.is_finite() || request.amount <= 0.0 {
        return Err(SwapError::InvalidInput("amount must be positive"));
    }
    if request.partner_key.trim().is_empty() {
        return Err(SwapError::InvalidInput("partner key is required"));
    }
    Ok(())
}
