use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use signal_core::{Quote, QuoteProvider, SignalError};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// NSE listing suffix appended to bare tickers.
pub const DEFAULT_SYMBOL_SUFFIX: &str = ".NS";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait for the oldest request to leave the window
            let sleep_dur = match ts.front() {
                Some(&oldest) => (oldest + self.window).duration_since(now) + Duration::from_millis(50),
                None => Duration::from_millis(50),
            };
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for quote API slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    result: Vec<YahooQuote>,
}

/// One entry of the `/v7/finance/quote` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuote {
    pub symbol: String,
    pub regular_market_price: Option<f64>,
    pub regular_market_previous_close: Option<f64>,
    pub regular_market_change: Option<f64>,
    pub regular_market_day_high: Option<f64>,
    pub regular_market_day_low: Option<f64>,
    pub regular_market_volume: Option<f64>,
    pub average_daily_volume3_month: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
}

impl YahooQuote {
    /// Convert to the engine's quote shape under `ticker`.
    ///
    /// Returns `None` when the entry has no price or no way to recover the
    /// previous close.
    pub fn into_quote(self, ticker: &str) -> Option<Quote> {
        let price = self.regular_market_price?;
        let previous_close = self
            .regular_market_previous_close
            .or_else(|| self.regular_market_change.map(|change| price - change))?;

        Some(Quote {
            symbol: ticker.to_string(),
            price,
            previous_close,
            day_high: self.regular_market_day_high.unwrap_or(price),
            day_low: self.regular_market_day_low.unwrap_or(price),
            volume: self.regular_market_volume.map(to_shares).unwrap_or(0),
            average_volume: self.average_daily_volume3_month.map(to_shares),
            fifty_two_week_high: self.fifty_two_week_high,
            fifty_two_week_low: self.fifty_two_week_low,
        })
    }
}

fn to_shares(volume: f64) -> u64 {
    if volume.is_finite() {
        volume.max(0.0) as u64
    } else {
        0
    }
}

/// HTTP client for Yahoo Finance quotes.
#[derive(Clone)]
pub struct YahooQuoteClient {
    client: Client,
    base_url: String,
    suffix: String,
    overrides: HashMap<String, String>,
    rate_limiter: RateLimiter,
}

impl YahooQuoteClient {
    pub fn new() -> Self {
        // Requests per minute; the endpoint is unauthenticated so stay polite.
        let rate_limit: usize = std::env::var("YAHOO_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            suffix: DEFAULT_SYMBOL_SUFFIX.to_string(),
            overrides: HashMap::new(),
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Map `ticker` to an explicit exchange symbol instead of `<ticker><suffix>`.
    pub fn with_override(mut self, ticker: impl Into<String>, exchange_symbol: impl Into<String>) -> Self {
        self.overrides.insert(ticker.into(), exchange_symbol.into());
        self
    }

    /// Exchange symbol the API expects for a ticker
    pub fn exchange_symbol(&self, ticker: &str) -> String {
        if let Some(symbol) = self.overrides.get(ticker) {
            return symbol.clone();
        }
        if ticker.contains('.') || self.suffix.is_empty() {
            ticker.to_string()
        } else {
            format!("{}{}", ticker, self.suffix)
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, SignalError> {
        let request = builder.build().map_err(|e| SignalError::Provider(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| SignalError::Provider("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| SignalError::Provider(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 5u64 * (attempt as u64 + 1);
            tracing::warn!("Quote API rate limited, waiting {}s before retry {}/3", wait_secs, attempt + 1);
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(SignalError::Provider("Rate limited by quote API after 3 retries".to_string()))
    }

    /// Fetch quotes for `tickers` in a single request.
    ///
    /// Entries the API omits or cannot price are dropped; the result carries
    /// the caller's tickers, not the exchange symbols.
    pub async fn get_quotes(&self, tickers: &[String]) -> Result<Vec<Quote>, SignalError> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }

        let by_exchange: HashMap<String, &str> = tickers
            .iter()
            .map(|t| (self.exchange_symbol(t), t.as_str()))
            .collect();
        let symbols = by_exchange.keys().cloned().collect::<Vec<_>>().join(",");

        let url = format!("{}/v7/finance/quote", self.base_url);
        let response = self
            .send_request(
                self.client
                    .get(&url)
                    .query(&[("symbols", symbols.as_str())])
                    .header("Accept", "application/json"),
            )
            .await?;

        if !response.status().is_success() {
            return Err(SignalError::Provider(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SignalError::Provider(e.to_string()))?;

        self.parse_quotes(&body, &by_exchange)
    }

    fn parse_quotes(&self, body: &str, by_exchange: &HashMap<String, &str>) -> Result<Vec<Quote>, SignalError> {
        let envelope: QuoteEnvelope =
            serde_json::from_str(body).map_err(|e| SignalError::Provider(format!("Bad quote payload: {}", e)))?;

        let mut quotes = Vec::with_capacity(envelope.quote_response.result.len());
        for raw in envelope.quote_response.result {
            let ticker = by_exchange
                .get(&raw.symbol)
                .map(|t| t.to_string())
                .unwrap_or_else(|| self.strip_suffix(&raw.symbol));
            let exchange_symbol = raw.symbol.clone();
            match raw.into_quote(&ticker) {
                Some(quote) => quotes.push(quote),
                None => tracing::debug!("Dropping {}: no usable price", exchange_symbol),
            }
        }
        Ok(quotes)
    }

    fn strip_suffix(&self, symbol: &str) -> String {
        if self.suffix.is_empty() {
            return symbol.to_string();
        }
        symbol.strip_suffix(self.suffix.as_str()).unwrap_or(symbol).to_string()
    }
}

impl Default for YahooQuoteClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteProvider for YahooQuoteClient {
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, SignalError> {
        self.get_quotes(symbols).await
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}
