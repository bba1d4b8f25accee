//! Polygon.io market data source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use trading_core::error::{DataError, SourceError, SourceErrorCode};
use trading_core::traits::DataSource;
use trading_core::types::{Quote, Stock, StockData, Timeframe};
use trading_core::CancelToken;

/// Public Polygon REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

/// Polygon source configuration.
#[derive(Debug, Clone)]
pub struct PolygonConfig {
    /// Name the source registers under
    pub name: String,
    /// Whether the source takes part in fetches
    pub enabled: bool,
    /// API key sent as the `apiKey` query parameter
    pub api_key: String,
    /// REST endpoint root
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Total attempts per request, including the first
    pub retry_attempts: u32,
    /// Fixed wait between attempts
    pub retry_delay: Duration,
}

impl PolygonConfig {
    /// Create config with default timeouts and retry policy.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "polygon".to_string(),
            enabled: true,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Aggregates (bars) response.
#[derive(Debug, Deserialize)]
struct AggregatesResponse {
    #[serde(default)]
    results: Vec<PolygonBar>,
}

#[derive(Debug, Deserialize)]
struct PolygonBar {
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
    /// Bar start, epoch milliseconds
    t: i64,
    vw: Option<f64>,
}

/// Last NBBO quote response.
#[derive(Debug, Deserialize)]
struct LastQuoteResponse {
    results: PolygonQuote,
}

#[derive(Debug, Deserialize)]
struct PolygonQuote {
    /// SIP timestamp, epoch nanoseconds
    t: i64,
    #[serde(default)]
    p: f64,
    #[serde(default)]
    s: u64,
    #[serde(default)]
    ap: f64,
    #[serde(rename = "as", default)]
    ask_size: u64,
    #[serde(default)]
    bp: f64,
    #[serde(default)]
    bs: u64,
}

/// Reference tickers page.
#[derive(Debug, Deserialize)]
struct TickersResponse {
    #[serde(default)]
    results: Vec<PolygonTicker>,
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PolygonTicker {
    ticker: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    primary_exchange: String,
    #[serde(rename = "type", default)]
    security_type: String,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    currency_name: String,
    description: Option<String>,
}

/// Polygon.io REST client implementing [`DataSource`].
///
/// Transient failures are retried up to `retry_attempts` times with a fixed
/// delay. The wait between attempts ends early when `shutdown` is cancelled.
pub struct PolygonDataSource {
    config: PolygonConfig,
    client: Client,
    shutdown: CancelToken,
}

impl PolygonDataSource {
    /// Create a new Polygon source.
    ///
    /// Zero timeouts or attempt counts fall back to the defaults.
    pub fn new(mut config: PolygonConfig, shutdown: CancelToken) -> Result<Self, DataError> {
        let defaults = PolygonConfig::new("");
        if config.timeout.is_zero() {
            config.timeout = defaults.timeout;
        }
        if config.retry_attempts == 0 {
            config.retry_attempts = defaults.retry_attempts;
        }
        if config.retry_delay.is_zero() {
            config.retry_delay = defaults.retry_delay;
        }
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        let client = Client::builder().timeout(config.timeout).build().map_err(|e| {
            SourceError::new(
                config.name.clone(),
                SourceErrorCode::RequestCreation,
                format!("Failed to build HTTP client: {}", e),
            )
        })?;

        Ok(Self {
            config,
            client,
            shutdown,
        })
    }

    /// Source configuration.
    pub fn config(&self) -> &PolygonConfig {
        &self.config
    }

    fn error(&self, code: SourceErrorCode, message: impl Into<String>) -> SourceError {
        SourceError::new(self.config.name.clone(), code, message)
    }

    /// Build an authenticated endpoint URL.
    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, SourceError> {
        let mut url = Url::parse(&format!("{}{}", self.config.base_url, path))
            .map_err(|e| self.error(SourceErrorCode::UrlParse, format!("Invalid URL: {}", e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("apiKey", &self.config.api_key);
        }
        Ok(url)
    }

    fn aggregates_url(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Url, SourceError> {
        let (multiplier, span) = timeframe.range();
        let path = format!(
            "/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            symbol,
            multiplier,
            span.as_str(),
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
        );
        self.endpoint(&path, &[("sort", "asc")])
    }

    /// Re-key a `next_url` pagination link with this source's API key.
    fn authenticate_next_url(&self, next_url: &str) -> Result<Url, SourceError> {
        let mut url = Url::parse(next_url).map_err(|e| {
            self.error(
                SourceErrorCode::UrlParse,
                format!("Failed to parse next_url: {}", e),
            )
        })?;
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "apiKey")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("apiKey", &self.config.api_key);
        Ok(url)
    }

    /// One GET request. Returns the body of a success response.
    async fn send_once(&self, url: &Url) -> Result<String, SourceError> {
        let resp = self.client.get(url.clone()).send().await.map_err(|e| {
            let code = if e.is_timeout() {
                SourceErrorCode::Timeout
            } else if e.is_builder() {
                SourceErrorCode::RequestCreation
            } else {
                SourceErrorCode::Connection
            };
            self.error(code, format!("Request failed: {}", e))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(self
                .error(
                    SourceErrorCode::Api,
                    format!("API returned status code {}: {}", status.as_u16(), text),
                )
                .with_status(status.as_u16()));
        }

        resp.text().await.map_err(|e| {
            let code = if e.is_timeout() {
                SourceErrorCode::Timeout
            } else {
                SourceErrorCode::Connection
            };
            self.error(code, format!("Failed to read response: {}", e))
        })
    }

    /// GET with bounded retries on transient failures.
    async fn fetch(&self, url: &Url) -> Result<String, SourceError> {
        let attempts = self.config.retry_attempts.max(1);
        let mut attempt = 1;

        loop {
            if self.shutdown.is_cancelled() {
                return Err(self.error(SourceErrorCode::Cancelled, "Request cancelled"));
            }

            match self.send_once(url).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_transient() && attempt < attempts => {
                    warn!(
                        source = %self.config.name,
                        path = url.path(),
                        attempt,
                        error = %err,
                        "Request failed, retrying"
                    );
                    if !self.shutdown.sleep(self.config.retry_delay).await {
                        return Err(self.error(
                            SourceErrorCode::Cancelled,
                            "Request cancelled between retries",
                        ));
                    }
                    attempt += 1;
                }
                Err(mut err) => {
                    if attempt > 1 {
                        err.message = format!("{} (after {} attempts)", err.message, attempt);
                    }
                    return Err(err);
                }
            }
        }
    }

    fn decode<T: DeserializeOwned>(&self, body: &str) -> Result<T, SourceError> {
        serde_json::from_str(body).map_err(|e| {
            self.error(
                SourceErrorCode::ResponseParse,
                format!("Failed to parse response: {}", e),
            )
        })
    }

    fn parse_bars(&self, symbol: &str, body: &str) -> Result<Vec<StockData>, SourceError> {
        let response: AggregatesResponse = self.decode(body)?;
        response
            .results
            .into_iter()
            .map(|bar| {
                let timestamp = DateTime::from_timestamp_millis(bar.t).ok_or_else(|| {
                    self.error(
                        SourceErrorCode::ResponseParse,
                        format!("Invalid bar timestamp: {}", bar.t),
                    )
                })?;
                let mut data = StockData::new(
                    symbol,
                    timestamp,
                    bar.o,
                    bar.h,
                    bar.l,
                    bar.c,
                    bar.v.max(0.0) as u64,
                )
                .with_transaction_id(format!("polygon_{}_{}", symbol, bar.t));
                if let Some(vwap) = bar.vw {
                    data = data.with_vwap(vwap);
                }
                Ok(data)
            })
            .collect()
    }

    fn parse_quote(&self, symbol: &str, body: &str) -> Result<Quote, SourceError> {
        let response: LastQuoteResponse = self.decode(body)?;
        let q = response.results;
        let timestamp = DateTime::from_timestamp(
            q.t.div_euclid(1_000_000_000),
            q.t.rem_euclid(1_000_000_000) as u32,
        )
        .ok_or_else(|| {
            self.error(
                SourceErrorCode::ResponseParse,
                format!("Invalid quote timestamp: {}", q.t),
            )
        })?;

        Ok(Quote {
            symbol: symbol.to_string(),
            timestamp,
            bid_price: q.bp,
            bid_size: q.bs,
            ask_price: q.ap,
            ask_size: q.ask_size,
            last_price: q.p,
            last_size: q.s,
            transaction_id: Some(format!("polygon_{}_{}", symbol, q.t)),
        })
    }

    fn parse_tickers(&self, body: &str) -> Result<(Vec<Stock>, Option<String>), SourceError> {
        let response: TickersResponse = self.decode(body)?;
        let stocks = response
            .results
            .into_iter()
            .map(|t| Stock {
                symbol: t.ticker,
                name: t.name,
                exchange: t.primary_exchange,
                security_type: t.security_type,
                currency: t.currency_name,
                is_active: t.active,
                description: t.description,
            })
            .collect();
        let next = response.next_url.filter(|url| !url.is_empty());
        Ok((stocks, next))
    }
}

#[async_trait]
impl DataSource for PolygonDataSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn health_check(&self) -> Result<(), DataError> {
        let url = self.endpoint("/v1/marketstatus/now", &[])?;
        self.send_once(&url).await?;
        Ok(())
    }

    async fn get_stock_data(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StockData>, DataError> {
        let url = self.aggregates_url(symbol, timeframe, start, end)?;
        let body = self.fetch(&url).await?;
        let bars = self.parse_bars(symbol, &body)?;
        debug!(source = %self.config.name, symbol, bars = bars.len(), "Fetched bars");
        Ok(bars)
    }

    async fn get_real_time_quote(&self, symbol: &str) -> Result<Quote, DataError> {
        let url = self.endpoint(&format!("/v2/last/nbbo/{}", symbol), &[])?;
        let body = self.fetch(&url).await?;
        Ok(self.parse_quote(symbol, &body)?)
    }

    async fn get_all_stocks(&self) -> Result<Vec<Stock>, DataError> {
        let mut url = self.endpoint(
            "/v3/reference/tickers",
            &[("market", "stocks"), ("active", "true"), ("limit", "1000")],
        )?;
        let mut all = Vec::new();

        loop {
            let body = self.fetch(&url).await?;
            let (stocks, next) = self.parse_tickers(&body)?;
            all.extend(stocks);

            match next {
                Some(next_url) => url = self.authenticate_next_url(&next_url)?,
                None => break,
            }
        }

        debug!(source = %self.config.name, count = all.len(), "Fetched ticker universe");
        Ok(all)
    }
}
