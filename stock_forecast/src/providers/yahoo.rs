//! Yahoo Finance market data
//!
//! Prices come from the chart endpoint, `{chart_url}/{symbol}?range={period}&interval=1d`.
//! Company names come from the chart metadata and summaries from the quote
//! summary `assetProfile` module.

use super::{MarketDataProvider, TickerMetadata};
use crate::config::Period;
use crate::data::{PriceBar, PriceSeries};
use crate::error::{ForecastError, Result};
use crate::settings::ProviderSettings;
use chrono::{DateTime, NaiveDate};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<QuoteSummaryModules>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryModules {
    asset_profile: Option<AssetProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetProfile {
    long_business_summary: Option<String>,
}

/// Yahoo Finance client
#[derive(Debug, Clone)]
pub struct YahooFinance {
    client: Client,
    chart_url: String,
    quote_summary_url: String,
}

impl YahooFinance {
    /// Create a client from provider settings
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            chart_url: settings.chart_url.trim_end_matches('/').to_string(),
            quote_summary_url: settings.quote_summary_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_chart_url(&self, ticker: &str, period: Period) -> String {
        format!(
            "{}/{}?range={}&interval=1d",
            self.chart_url,
            ticker,
            period.as_str()
        )
    }

    fn build_summary_url(&self, ticker: &str) -> String {
        format!("{}/{}?modules=assetProfile", self.quote_summary_url, ticker)
    }

    fn get_text(&self, url: &str) -> Result<(reqwest::StatusCode, String)> {
        debug!(url = url, "Requesting");
        let response = self.client.get(url).send()?;
        let status = response.status();
        Ok((status, response.text()?))
    }

    fn fetch_chart(&self, ticker: &str, period: Period) -> Result<ChartData> {
        let (status, body) = self.get_text(&self.build_chart_url(ticker, period))?;
        match parse_chart(ticker, &body) {
            Err(ForecastError::DataError(_)) if !status.is_success() => {
                Err(ForecastError::ProviderError(format!(
                    "Chart request for '{}' failed with status {}",
                    ticker, status
                )))
            }
            other => other,
        }
    }

    fn fetch_summary(&self, ticker: &str) -> Result<Option<String>> {
        let (status, body) = self.get_text(&self.build_summary_url(ticker))?;
        if !status.is_success() {
            return Err(ForecastError::ProviderError(format!(
                "Quote summary request for '{}' failed with status {}",
                ticker, status
            )));
        }
        parse_summary(&body)
    }
}

/// Parse a chart response, mapping empty results and API errors to `NotFoundError`
fn parse_chart(ticker: &str, body: &str) -> Result<ChartData> {
    let response: YahooResponse = serde_json::from_str(body)?;
    if let Some(error) = response.chart.error {
        return Err(ForecastError::NotFoundError(format!(
            "No price history for '{}': {} ({})",
            ticker, error.description, error.code
        )));
    }
    response
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .ok_or_else(|| ForecastError::NotFoundError(format!("No price history for '{}'", ticker)))
}

/// Daily bars from chart data. Rows missing any field are skipped.
fn bars_from_chart(ticker: &str, data: &ChartData) -> Result<PriceSeries> {
    let quote = data.indicators.quote.first().ok_or_else(|| {
        ForecastError::NotFoundError(format!("No quotes returned for '{}'", ticker))
    })?;

    let mut bars = Vec::with_capacity(data.timestamp.len());
    for (i, ts) in data.timestamp.iter().enumerate() {
        let field = |values: &Vec<Option<f64>>| values.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
            quote.volume.get(i).copied().flatten(),
        ) else {
            continue;
        };
        let Some(date) = local_date(*ts, data.meta.gmtoffset) else {
            continue;
        };
        bars.push(PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if bars.is_empty() {
        return Err(ForecastError::NotFoundError(format!(
            "No complete price rows for '{}'",
            ticker
        )));
    }
    PriceSeries::from_unsorted(bars)
}

/// Calendar date of a Unix timestamp at the exchange's UTC offset
fn local_date(timestamp: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp + gmtoffset, 0).map(|dt| dt.date_naive())
}

fn parse_summary(body: &str) -> Result<Option<String>> {
    let response: QuoteSummaryResponse = serde_json::from_str(body)?;
    Ok(response
        .quote_summary
        .result
        .into_iter()
        .flatten()
        .find_map(|m| m.asset_profile.and_then(|p| p.long_business_summary)))
}

impl MarketDataProvider for YahooFinance {
    fn price_history(&self, ticker: &str, period: Period) -> Result<PriceSeries> {
        let data = self.fetch_chart(ticker, period)?;
        let series = bars_from_chart(ticker, &data)?;
        info!(
            ticker = ticker,
            period = %period,
            rows = series.len(),
            "Fetched price history"
        );
        Ok(series)
    }

    fn metadata(&self, ticker: &str) -> Result<TickerMetadata> {
        let name = match self.fetch_chart(ticker, Period::SixMonths) {
            Ok(data) => data.meta.long_name.or(data.meta.short_name),
            Err(e) => {
                warn!(ticker = ticker, error = %e, "Company name unavailable");
                None
            }
        };
        let summary = match self.fetch_summary(ticker) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(ticker = ticker, error = %e, "Company summary unavailable");
                None
            }
        };
        Ok(TickerMetadata::new(name, summary))
    }

    fn name(&self) -> &str {
        "Yahoo Finance"
    }
}
