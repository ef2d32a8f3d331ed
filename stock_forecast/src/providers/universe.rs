//! Ticker universes

use super::TickerUniverse;
use crate::error::{ForecastError, Result};
use crate::settings::ProviderSettings;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::info;

/// Normalize symbols: trimmed, upper-cased, blanks removed
fn normalize<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    symbols
        .into_iter()
        .map(|s| s.as_ref().trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A fixed list of tickers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticUniverse {
    tickers: Vec<String>,
}

impl StaticUniverse {
    pub fn new<I, S>(tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tickers: normalize(tickers),
        }
    }
}

impl TickerUniverse for StaticUniverse {
    fn tickers(&self) -> Result<Vec<String>> {
        Ok(self.tickers.clone())
    }
}

/// US listings from dumbstockapi.com, a JSON array of symbols
#[derive(Debug, Clone)]
pub struct DumbStockApi {
    client: Client,
    url: String,
}

impl DumbStockApi {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: settings.ticker_list_url.clone(),
        })
    }
}

impl TickerUniverse for DumbStockApi {
    fn tickers(&self) -> Result<Vec<String>> {
        let response = self.client.get(&self.url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ForecastError::ProviderError(format!(
                "Ticker list request failed with status {}",
                status
            )));
        }
        let symbols: Vec<String> = response.json()?;
        let tickers = normalize(symbols);
        info!(count = tickers.len(), "Fetched ticker universe");
        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_universe_normalizes() {
        let universe = StaticUniverse::new([" aapl", "MSFT", ""]);
        assert_eq!(universe.tickers().unwrap(), vec!["AAPL", "MSFT"]);
    }

    #[test]
    #[ignore] // Requires network access
    fn test_fetch_live_universe() {
        let api = DumbStockApi::new(&ProviderSettings::default()).unwrap();
        assert!(api.tickers().unwrap().contains(&"AAPL".to_string()));
    }
}
