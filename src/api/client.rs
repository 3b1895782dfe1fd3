use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::api::types::{FetchError, FetchResult, ForecastDay, ForecastResponse, WindowRecord};
use crate::config::ApiConfig;
use crate::error::{Result, VandebronError};
use crate::logging::{StructuredLogger, get_logger};

/// Window length requested from the greenest-window endpoint
pub const WINDOW_SIZE: &str = "3H";

const WINDOW_PATH: &str = "/api/v1/window";
const FORECAST_PATH: &str = "/api/v1/forecast";

/// Anything that can supply per-day window and forecast data
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Greenest window for the given civil date
    async fn fetch_window(&self, date: NaiveDate) -> FetchResult<WindowRecord>;

    /// Forecast timepoints for the given civil date
    async fn fetch_forecast(&self, date: NaiveDate) -> FetchResult<ForecastDay>;
}

/// HTTP client for the Vandebron forecast API
pub struct VandebronClient {
    base_url: String,
    user_agent: String,
    http: reqwest::Client,
    logger: StructuredLogger,
}

impl VandebronClient {
    /// Create a client from API settings
    pub fn new(cfg: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| VandebronError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: cfg.base_url.trim().trim_end_matches('/').to_string(),
            user_agent: cfg.user_agent.clone(),
            http,
            logger: get_logger("api"),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> FetchResult<Url> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| FetchError::Request(format!("{}{}: {}", self.base_url, path, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, query: &[(&str, String)]) -> FetchResult<T> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    FetchError::Request(e.to_string())
                } else {
                    FetchError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        serde_json::from_slice::<T>(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ForecastSource for VandebronClient {
    async fn fetch_window(&self, date: NaiveDate) -> FetchResult<WindowRecord> {
        let result = async {
            let url = self.endpoint(WINDOW_PATH)?;
            let query = [
                ("window_size", WINDOW_SIZE.to_string()),
                ("forecast_date", date.format("%Y-%m-%d").to_string()),
            ];
            self.get_json::<WindowRecord>(url, &query).await
        }
        .await;

        if let Err(e) = &result {
            self.logger.error(&format!(
                "Error fetching greenest window from Vandebron for {}: {}",
                date, e
            ));
        }
        result
    }

    async fn fetch_forecast(&self, date: NaiveDate) -> FetchResult<ForecastDay> {
        let result = async {
            let url = self.endpoint(FORECAST_PATH)?;
            let query = [("forecast_date", date.format("%Y-%m-%d").to_string())];
            self.get_json::<ForecastResponse>(url, &query)
                .await
                .map(|r| r.data)
        }
        .await;

        if let Err(e) = &result {
            self.logger.error(&format!(
                "Error fetching green energy forecast from Vandebron for {}: {}",
                date, e
            ));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(base: &str) -> ApiConfig {
        ApiConfig {
            base_url: base.to_string(),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = VandebronClient::new(&cfg("http://localhost:1234/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234");
        let url = client.endpoint(WINDOW_PATH).unwrap();
        assert_eq!(url.as_str(), "http://localhost:1234/api/v1/window");
    }

    #[tokio::test]
    async fn unparseable_base_url_is_not_a_data_gap() {
        let client = VandebronClient::new(&cfg("not a url")).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let err = client.fetch_window(date).await.unwrap_err();
        assert!(matches!(err, FetchError::Request(_)));
        assert!(!err.is_data_gap());
    }
}
