//! HTTP client for the Databento historical API.

use reqwest::{Client, Response};

use super::api_types::{ApiErrorResponse, SymbologyResolveResponse};
use super::config::{DatabentoConfig, RangeQuery, resolve_form};
use super::error::DatabentoError;
use super::source::{JsonLinesSource, RangeSource};
use crate::application::ports::ResolveRequest;

const GET_RANGE_PATH: &str = "/v0/timeseries.get_range";
const RESOLVE_PATH: &str = "/v0/symbology.resolve";

/// HTTP client for the Databento historical API.
#[derive(Clone)]
pub struct DatabentoHttpClient {
    client: Client,
    api_key: String,
    base_url: String,
    request_timeout: std::time::Duration,
}

impl std::fmt::Debug for DatabentoHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabentoHttpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl DatabentoHttpClient {
    /// Create a new HTTP client from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the client cannot be built.
    pub fn new(config: &DatabentoConfig) -> Result<Self, DatabentoError> {
        if config.api_key.trim().is_empty() {
            return Err(DatabentoError::MissingApiKey);
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| DatabentoError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            request_timeout: config.request_timeout,
        })
    }

    /// Open a streaming range request.
    ///
    /// Records are read lazily from the response body as the returned
    /// source is polled.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API rejects it, or the
    /// response is not line-delimited JSON.
    pub async fn get_range(
        &self,
        query: &RangeQuery,
    ) -> Result<RangeSource, DatabentoError> {
        tracing::info!(
            dataset = %query.dataset,
            schema = %query.schema,
            start = %query.start,
            end = ?query.end,
            "Requesting historical range"
        );

        let response = self.post_form(GET_RANGE_PATH, &query.to_form(), None).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !is_line_json(&content_type) {
            return Err(DatabentoError::UnsupportedResponse { content_type });
        }

        Ok(JsonLinesSource::from_response(response))
    }

    /// Resolve one batch of instrument identifiers.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API rejects it, or the
    /// body cannot be parsed.
    pub async fn resolve(
        &self,
        request: &ResolveRequest,
    ) -> Result<SymbologyResolveResponse, DatabentoError> {
        let form = resolve_form(
            &request.dataset,
            &request.instrument_ids,
            request.stype_in,
            request.stype_out,
            request.window.start,
            request.window.end,
        );
        let response = self
            .post_form(RESOLVE_PATH, &form, Some(self.request_timeout))
            .await?;
        let text = response
            .text()
            .await
            .map_err(|e| DatabentoError::Network(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| DatabentoError::JsonParse(e.to_string()))
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&'static str, String)],
        timeout: Option<std::time::Duration>,
    ) -> Result<Response, DatabentoError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .client
            .post(&url)
            .basic_auth(&self.api_key, Some(""))
            .form(form);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DatabentoError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorResponse>(&body)
            .map_or(body, |err| err.message());
        tracing::warn!(status = status.as_u16(), %message, path, "Databento request failed");
        Err(DatabentoError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

fn is_line_json(content_type: &str) -> bool {
    content_type.starts_with("application/json")
        || content_type.starts_with("application/x-ndjson")
        || content_type.starts_with("text/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::RecordSource;
    use crate::domain::symbology::DateWindow;
    use chrono::NaiveDate;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> DatabentoHttpClient {
        DatabentoHttpClient::new(&DatabentoConfig::new("db-key").with_base_url(server.uri()))
            .unwrap()
    }

    fn query() -> RangeQuery {
        RangeQuery {
            dataset: "OPRA.PILLAR".to_string(),
            schema: "trades".to_string(),
            start: "2024-01-02".to_string(),
            end: None,
            symbols: None,
            stype_in: None,
            stype_out: None,
            limit: 0,
        }
    }

    #[test]
    fn empty_key_is_rejected() {
        let result = DatabentoHttpClient::new(&DatabentoConfig::new("  "));
        assert!(matches!(result, Err(DatabentoError::MissingApiKey)));
    }

    #[tokio::test]
    async fn get_range_streams_records() {
        let server = MockServer::start().await;
        let body = concat!(
            r#"{"hd":{"ts_event":"1704205800123456789","publisher_id":30,"instrument_id":7},"price":"1.25","size":2}"#,
            "\n",
            r#"{"hd":{"ts_event":"1704205801000000000","publisher_id":30,"instrument_id":8},"price":"2.5","size":1}"#,
            "\n",
        );
        Mock::given(method("POST"))
            .and(path("/v0/timeseries.get_range"))
            .and(header_exists("authorization"))
            .and(body_string_contains("dataset=OPRA.PILLAR"))
            .and(body_string_contains("encoding=json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let mut source = client(&server).get_range(&query()).await.unwrap();
        let first = source.next_record().await.unwrap().unwrap();
        let second = source.next_record().await.unwrap().unwrap();

        assert_eq!(first.hd.instrument_id, Some(7));
        assert_eq!(second.hd.instrument_id, Some(8));
        assert!(source.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_range_rejects_binary_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(vec![0u8, 1, 2], "application/octet-stream"),
            )
            .mount(&server)
            .await;

        let result = client(&server).get_range(&query()).await;
        assert!(matches!(
            result,
            Err(DatabentoError::UnsupportedResponse { content_type }) if content_type == "application/octet-stream"
        ));
    }

    #[tokio::test]
    async fn api_error_detail_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_raw(r#"{"detail":"Invalid dataset"}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let result = client(&server).get_range(&query()).await;
        assert!(matches!(
            result,
            Err(DatabentoError::Api { status: 422, message }) if message == "Invalid dataset"
        ));
    }

    #[tokio::test]
    async fn resolve_posts_identifier_batch() {
        let server = MockServer::start().await;
        let body = r#"{"result":{"7":[{"d0":"2024-01-02","d1":"2024-01-03","s":"SPY   240119C00470000"}]},"partial":[],"not_found":["8"]}"#;
        Mock::given(method("POST"))
            .and(path("/v0/symbology.resolve"))
            .and(body_string_contains("symbols=7%2C8"))
            .and(body_string_contains("stype_in=instrument_id"))
            .and(body_string_contains("start_date=2024-01-02"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let window = DateWindow {
            start: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            end: None,
        };
        let request = ResolveRequest::instrument_ids("OPRA.PILLAR", vec![7, 8], window);
        let response = client(&server).resolve(&request).await.unwrap();

        assert_eq!(response.not_found, vec!["8".to_string()]);
        assert_eq!(response.into_mappings().len(), 1);
    }
}
