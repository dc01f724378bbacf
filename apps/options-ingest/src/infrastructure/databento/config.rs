//! Databento adapter configuration.

use std::time::Duration;

use crate::domain::symbology::InstrumentId;

/// Production historical API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://hist.databento.com";

/// Symbol list meaning "every instrument in the dataset".
const ALL_SYMBOLS: &str = "ALL_SYMBOLS";

/// Configuration for the Databento HTTP client.
#[derive(Clone)]
pub struct DatabentoConfig {
    /// API key, sent as the basic-auth user name.
    pub api_key: String,
    /// API base URL without trailing slash.
    pub base_url: String,
    /// Connect timeout for every request.
    pub connect_timeout: Duration,
    /// Total timeout for symbology requests. Range streams are unbounded.
    pub request_timeout: Duration,
}

impl DatabentoConfig {
    /// Config against the production endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl std::fmt::Debug for DatabentoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabentoConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Parameters of one historical range request.
///
/// Built once per run; optional fields that are unset are left out of the
/// request entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    /// Dataset code, e.g. `OPRA.PILLAR`.
    pub dataset: String,
    /// Record schema, e.g. `trades`.
    pub schema: String,
    /// Inclusive range start (ISO 8601 date or date-time).
    pub start: String,
    /// Exclusive range end.
    pub end: Option<String>,
    /// Requested symbols. `None` selects every instrument.
    pub symbols: Option<Vec<String>>,
    /// Input symbology type.
    pub stype_in: Option<String>,
    /// Output symbology type.
    pub stype_out: Option<String>,
    /// Maximum number of records. 0 means unlimited.
    pub limit: u64,
}

impl RangeQuery {
    /// Form fields for `timeseries.get_range`.
    #[must_use]
    pub fn to_form(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("dataset", self.dataset.clone()),
            ("schema", self.schema.clone()),
            ("start", self.start.clone()),
            ("encoding", "json".to_string()),
            ("pretty_px", "true".to_string()),
            ("compression", "none".to_string()),
        ];
        if let Some(end) = self.end.as_deref().filter(|e| !e.is_empty()) {
            form.push(("end", end.to_string()));
        }
        let symbols = self
            .symbols
            .as_ref()
            .filter(|s| !s.is_empty())
            .map_or_else(|| ALL_SYMBOLS.to_string(), |s| s.join(","));
        form.push(("symbols", symbols));
        if let Some(stype_in) = self.stype_in.as_deref().filter(|s| !s.is_empty()) {
            form.push(("stype_in", stype_in.to_string()));
        }
        if let Some(stype_out) = self.stype_out.as_deref().filter(|s| !s.is_empty()) {
            form.push(("stype_out", stype_out.to_string()));
        }
        if self.limit > 0 {
            form.push(("limit", self.limit.to_string()));
        }
        form
    }
}

/// Form fields for `symbology.resolve`.
pub(super) fn resolve_form(
    dataset: &str,
    instrument_ids: &[InstrumentId],
    stype_in: &str,
    stype_out: &str,
    start: chrono::NaiveDate,
    end: Option<chrono::NaiveDate>,
) -> Vec<(&'static str, String)> {
    let symbols = instrument_ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let mut form = vec![
        ("dataset", dataset.to_string()),
        ("symbols", symbols),
        ("stype_in", stype_in.to_string()),
        ("stype_out", stype_out.to_string()),
        ("start_date", start.format("%Y-%m-%d").to_string()),
    ];
    if let Some(end) = end {
        form.push(("end_date", end.format("%Y-%m-%d").to_string()));
    }
    form
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn field<'a>(form: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn unset_options_are_omitted() {
        let form = query().to_form();
        assert_eq!(field(&form, "end"), None);
        assert_eq!(field(&form, "limit"), None);
        assert_eq!(field(&form, "stype_in"), None);
        assert_eq!(field(&form, "symbols"), Some("ALL_SYMBOLS"));
        assert_eq!(field(&form, "encoding"), Some("json"));
    }

    #[test]
    fn set_options_are_forwarded() {
        let form = RangeQuery {
            end: Some("2024-01-03".to_string()),
            symbols: Some(vec!["SPY".to_string(), "QQQ".to_string()]),
            stype_in: Some("parent".to_string()),
            limit: 500,
            ..query()
        }
        .to_form();
        assert_eq!(field(&form, "end"), Some("2024-01-03"));
        assert_eq!(field(&form, "symbols"), Some("SPY,QQQ"));
        assert_eq!(field(&form, "stype_in"), Some("parent"));
        assert_eq!(field(&form, "limit"), Some("500"));
    }

    #[test]
    fn resolve_form_joins_ids() {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let form = resolve_form("OPRA.PILLAR", &[7, 11], "instrument_id", "raw_symbol", start, None);
        assert_eq!(field(&form, "symbols"), Some("7,11"));
        assert_eq!(field(&form, "start_date"), Some("2024-01-02"));
        assert_eq!(field(&form, "end_date"), None);
    }

    #[test]
    fn debug_redacts_key() {
        let debug = format!("{:?}", DatabentoConfig::new("db-secret"));
        assert!(!debug.contains("db-secret"));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let config = DatabentoConfig::new("k").with_base_url("http://localhost:9000/");
        assert_eq!(config.base_url, "http://localhost:9000");
    }
}
