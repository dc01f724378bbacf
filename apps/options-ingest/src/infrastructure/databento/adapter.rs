//! Symbology port implementation.

use async_trait::async_trait;

use super::http_client::DatabentoHttpClient;
use crate::application::ports::{ResolveRequest, SymbologyError, SymbologyPort};
use crate::domain::symbology::SymbolMapping;

/// Databento-backed [`SymbologyPort`].
#[derive(Debug, Clone)]
pub struct DatabentoSymbologyAdapter {
    client: DatabentoHttpClient,
}

impl DatabentoSymbologyAdapter {
    /// Wrap an HTTP client.
    #[must_use]
    pub const fn new(client: DatabentoHttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SymbologyPort for DatabentoSymbologyAdapter {
    async fn resolve(
        &self,
        request: &ResolveRequest,
    ) -> Result<Vec<SymbolMapping>, SymbologyError> {
        let response = self.client.resolve(request).await?;
        if !response.not_found.is_empty() || !response.partial.is_empty() {
            tracing::debug!(
                not_found = response.not_found.len(),
                partial = response.partial.len(),
                "Symbology lookup incomplete"
            );
        }
        Ok(response.into_mappings())
    }
}
