// ── Collection gateway seam ──
//
// The cache's view of the remote read operations. Rows cross this seam
// untyped (`serde_json::Value`) and are decoded into the consumer's row
// type inside the cache driver, so one gateway implementation serves
// every entity type.

use std::future::Future;

use serde_json::Value;

use crate::entity::{Capabilities, EntityType};
use crate::error::ApiError;
use crate::query::QueryParameters;

/// One fetched page before row decoding.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub items: Vec<Value>,
    pub total_count: i64,
}

/// Read operations the cache consumes from the remote gateway.
///
/// Implemented for [`tixly_api::RestClient`]; tests substitute fakes.
pub trait CollectionGateway: Send + Sync + 'static {
    /// Paged read, parameterized by the query model's serialization.
    fn fetch_page(
        &self,
        params: &QueryParameters,
    ) -> impl Future<Output = Result<RawPage, ApiError>> + Send;

    /// Plain (unpaged) read of a whole collection.
    fn fetch_all(
        &self,
        entity_type: EntityType,
    ) -> impl Future<Output = Result<Vec<Value>, ApiError>> + Send;
}

impl CollectionGateway for tixly_api::RestClient {
    async fn fetch_page(&self, params: &QueryParameters) -> Result<RawPage, ApiError> {
        let pairs = params.to_query_pairs();
        let envelope = self
            .list_page::<Value>(params.entity_type.collection_path(), &pairs)
            .await?;
        Ok(RawPage {
            items: envelope.content,
            total_count: envelope.total_elements,
        })
    }

    async fn fetch_all(&self, entity_type: EntityType) -> Result<Vec<Value>, ApiError> {
        self.list_all(entity_type.list_all_path()).await
    }
}

/// Resolve and run the gateway operation the capability table picks for
/// this fetch. A collection without server-side paging is fetched whole
/// and its length stands in for the total.
pub(crate) async fn resolve_fetch<G: CollectionGateway>(
    gateway: &G,
    caps: Capabilities,
    params: &QueryParameters,
) -> Result<RawPage, ApiError> {
    if caps.paging {
        gateway.fetch_page(params).await
    } else {
        let items = gateway.fetch_all(params.entity_type).await?;
        let total_count = i64::try_from(items.len()).unwrap_or(i64::MAX);
        Ok(RawPage { items, total_count })
    }
}
