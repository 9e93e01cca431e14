use crate::{Keyword, Result, SearchVolume};
use async_trait::async_trait;
use std::collections::HashMap;

/// Hard cap on one search-volume lookup, imposed by the provider.
pub const VOLUME_BATCH_LIMIT: usize = 5;

/// Autocomplete-style "related keywords" oracle. Implementations exclude
/// the query keyword itself and intra-response duplicates, and degrade to
/// an empty list when the upstream has no data.
#[async_trait]
pub trait RelatedKeywordSource: Send + Sync {
    async fn related(&self, keyword: &Keyword) -> Result<Vec<Keyword>>;
}

/// Monthly search-volume oracle. Callers pass at most
/// [`VOLUME_BATCH_LIMIT`] keywords per lookup; results come back keyed by
/// the keyword string as the provider reports it (whitespace-stripped).
#[async_trait]
pub trait SearchVolumeSource: Send + Sync {
    async fn search_volumes(&self, keywords: &[Keyword]) -> Result<HashMap<String, SearchVolume>>;
}

/// Total matching-document count for a keyword, queried with the original
/// (non-stripped) string. Implementations degrade to zero on no data.
#[async_trait]
pub trait DocumentCountSource: Send + Sync {
    async fn document_count(&self, keyword: &Keyword) -> Result<u64>;
}
