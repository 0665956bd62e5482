// ── Cached page state ──
//
// The observable state one cache handle exposes: the current page
// contents, the collection-wide total, and the last fetch error.

use std::sync::Arc;

/// Sentinel for "total not yet known" (no fetch has succeeded).
pub const TOTAL_UNKNOWN: i64 = -1;

/// One consumer's view of a cached collection page.
///
/// Replaced wholesale on every fetch completion: a success swaps in the
/// new items and total and clears any error; a failure empties the
/// items and records the error, leaving the total at its last known
/// value so pagination controls stay meaningful.
#[derive(Debug)]
pub struct CachedPage<T> {
    /// Page contents, in server order.
    pub items: Arc<Vec<T>>,
    /// Total entities matching the query across all pages, or
    /// [`TOTAL_UNKNOWN`].
    pub total_count: i64,
    /// User-facing message from the last failed fetch, if any.
    pub error: Option<String>,
}

impl<T> CachedPage<T> {
    /// `true` once at least one fetch has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.total_count != TOTAL_UNKNOWN
    }
}

impl<T> Default for CachedPage<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            total_count: TOTAL_UNKNOWN,
            error: None,
        }
    }
}

// Manual impl: `Arc` makes the clone cheap and `T: Clone` is not needed.
impl<T> Clone for CachedPage<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            total_count: self.total_count,
            error: self.error.clone(),
        }
    }
}
