// ── Query parameter model ──
//
// The immutable tuple (page, size, sort, filters) that parameterizes
// one fetch. Structural equality decides whether replacing parameters
// costs a network round trip.

use indexmap::IndexMap;

use crate::entity::EntityType;

/// Sort direction for a paged read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    Descending,
    #[default]
    Unset,
}

impl SortOrder {
    /// Wire value for the gateway's `sort=<field>,<order>` parameter.
    pub const fn as_param(self) -> Option<&'static str> {
        match self {
            Self::Ascending => Some("asc"),
            Self::Descending => Some("desc"),
            Self::Unset => None,
        }
    }
}

/// Parameters for one collection fetch.
///
/// A pure value type: two instances are interchangeable iff all fields
/// are equal. Filter values keyed by field name; an empty string means
/// "no constraint on this field" and is never sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParameters {
    pub entity_type: EntityType,
    /// Zero-based page number.
    pub page: u32,
    pub page_size: u32,
    pub sort_field: Option<String>,
    pub sort_order: SortOrder,
    pub filters: IndexMap<String, String>,
}

impl QueryParameters {
    /// Parameters for the first page of a collection at its default
    /// page size, unsorted and unfiltered.
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            page: 0,
            page_size: entity_type.default_page_size(),
            sort_field: None,
            sort_order: SortOrder::Unset,
            filters: IndexMap::new(),
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_field = Some(field.into());
        self.sort_order = order;
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    /// Serialize to the gateway's query pairs.
    ///
    /// Emits `page` and `size` always, `sort` only when both a field
    /// and a direction are set and the entity type supports sorting,
    /// then one pair per non-empty filter value (in insertion order)
    /// when the entity type supports filtering. Empty filter values are
    /// omitted entirely, not sent as empty-string constraints.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let caps = self.entity_type.capabilities();

        let mut pairs = vec![
            ("page".to_owned(), self.page.to_string()),
            ("size".to_owned(), self.page_size.to_string()),
        ];

        if caps.sort {
            if let (Some(field), Some(order)) = (&self.sort_field, self.sort_order.as_param()) {
                pairs.push(("sort".to_owned(), format!("{field},{order}")));
            }
        }

        if caps.filter {
            for (field, value) in &self.filters {
                if !value.is_empty() {
                    pairs.push((field.clone(), value.clone()));
                }
            }
        }

        pairs
    }
}
