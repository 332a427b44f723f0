//! Cursor pagination: merging pages into one listing
//!
//! A listing is stored once, under the storage key of the query that first
//! loaded it. "Load more" fetches the next page with `after` set to the
//! listing's cursor and appends it. A page that arrives after the cursor has
//! moved on is discarded instead of being merged out of order.

use crate::cache::normalize::normalize_field;
use crate::cache::store::EntityStore;
use crate::cache::value::{EntityKey, FieldValue, Record};
use crate::query::shape::{Field, Variables};
use serde_json::Value;
use tracing::{debug, warn};

/// Names of the fields that make up a paginated connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    /// Top-level field holding the connection
    pub field: String,
    pub cursor: String,
    pub has_more: String,
    pub items: String,
    /// Variable carrying the cursor of the last merged page
    pub after_variable: String,
}

impl ConnectionSpec {
    /// `launches { cursor hasMore launches }` paged by `$after`
    pub fn launches() -> Self {
        Self {
            field: "launches".into(),
            cursor: "cursor".into(),
            has_more: "hasMore".into(),
            items: "launches".into(),
            after_variable: "after".into(),
        }
    }
}

/// One page, or the merge of several pages, of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub cursor: Option<String>,
    pub has_more: bool,
    pub items: Vec<FieldValue>,
    /// Remaining connection fields (e.g. `__typename`)
    pub extra: Record,
}

impl Connection {
    /// Read a connection out of a stored field value
    pub fn from_field(value: &FieldValue, spec: &ConnectionSpec) -> Option<Self> {
        let record = value.as_object()?;
        let mut extra = record.clone();
        let cursor = extra
            .remove(&spec.cursor)
            .and_then(|c| c.as_str().map(str::to_string));
        let has_more = extra
            .remove(&spec.has_more)
            .and_then(|h| h.as_bool())
            .unwrap_or(false);
        let items = match extra.remove(&spec.items) {
            Some(FieldValue::List(items)) => items,
            _ => vec![],
        };
        Some(Self {
            cursor,
            has_more,
            items,
            extra,
        })
    }

    /// Convert back into a stored field value
    pub fn into_field(self, spec: &ConnectionSpec) -> FieldValue {
        let mut record = self.extra;
        record.insert(
            spec.cursor.clone(),
            FieldValue::Scalar(self.cursor.map(Value::String).unwrap_or(Value::Null)),
        );
        record.insert(spec.has_more.clone(), self.has_more.into());
        record.insert(spec.items.clone(), FieldValue::List(self.items));
        FieldValue::Object(record)
    }
}

/// Merge a newly fetched page into the previous result.
///
/// An absent page leaves `previous` unchanged. Otherwise items are appended in
/// order without deduplication and the cursor and `has_more` come from the page.
pub fn merge(previous: &Connection, page: Option<Connection>) -> Connection {
    let Some(page) = page else {
        return previous.clone();
    };

    let mut items = Vec::with_capacity(previous.items.len() + page.items.len());
    items.extend(previous.items.iter().cloned());
    items.extend(page.items);

    let mut extra = previous.extra.clone();
    extra.extend(page.extra);

    Connection {
        cursor: page.cursor,
        has_more: page.has_more,
        items,
        extra,
    }
}

/// What happened to a "load more" request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMoreOutcome {
    /// Page appended to the listing
    Merged { added: usize, has_more: bool },
    /// Listing already complete; nothing fetched
    Exhausted,
    /// No listing to extend yet
    NotLoaded,
    /// Cursor moved while the page was in flight; page discarded
    Stale,
    /// Response carried no page
    Empty,
    /// Fetch failed; listing unchanged
    Failed(String),
}

/// Read the listing stored at `storage_key` on the root record
pub fn current_listing(
    store: &EntityStore,
    storage_key: &str,
    spec: &ConnectionSpec,
) -> Option<Connection> {
    store
        .read_field(&EntityKey::root(), storage_key)
        .and_then(|value| Connection::from_field(value, spec))
}

/// Merge a fetched page into the listing at `storage_key`.
///
/// `requested_after` is the cursor the page was requested with. If it no
/// longer matches the listing's cursor the page is stale and nothing, not even
/// the page's entities, is written.
pub fn apply_page(
    store: &mut EntityStore,
    spec: &ConnectionSpec,
    storage_key: &str,
    requested_after: Option<&str>,
    field: &Field,
    page: &Value,
    variables: &Variables,
) -> FetchMoreOutcome {
    let Some(current) = current_listing(store, storage_key, spec) else {
        return FetchMoreOutcome::NotLoaded;
    };

    if current.cursor.as_deref() != requested_after {
        warn!(
            "Discarding stale page for {} (requested after {:?}, listing at {:?})",
            storage_key, requested_after, current.cursor
        );
        return FetchMoreOutcome::Stale;
    }

    if page.is_null() {
        debug!("Empty page for {}", storage_key);
        return FetchMoreOutcome::Empty;
    }

    let normalized = normalize_field(store, field, page, variables);
    let Some(page) = Connection::from_field(&normalized, spec) else {
        warn!("Page for {} is not a connection object", storage_key);
        return FetchMoreOutcome::Empty;
    };

    let added = page.items.len();
    let merged = merge(&current, Some(page));
    let has_more = merged.has_more;
    debug!(
        "Merged {} item(s) into {} ({} total, has_more={})",
        added,
        storage_key,
        merged.items.len(),
        has_more
    );

    let mut fields = Record::new();
    fields.insert(storage_key.to_string(), merged.into_field(spec));
    store.write(&EntityKey::root(), fields);

    FetchMoreOutcome::Merged { added, has_more }
}
