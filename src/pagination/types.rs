//! Pagination types
//!
//! Defines the export page envelope and the page-number cursor.

use crate::error::{Error, Result};
use crate::types::{EntityType, Record};
use serde_json::Value;

/// Result of the next page computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPage {
    /// Fetch this page next
    Continue { page: u32 },
    /// No more pages
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// One decoded export response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportPage {
    /// Records under the entity's wire key
    pub records: Vec<Record>,
    /// Whether the source reports a further page
    pub has_next: bool,
    /// Total records on the source, when reported
    pub total: Option<u64>,
}

impl ExportPage {
    /// Decode an export envelope
    ///
    /// A missing collection key decodes to an empty page. Anything that is
    /// not an object, or a collection that is not a list of objects, is a
    /// malformed body.
    pub fn from_body(entity: EntityType, body: &Value) -> Result<Self> {
        let obj = body.as_object().ok_or_else(|| {
            Error::terminal(None, format!("Malformed {entity} response: not a JSON object"))
        })?;

        let records = match obj.get(entity.as_str()) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_object().cloned().ok_or_else(|| {
                        Error::terminal(
                            None,
                            format!("Malformed {entity} response: record is not an object"),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(Error::terminal(
                    None,
                    format!("Malformed {entity} response: '{entity}' is not a list"),
                ))
            }
        };

        Ok(Self {
            records,
            has_next: obj.get("has_next").and_then(Value::as_bool).unwrap_or(false),
            total: obj.get("total").and_then(Value::as_u64),
        })
    }

    /// Number of records on this page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the page holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Page-number cursor for one paginated collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    /// Page to request next (1-based)
    pub page: u32,
    /// Records per page
    pub per_page: u32,
    /// Requests answered so far
    pub pages_fetched: u32,
    /// Records accumulated so far
    pub total_fetched: u64,
    /// Whether the collection is complete
    pub done: bool,
}

impl PageCursor {
    /// Start at page 1
    pub fn new(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page,
            pages_fetched: 0,
            total_fetched: 0,
            done: false,
        }
    }

    /// Account for a fetched page and decide what comes next
    pub fn advance(&mut self, records_count: usize, has_next: bool) -> NextPage {
        self.pages_fetched += 1;

        if records_count == 0 {
            self.done = true;
            return NextPage::Done;
        }

        self.total_fetched += records_count as u64;

        if !has_next {
            self.done = true;
            return NextPage::Done;
        }

        self.page += 1;
        NextPage::Continue { page: self.page }
    }
}
