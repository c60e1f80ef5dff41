use std::fmt;
use std::sync::Arc;

use scylla::frame::response::result::CqlValue;
use scylla::statement::{Consistency, PagingState};
use serde::{Deserialize, Serialize};

use crate::errors::RosterError;

/// Positional bind values. `None` binds a CQL null.
pub type BindValues = Vec<Option<CqlValue>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    #[default]
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    LocalOne,
}

impl From<ConsistencyLevel> for Consistency {
    fn from(level: ConsistencyLevel) -> Self {
        match level {
            ConsistencyLevel::Any => Consistency::Any,
            ConsistencyLevel::One => Consistency::One,
            ConsistencyLevel::Two => Consistency::Two,
            ConsistencyLevel::Three => Consistency::Three,
            ConsistencyLevel::Quorum => Consistency::Quorum,
            ConsistencyLevel::All => Consistency::All,
            ConsistencyLevel::LocalQuorum => Consistency::LocalQuorum,
            ConsistencyLevel::EachQuorum => Consistency::EachQuorum,
            ConsistencyLevel::LocalOne => Consistency::LocalOne,
        }
    }
}

/// Opaque page state handed back by the store alongside a page of rows.
///
/// The bytes are never inspected; a token only ever travels from one page
/// response into the request for the following page of the same scan.
#[derive(Clone, PartialEq, Eq)]
pub struct ContinuationToken(Arc<[u8]>);

impl ContinuationToken {
    /// Wraps page-state bytes returned by a store. Empty bytes mean the scan
    /// is finished, so they yield `None`.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            None
        } else {
            Some(Self(bytes))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn from_paging_state(state: &PagingState) -> Option<Self> {
        state
            .as_bytes_slice()
            .and_then(|bytes| Self::from_bytes(Arc::clone(bytes)))
    }

    pub(crate) fn to_paging_state(&self) -> PagingState {
        PagingState::new_from_raw_bytes(Arc::clone(&self.0))
    }
}

impl fmt::Debug for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContinuationToken({} bytes)", self.0.len())
    }
}

/// Upper bound on the rows returned by a single page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize(i32);

impl PageSize {
    /// Driver default. Small sizes are only useful to show page boundaries.
    pub const DEFAULT: PageSize = PageSize(5000);

    pub fn new(rows: usize) -> Result<Self, RosterError> {
        if rows == 0 {
            return Err(RosterError::ValidationError(
                "page size must be a positive integer".to_string(),
            ));
        }
        i32::try_from(rows).map(PageSize).map_err(|_| {
            RosterError::ValidationError(format!(
                "page size {} exceeds the maximum of {}",
                rows,
                i32::MAX
            ))
        })
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A statement, its bind values and the page size to request it with.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub statement: String,
    pub params: BindValues,
    pub page_size: PageSize,
}

impl QueryDescriptor {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            params: Vec::new(),
            page_size: PageSize::default(),
        }
    }

    pub fn bind(mut self, value: CqlValue) -> Self {
        self.params.push(Some(value));
        self
    }

    pub fn bind_null(mut self) -> Self {
        self.params.push(None);
        self
    }

    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// One bounded batch of rows plus the token for the batch after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub rows: Vec<R>,
    pub next: Option<ContinuationToken>,
}

impl<R> Page<R> {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_bounds() {
        assert!(matches!(
            PageSize::new(0),
            Err(RosterError::ValidationError(_))
        ));
        assert_eq!(PageSize::new(2).unwrap().get(), 2);
        assert_eq!(PageSize::new(i32::MAX as usize).unwrap().get(), i32::MAX);
        assert!(PageSize::new(i32::MAX as usize + 1).is_err());
        assert_eq!(PageSize::default().get(), 5000);
    }

    #[test]
    fn test_empty_token_means_no_more_pages() {
        assert!(ContinuationToken::from_bytes(Vec::<u8>::new()).is_none());

        let token = ContinuationToken::from_bytes(vec![0x01, 0x02]).unwrap();
        assert_eq!(token.as_bytes(), &[0x01, 0x02]);
        assert_eq!(format!("{:?}", token), "ContinuationToken(2 bytes)");
    }

    #[test]
    fn test_token_survives_paging_state_unchanged() {
        let token = ContinuationToken::from_bytes(vec![7, 0, 42, 9]).unwrap();
        let state = token.to_paging_state();
        assert_eq!(ContinuationToken::from_paging_state(&state), Some(token));
        assert!(ContinuationToken::from_paging_state(&PagingState::start()).is_none());
    }

    #[test]
    fn test_descriptor_keeps_null_binds_in_position() {
        let query = QueryDescriptor::new("INSERT INTO messages (channel, content) VALUES (?, ?)")
            .bind(CqlValue::Int(6))
            .bind_null()
            .with_page_size(PageSize::new(2).unwrap());

        assert_eq!(query.params, vec![Some(CqlValue::Int(6)), None]);
        assert_eq!(query.page_size.get(), 2);
    }

    #[test]
    fn test_consistency_level_deserializes_snake_case() {
        let level: ConsistencyLevel = deserialize_level("local_quorum");
        assert_eq!(level, ConsistencyLevel::LocalQuorum);
        assert_eq!(Consistency::from(level), Consistency::LocalQuorum);
    }

    fn deserialize_level(name: &str) -> ConsistencyLevel {
        use serde::de::value::{Error, StrDeserializer};
        use serde::de::IntoDeserializer;
        let deserializer: StrDeserializer<'_, Error> = name.into_deserializer();
        ConsistencyLevel::deserialize(deserializer).unwrap()
    }
}
