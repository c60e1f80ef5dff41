//! Page-state driven scans.
//!
//! A scan requests one page at a time, hands every row of that page to the
//! consumer in store order, and threads the returned continuation token into
//! the next request until the store reports no more pages. The next page is
//! only requested once the consumer has drained the current one, so dropping
//! the stream early never costs an extra round trip.
//!
//! [`scan_pages`] gives the same walk one whole page at a time.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use scylla::cql_to_rust::FromRow;
use scylla::frame::response::result::Row;
use tracing::debug;

use crate::errors::RosterError;
use crate::types::{ContinuationToken, Page, QueryDescriptor};

/// Anything that can execute one page of a query.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Row: Send;

    /// Fetches the page that starts at `token`, or the first page when `token` is `None`.
    async fn fetch_page(
        &self,
        query: &QueryDescriptor,
        token: Option<ContinuationToken>,
    ) -> Result<Page<Self::Row>, RosterError>;
}

enum Cursor {
    Start,
    Resume(ContinuationToken),
    Exhausted,
}

struct ScanState<'a, S: PageSource + ?Sized, F> {
    source: &'a S,
    query: QueryDescriptor,
    buffered: VecDeque<S::Row>,
    cursor: Cursor,
    pages_fetched: usize,
    decode: F,
}

/// Lazily yields every row of `query`, page by page.
///
/// The first error (from a page fetch) is yielded once and ends the stream.
pub fn scan<'a, S>(
    source: &'a S,
    query: QueryDescriptor,
) -> impl Stream<Item = Result<S::Row, RosterError>> + 'a
where
    S: PageSource + ?Sized,
    S::Row: 'a,
{
    scan_with(source, query, Ok)
}

/// Like [`scan`], decoding each row into `T`. A row that fails to decode ends the scan.
pub fn scan_as<'a, S, T>(
    source: &'a S,
    query: QueryDescriptor,
) -> impl Stream<Item = Result<T, RosterError>> + 'a
where
    S: PageSource<Row = Row> + ?Sized,
    T: FromRow + 'a,
{
    scan_with(source, query, |row: Row| row.into_typed::<T>().map_err(RosterError::from))
}

/// General form of [`scan`]: `decode` runs on each row as it is handed out.
pub fn scan_with<'a, S, T, F>(
    source: &'a S,
    query: QueryDescriptor,
    decode: F,
) -> impl Stream<Item = Result<T, RosterError>> + 'a
where
    S: PageSource + ?Sized,
    S::Row: 'a,
    T: 'a,
    F: FnMut(S::Row) -> Result<T, RosterError> + 'a,
{
    let state = ScanState {
        source,
        query,
        buffered: VecDeque::new(),
        cursor: Cursor::Start,
        pages_fetched: 0,
        decode,
    };

    stream::try_unfold(state, next_row::<S, T, F>)
}

async fn next_row<'a, S, T, F>(
    mut state: ScanState<'a, S, F>,
) -> Result<Option<(T, ScanState<'a, S, F>)>, RosterError>
where
    S: PageSource + ?Sized,
    F: FnMut(S::Row) -> Result<T, RosterError>,
{
    loop {
        if let Some(row) = state.buffered.pop_front() {
            let item = (state.decode)(row)?;
            return Ok(Some((item, state)));
        }

        let token = match std::mem::replace(&mut state.cursor, Cursor::Exhausted) {
            Cursor::Exhausted => {
                debug!(
                    "Scan exhausted after {} page(s): {}",
                    state.pages_fetched, state.query.statement
                );
                return Ok(None);
            }
            Cursor::Start => None,
            Cursor::Resume(token) => Some(token),
        };

        let page = state.source.fetch_page(&state.query, token).await?;
        state.pages_fetched += 1;
        debug!(
            "Fetched page {} with {} row(s), last: {}",
            state.pages_fetched,
            page.rows.len(),
            page.is_last()
        );

        state.cursor = match page.next {
            Some(next) => Cursor::Resume(next),
            None => Cursor::Exhausted,
        };
        state.buffered = page.rows.into();
    }
}

struct PageState<'a, S: ?Sized, F> {
    source: &'a S,
    query: QueryDescriptor,
    cursor: Cursor,
    pages_fetched: usize,
    decode: F,
}

/// Lazily yields `query` one whole page at a time, each with the token that resumes after it.
///
/// For callers that need the page boundaries rather than a flat row stream.
/// A page may be empty and still carry a token.
pub fn scan_pages<'a, S>(
    source: &'a S,
    query: QueryDescriptor,
) -> impl Stream<Item = Result<Page<S::Row>, RosterError>> + 'a
where
    S: PageSource + ?Sized,
    S::Row: 'a,
{
    scan_pages_with(source, query, Ok)
}

/// Like [`scan_pages`], decoding every row of a page into `T` before the next page is requested.
pub fn scan_pages_as<'a, S, T>(
    source: &'a S,
    query: QueryDescriptor,
) -> impl Stream<Item = Result<Page<T>, RosterError>> + 'a
where
    S: PageSource<Row = Row> + ?Sized,
    T: FromRow + 'a,
{
    scan_pages_with(source, query, |row: Row| row.into_typed::<T>().map_err(RosterError::from))
}

/// General form of [`scan_pages`]. A fetch or decode failure is yielded once and ends the stream.
pub fn scan_pages_with<'a, S, T, F>(
    source: &'a S,
    query: QueryDescriptor,
    decode: F,
) -> impl Stream<Item = Result<Page<T>, RosterError>> + 'a
where
    S: PageSource + ?Sized,
    S::Row: 'a,
    T: 'a,
    F: FnMut(S::Row) -> Result<T, RosterError> + 'a,
{
    let state = PageState {
        source,
        query,
        cursor: Cursor::Start,
        pages_fetched: 0,
        decode,
    };

    stream::try_unfold(state, next_page::<S, T, F>)
}

async fn next_page<'a, S, T, F>(
    mut state: PageState<'a, S, F>,
) -> Result<Option<(Page<T>, PageState<'a, S, F>)>, RosterError>
where
    S: PageSource + ?Sized,
    F: FnMut(S::Row) -> Result<T, RosterError>,
{
    let token = match std::mem::replace(&mut state.cursor, Cursor::Exhausted) {
        Cursor::Exhausted => return Ok(None),
        Cursor::Start => None,
        Cursor::Resume(token) => Some(token),
    };

    let page = state.source.fetch_page(&state.query, token).await?;
    state.pages_fetched += 1;
    debug!(
        "Fetched page {} with {} row(s), last: {}",
        state.pages_fetched,
        page.rows.len(),
        page.is_last()
    );

    let rows = page
        .rows
        .into_iter()
        .map(&mut state.decode)
        .collect::<Result<Vec<T>, RosterError>>()?;

    state.cursor = match page.next.clone() {
        Some(next) => Cursor::Resume(next),
        None => Cursor::Exhausted,
    };

    Ok(Some((
        Page {
            rows,
            next: page.next,
        },
        state,
    )))
}
