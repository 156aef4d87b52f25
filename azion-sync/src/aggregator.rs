//! Cursor-paginated listing of every remote edge function.
//!
//! Pages are fetched strictly in sequence: the next cursor is only known once
//! the current page arrives. The walk ends on the first page without a `next`
//! link and is bounded by a page budget and a visited-cursor set.

use std::collections::HashSet;

use azion_core::{EdgeFunctionRecord, Token};

use crate::client::EdgeFunctionApi;
use crate::error::SyncError;

/// Fetch every page and return the concatenated `results`, in page order.
///
/// Any failing page fails the whole listing; no partial list is returned.
pub fn list_all<A: EdgeFunctionApi + ?Sized>(
    api: &A,
    token: &Token,
    max_pages: usize,
) -> Result<Vec<EdgeFunctionRecord>, SyncError> {
    let mut functions = Vec::new();
    let mut visited = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        if pages >= max_pages {
            return Err(SyncError::PageLimitExceeded { limit: max_pages });
        }
        let page = api.list_page(token, cursor.as_deref())?;
        pages += 1;
        tracing::debug!("page {pages}: {} function(s)", page.results.len());
        functions.extend(page.results);

        match page.next {
            None => break,
            Some(next) => {
                if !visited.insert(next.clone()) {
                    return Err(SyncError::PaginationLoop { url: next });
                }
                cursor = Some(next);
            }
        }
    }

    tracing::info!("listed {} function(s) across {pages} page(s)", functions.len());
    Ok(functions)
}
