//! Paginated scanning of the token store
//!
//! Without a chunk size the scanner yields exactly one batch holding every
//! token admitted by the structural filter. With a chunk size it yields
//! batches of at most that many tokens, one store round-trip per batch,
//! continuing after the last serial it has seen.

use std::num::NonZeroUsize;

use crate::store::{StoreResult, StructuralFilter, TokenRecord, TokenStore};

/// Forward-only sequence of token batches.
///
/// The scanner does not hold on to the store between batches, so the caller
/// is free to mutate the store while processing a batch.
#[derive(Debug)]
pub struct PaginatedScanner {
    filter: StructuralFilter,
    chunk_size: Option<NonZeroUsize>,
    cursor: Option<String>,
    exhausted: bool,
}

impl PaginatedScanner {
    pub fn new(filter: StructuralFilter, chunk_size: Option<NonZeroUsize>) -> Self {
        Self {
            filter,
            chunk_size,
            cursor: None,
            exhausted: false,
        }
    }

    /// Fetch the next batch. `Ok(None)` marks the end of the sequence.
    pub fn next_batch<S: TokenStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> StoreResult<Option<Vec<TokenRecord>>> {
        if self.exhausted {
            return Ok(None);
        }

        let Some(chunk_size) = self.chunk_size else {
            self.exhausted = true;
            return store.fetch(&self.filter, None, None).map(Some);
        };

        let batch = store.fetch(&self.filter, self.cursor.as_deref(), Some(chunk_size.get()))?;
        if batch.len() < chunk_size.get() {
            self.exhausted = true;
        }
        match batch.last() {
            Some(last) => {
                self.cursor = Some(last.serial.clone());
                Ok(Some(batch))
            }
            None => Ok(None),
        }
    }

    pub fn is_chunked(&self) -> bool {
        self.chunk_size.is_some()
    }
}
