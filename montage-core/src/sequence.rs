//! Lazy, cursor-driven iteration over the documents of a query.
//!
//! A [`DocumentSequence`] walks the pages of one query:
//!
//! ```text
//! NotStarted -> Fetching(first) -> Emitting(page) -> Fetching(next) -> ... -> Done
//! ```
//!
//! A page is only requested when the consumer asks for a document that is not buffered yet,
//! so stopping early never costs an extra round trip. Once `Done` (exhausted or failed) the
//! instance yields nothing more; build a new one to start again from the first page.
//!
//! # Example
//!
//! ```ignore
//! let mut documents = schema.documents().filter([("genre", "drama")]).iter();
//!
//! while let Some(document) = documents.try_next().await? {
//!     println!("{}", document["title"]);
//! }
//! ```

use futures::{Stream, stream};
use serde::de::DeserializeOwned;
use std::{collections::VecDeque, marker::PhantomData};
use tracing::debug;

use crate::{
    error::{MontageError, MontageResult},
    fetcher::PageFetcher,
    page::Document,
    query::Descriptor,
    transport::Transport,
};

#[derive(Debug)]
enum State {
    NotStarted,
    Emitting {
        buffer: VecDeque<Document>,
        cursor: Option<String>,
    },
    Done,
}

/// Forward-only sequence of the documents matched by a descriptor.
///
/// Single-owner: advancing requires `&mut self`, so one instance cannot be driven by two
/// consumers at once.
#[derive(Debug)]
pub struct DocumentSequence<'a, T: Transport + ?Sized> {
    fetcher: PageFetcher<'a, T>,
    descriptor: Descriptor,
    state: State,
    pages: usize,
}

impl<'a, T: Transport + ?Sized> DocumentSequence<'a, T> {
    /// Creates a sequence that has not issued any request yet.
    pub fn new(fetcher: PageFetcher<'a, T>, descriptor: Descriptor) -> Self {
        Self {
            fetcher,
            descriptor,
            state: State::NotStarted,
            pages: 0,
        }
    }

    /// The descriptor sent with the first page request.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Whether the sequence has finished, either exhausted or after a failed fetch.
    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Returns the next document, fetching the next page when the buffered one is used up.
    ///
    /// Returns `Ok(None)` once the last page has been emitted.
    ///
    /// # Errors
    ///
    /// A failed page fetch is returned as-is and ends the sequence.
    pub async fn try_next(&mut self) -> MontageResult<Option<Document>> {
        loop {
            // A failing fetch below returns early and leaves the state at `Done`.
            match std::mem::replace(&mut self.state, State::Done) {
                State::NotStarted => {
                    let page = self.fetcher.fetch_first(&self.descriptor).await?;
                    self.pages += 1;
                    self.state = State::Emitting {
                        buffer: page.data.into(),
                        cursor: page.cursor,
                    };
                }
                State::Emitting { mut buffer, cursor } => {
                    if let Some(document) = buffer.pop_front() {
                        self.state = State::Emitting { buffer, cursor };
                        return Ok(Some(document));
                    }

                    let Some(cursor) = cursor else {
                        debug!(pages = self.pages, "document sequence exhausted");
                        return Ok(None);
                    };

                    let page = self.fetcher.fetch_next(&cursor).await?;
                    self.pages += 1;
                    self.state = State::Emitting {
                        buffer: page.data.into(),
                        cursor: page.cursor,
                    };
                }
                State::Done => return Ok(None),
            }
        }
    }

    /// Drains the remaining documents into a vector.
    pub async fn try_collect_all(mut self) -> MontageResult<Vec<Document>> {
        let mut documents = Vec::new();

        while let Some(document) = self.try_next().await? {
            documents.push(document);
        }

        Ok(documents)
    }

    /// Converts this sequence into a [`Stream`] of documents.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = MontageResult<Document>> + 'a
    where
        T: 'a,
    {
        stream::try_unfold(self, |mut sequence| async move {
            let next = sequence.try_next().await?;
            Ok::<_, MontageError>(next.map(|document| (document, sequence)))
        })
    }

    /// Decodes every document into `D`.
    pub fn typed<D: DeserializeOwned>(self) -> TypedDocumentSequence<'a, T, D> {
        TypedDocumentSequence { inner: self, _marker: PhantomData }
    }
}

/// A [`DocumentSequence`] that deserializes each document into `D`.
#[derive(Debug)]
pub struct TypedDocumentSequence<'a, T: Transport + ?Sized, D> {
    inner: DocumentSequence<'a, T>,
    _marker: PhantomData<fn() -> D>,
}

impl<'a, T: Transport + ?Sized, D: DeserializeOwned> TypedDocumentSequence<'a, T, D> {
    /// Returns the next decoded document.
    ///
    /// # Errors
    ///
    /// Fetch failures are returned as-is; a document that does not decode into `D` yields a
    /// [`MontageError::Serialization`] error without ending the sequence.
    pub async fn try_next(&mut self) -> MontageResult<Option<D>> {
        match self.inner.try_next().await? {
            Some(document) => Ok(Some(serde_json::from_value(document.into())?)),
            None => Ok(None),
        }
    }

    /// Drains the remaining documents into a vector, stopping at the first error.
    pub async fn try_collect_all(mut self) -> MontageResult<Vec<D>> {
        let mut documents = Vec::new();

        while let Some(document) = self.try_next().await? {
            documents.push(document);
        }

        Ok(documents)
    }

    /// Returns the untyped sequence.
    pub fn into_inner(self) -> DocumentSequence<'a, T> {
        self.inner
    }
}
