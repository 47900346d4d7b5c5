//! One-shot document cursors.
//!
//! A [`DocumentCursor`] yields the documents of a find operation lazily. It is finite,
//! can be drained only once, and cannot be rewound; run the find again to start over.

use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use bson::Document;
use futures::{
    Stream, StreamExt, TryStreamExt,
    stream::{self, BoxStream},
};

use crate::{
    document::{Record, RecordExt},
    error::DocumentStoreResult,
};

pub struct DocumentCursor<T = Document> {
    inner: BoxStream<'static, DocumentStoreResult<T>>,
}

impl<T: Send + 'static> DocumentCursor<T> {
    /// Wraps a backend stream.
    pub fn new(stream: impl Stream<Item = DocumentStoreResult<T>> + Send + 'static) -> Self {
        Self { inner: stream.boxed() }
    }

    /// Builds a cursor over already materialized items.
    pub fn from_items(items: Vec<T>) -> Self {
        Self::new(stream::iter(items.into_iter().map(Ok)))
    }

    /// A cursor that yields nothing.
    pub fn empty() -> Self {
        Self::new(stream::empty())
    }

    /// Drains the cursor, stopping at the first error.
    pub async fn into_vec(self) -> DocumentStoreResult<Vec<T>> {
        self.inner.try_collect().await
    }
}

impl DocumentCursor<Document> {
    /// Converts each yielded document into a record of type `R`.
    pub fn into_records<R: Record>(self) -> DocumentCursor<R> {
        DocumentCursor::new(
            self.inner
                .map(|item| item.and_then(R::from_document)),
        )
    }
}

impl<T> Stream for DocumentCursor<T> {
    type Item = DocumentStoreResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl<T> fmt::Debug for DocumentCursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCursor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn cursor_is_drained_once() {
        let mut cursor = DocumentCursor::from_items(vec![doc! { "n": 1 }, doc! { "n": 2 }]);

        assert_eq!(cursor.next().await.unwrap().unwrap(), doc! { "n": 1 });
        assert_eq!(cursor.into_vec().await.unwrap(), vec![doc! { "n": 2 }]);
    }

    #[tokio::test]
    async fn empty_cursor_ends_immediately() {
        let mut cursor: DocumentCursor = DocumentCursor::empty();

        assert!(cursor.next().await.is_none());
    }
}
