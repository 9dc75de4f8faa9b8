//! Incremental JSON array encoding for response bodies.

use axum::body::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;

/// Encode `items` as a JSON array, one chunk per element.
///
/// Elements are serialized only when the stream is polled, so the whole
/// array never has to be held as text.
pub fn json_array<I>(items: I) -> impl Stream<Item = Result<Bytes, serde_json::Error>> + Send + 'static
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Serialize,
{
    let elements = items.into_iter().enumerate().map(|(i, item)| {
        let mut chunk = if i == 0 { Vec::new() } else { vec![b','] };
        serde_json::to_writer(&mut chunk, &item)?;
        Ok::<_, serde_json::Error>(Bytes::from(chunk))
    });

    stream::once(async { Ok::<_, serde_json::Error>(Bytes::from_static(b"[")) })
        .chain(stream::iter(elements))
        .chain(stream::once(async { Ok(Bytes::from_static(b"]")) }))
}
