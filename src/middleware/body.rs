//! Lazily produced response bodies.

use std::fmt;
use std::iter;

type Chunks = Box<dyn Iterator<Item = Vec<u8>> + Send>;

/// A response body: a finite, non-restartable sequence of byte chunks
///
/// A body built from a fixed list and one produced on demand look the same
/// to consumers; appending a chunk never forces the existing chunks.
pub struct Body {
    chunks: Chunks,
}

impl Body {
    pub fn empty() -> Self {
        Self::lazy(iter::empty())
    }

    /// Body made of a fixed list of chunks
    pub fn from_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self::lazy(chunks.into_iter())
    }

    /// Body whose chunks are produced on demand
    pub fn lazy<I>(chunks: I) -> Self
    where
        I: Iterator<Item = Vec<u8>> + Send + 'static,
    {
        Self {
            chunks: Box::new(chunks),
        }
    }

    /// Yield every original chunk, then `chunk`
    pub fn chain_chunk(self, chunk: Vec<u8>) -> Self {
        Self::lazy(self.chunks.chain(iter::once(chunk)))
    }

    /// Drain the body into one buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.chunks.flatten().collect()
    }
}

impl Iterator for Body {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.next()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body").finish_non_exhaustive()
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_chunks(vec![bytes])
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(text.into_bytes())
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(text.as_bytes().to_vec())
    }
}
