use async_trait::async_trait;

/// Produces a sequence of input items lazily, one at a time.
///
/// Sources are fused: after returning `None` once, every subsequent call
/// must also return `None` rather than an error.
#[async_trait]
pub trait ItemSource<T>: Send {
    /// Pull the next item, or `None` when the stream is exhausted.
    async fn next(&mut self) -> Option<T>;
}

/// In-memory item source backed by a `Vec`, yielding items in order.
#[derive(Debug)]
pub struct VecSource<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> VecSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl<T> From<Vec<T>> for VecSource<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

#[async_trait]
impl<T: Send> ItemSource<T> for VecSource<T> {
    async fn next(&mut self) -> Option<T> {
        self.items.next()
    }
}
