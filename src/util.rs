/// Lazy batching iterator: yields `Vec`s of `size` items, the last one
/// possibly shorter. Single pass over the underlying iterator, nothing is
/// materialized beyond the batch being built.
pub struct Batched<I: Iterator> {
    iter: I,
    size: usize,
}

impl<I: Iterator> Iterator for Batched<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(self.size);
        for item in self.iter.by_ref() {
            batch.push(item);
            if batch.len() == self.size {
                break;
            }
        }
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}

/// Batch items from `iter` into chunks of length `size`.
///
/// # Panics
/// Panics if `size` is zero, like `slice::chunks`.
pub fn batched<I: IntoIterator>(iter: I, size: usize) -> Batched<I::IntoIter> {
    assert!(size >= 1, "batch size must be at least one");
    Batched {
        iter: iter.into_iter(),
        size,
    }
}
