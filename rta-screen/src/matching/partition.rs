//! Batch partitioning for metrics worker calls

/// Number of batches needed so none exceeds `max_batch_size`
pub fn batch_count(len: usize, max_batch_size: usize) -> usize {
    len.div_ceil(max_batch_size.max(1))
}

/// Split `items` into `m` contiguous chunks of near-equal size
///
/// Base size is `n / m`; the first `n % m` chunks get one extra element.
/// Order is preserved and every element lands in exactly one chunk.
/// `m == 0` yields no chunks.
pub fn divide<T>(items: Vec<T>, m: usize) -> Vec<Vec<T>> {
    if m == 0 {
        return Vec::new();
    }

    let n = items.len();
    let base = n / m;
    let remainder = n % m;
    let mut iter = items.into_iter();

    (0..m)
        .map(|i| {
            let size = base + usize::from(i < remainder);
            iter.by_ref().take(size).collect()
        })
        .collect()
}

/// Split `items` into the fewest even chunks of at most `max_batch_size`
///
/// An empty list produces no chunks.
pub fn partition<T>(items: Vec<T>, max_batch_size: usize) -> Vec<Vec<T>> {
    let m = batch_count(items.len(), max_batch_size);
    divide(items, m)
}
