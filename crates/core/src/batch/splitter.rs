//! Splits a submission into container-sized batches
//!
//! The container endpoint accepts between two and ten items. Submissions of
//! up to ten go out as one batch; longer ones are cut into full batches of
//! ten, and the last two items are held back so the tail batch never holds a
//! single item.

use accountlink_domain::constants::{MAX_BATCH_SIZE, MIN_BATCH_SIZE};

/// Contiguous, order-preserving batches covering `items` exactly once
///
/// For more than ten items every batch has between two and ten members.
pub fn split<T>(items: &[T]) -> Vec<&[T]> {
    let n = items.len();
    if n <= MAX_BATCH_SIZE {
        return vec![items];
    }

    let held_back = n - MIN_BATCH_SIZE;
    let mut batches = Vec::with_capacity(n / MAX_BATCH_SIZE + 1);
    let mut start = 0;
    for end in 1..=held_back {
        if end - start == MAX_BATCH_SIZE {
            batches.push(&items[start..end]);
            start = end;
        }
    }
    // The tail can absorb the two held-back items only while it has room.
    if held_back - start > MAX_BATCH_SIZE - MIN_BATCH_SIZE {
        batches.push(&items[start..held_back]);
        start = held_back;
    }
    batches.push(&items[start..]);
    batches
}
