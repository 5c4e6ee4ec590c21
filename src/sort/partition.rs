//! In-place partitioning around the last element of a range

/// Partition `data[start..=end]` around the value at `end`
///
/// Every element strictly less than the pivot is moved in front of it; the
/// pivot is then swapped into its final position, which is returned. After
/// the call, all elements at indices `start..p` are `<=` the pivot and all
/// elements at indices `p+1..=end` are `>=` the pivot. Elements equal to the
/// pivot may end up on either side.
///
/// Single pass, no allocation. Callers must guarantee `start <= end < data.len()`.
///
/// # Example
///
/// ```
/// use datacrunch::sort::partition;
///
/// let mut data = vec![5.0, 1.0, 4.0, 2.0, 3.0];
/// let p = partition(&mut data, 0, 4);
/// assert_eq!(p, 2);
/// assert_eq!(data[p], 3.0);
/// ```
#[inline]
pub fn partition(data: &mut [f64], start: usize, end: usize) -> usize {
    debug_assert!(start <= end, "partition called with start > end");
    debug_assert!(end < data.len(), "partition end out of bounds");

    let pivot = data[end];
    let mut j = start;
    for i in start..end {
        if data[i] < pivot {
            data.swap(i, j);
            j += 1;
        }
    }
    data.swap(j, end);
    j
}
