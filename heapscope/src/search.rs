//! Binary search over sorted slices.
//!
//! Unlike [`slice::binary_search_by`], the result is encoded in a single
//! signed integer: a non-negative value is the index of a matching element,
//! a negative value `-(k + 1)` says the target belongs at index `k`. Callers
//! can query and insert in place without a second pass.
//!
//! The slice must be sorted ascending with respect to the comparator. This is
//! not validated; on unsorted input the result is unspecified but the search
//! never panics.

use std::cmp::Ordering;

/// Search `items` with `cmp`, which reports how an element compares to the
/// target (`Less` means the element sorts before the target).
///
/// Returns the index of an element comparing `Equal`, or
/// `-(insertion_index + 1)` if there is none.
///
/// O(log n) time, O(1) extra space.
///
/// ```
/// use heapscope::search::binary_search;
///
/// assert_eq!(binary_search(&[1, 3, 5, 7], |x| x.cmp(&5)), 2);
/// assert_eq!(binary_search(&[1, 3, 7], |x| x.cmp(&5)), -3);
/// ```
// Slice lengths never exceed isize::MAX, so the casts cannot wrap
#[allow(clippy::cast_possible_wrap)]
pub fn binary_search<T, F>(items: &[T], mut cmp: F) -> isize
where
    F: FnMut(&T) -> Ordering,
{
    // Half-open window [low, high)
    let mut low = 0usize;
    let mut high = items.len();

    while low < high {
        let mid = low + (high - low) / 2;
        match cmp(&items[mid]) {
            Ordering::Less => low = mid + 1,
            Ordering::Greater => high = mid,
            Ordering::Equal => return mid as isize,
        }
    }

    -(low as isize) - 1
}

/// Search `items` for an element whose key, extracted with `f`, equals `key`.
pub fn binary_search_by_key<T, K, F>(items: &[T], key: &K, mut f: F) -> isize
where
    K: Ord,
    F: FnMut(&T) -> K,
{
    binary_search(items, |item| f(item).cmp(key))
}

/// Decode a [`binary_search`] result into `Ok(found_index)` or
/// `Err(insertion_index)`, the shape used by [`slice::binary_search`].
#[allow(clippy::cast_sign_loss)]
pub fn decode(result: isize) -> Result<usize, usize> {
    if result >= 0 {
        Ok(result as usize)
    } else {
        Err((-(result + 1)) as usize)
    }
}
