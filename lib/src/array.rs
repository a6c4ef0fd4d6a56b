//! Allocation-predictable sequence helpers used by the downsampler.
//!
//! None of these mutate their input except [`transform_in_place`], which is
//! kept crate-private.

use crate::error::{Result, SamplingError};

/// Applies `f` to every element, preserving length and order.
pub fn transform<I, O>(input: &[I], mut f: impl FnMut(&I) -> O) -> Vec<O> {
    let mut output = Vec::with_capacity(input.len());
    for item in input {
        output.push(f(item));
    }
    output
}

/// Rewrites every element of `input` in place.
pub(crate) fn transform_in_place<T>(input: &mut [T], mut f: impl FnMut(&T) -> T) {
    for item in input.iter_mut() {
        *item = f(item);
    }
}

/// Returns the elements in `[start, end)`.
///
/// Inverted bounds or an `end` past the sequence are rejected with
/// [`SamplingError::InvalidRange`] rather than clamped.
pub fn window<T>(input: &[T], start: usize, end: usize) -> Result<&[T]> {
    if start > end || end > input.len() {
        return Err(SamplingError::InvalidRange {
            start,
            end,
            len: input.len(),
        });
    }
    Ok(&input[start..end])
}

/// Strict left-to-right reduction. The reducer also receives the element's
/// position within `input`.
pub fn fold_left<I, A>(input: &[I], mut f: impl FnMut(A, &I, usize) -> A, initial: A) -> A {
    let mut acc = initial;
    for (index, item) in input.iter().enumerate() {
        acc = f(acc, item, index);
    }
    acc
}

/// Like [`fold_left`] but short-circuits on the first error.
pub fn try_fold_left<I, A, E>(
    input: &[I],
    mut f: impl FnMut(A, &I, usize) -> std::result::Result<A, E>,
    initial: A,
) -> std::result::Result<A, E> {
    let mut acc = initial;
    for (index, item) in input.iter().enumerate() {
        acc = f(acc, item, index)?;
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_preserves_length_and_order() {
        let data = [1, 2, 3, 4];
        assert_eq!(transform(&data, |v| v * 10), vec![10, 20, 30, 40]);
        assert!(transform(&[] as &[i32], |v| *v).is_empty());
    }

    #[test]
    fn transform_in_place_rewrites_elements() {
        let mut data = [1.0, 2.0, 3.0];
        transform_in_place(&mut data, |v| v * 0.5);
        assert_eq!(data, [0.5, 1.0, 1.5]);
    }

    #[test]
    fn window_returns_half_open_range() {
        let data = [0, 1, 2, 3, 4, 5];
        assert_eq!(window(&data, 2, 5).unwrap(), &[2, 3, 4]);
        assert_eq!(window(&data, 0, 6).unwrap().len(), 6);
        assert!(window(&data, 6, 6).unwrap().is_empty());
    }

    #[test]
    fn window_rejects_inverted_bounds() {
        let data = [0, 1, 2];
        assert_eq!(
            window(&data, 2, 1),
            Err(SamplingError::InvalidRange {
                start: 2,
                end: 1,
                len: 3
            })
        );
    }

    #[test]
    fn window_rejects_end_past_len() {
        let data = [0, 1, 2];
        assert!(matches!(
            window(&data, 0, 4),
            Err(SamplingError::InvalidRange { end: 4, .. })
        ));
    }

    #[test]
    fn fold_left_passes_index_in_order() {
        let data = ["a", "b", "c"];
        let seen = fold_left(
            &data,
            |mut acc: Vec<(usize, &str)>, item, i| {
                acc.push((i, *item));
                acc
            },
            Vec::new(),
        );
        assert_eq!(seen, vec![(0, "a"), (1, "b"), (2, "c")]);
    }

    #[test]
    fn try_fold_left_stops_at_first_error() {
        let data = [1, 2, 3, 4];
        let mut visited = 0;
        let result: std::result::Result<i32, &str> = try_fold_left(
            &data,
            |acc, v, _| {
                visited += 1;
                if *v == 2 {
                    Err("two")
                } else {
                    Ok(acc + v)
                }
            },
            0,
        );
        assert_eq!(result, Err("two"));
        assert_eq!(visited, 2);
    }
}
