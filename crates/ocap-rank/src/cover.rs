//! Sorting and range queries over rank-sorted sequences

use std::cmp::Ordering;
use std::ops::Range;

use ocap_core::{harden, pass_style_of, PassStyle, PassableError, Result, Value};
use tracing::debug;

use crate::order::{pass_style_prefix, RankCompare};

/// Inclusive bounds, in rank order, of a region of passables.
///
/// Covers over encoded keys are pairs of strings; a style's cover may also
/// contain values of neighbouring styles, so results found through one must
/// be filtered by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RankCover {
    /// Lowest value in the region
    pub low: Value,
    /// Highest value in the region
    pub high: Value,
}

impl RankCover {
    /// Create a cover from its bounds
    pub fn new(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        RankCover {
            low: low.into(),
            high: high.into(),
        }
    }
}

/// The cover of every encoded key
pub const FULL_RANK_COVER: (&str, &str) = ("", "{");

/// [`FULL_RANK_COVER`] as a [`RankCover`]
pub fn full_rank_cover() -> RankCover {
    RankCover::new(FULL_RANK_COVER.0, FULL_RANK_COVER.1)
}

/// The cover of every key encoding a value of `style`.
///
/// Runs from the style's first prefix character up to the character after
/// its last one. Bigints therefore cover `n` through `q`.
pub fn get_pass_style_cover(style: PassStyle) -> RankCover {
    let prefix = pass_style_prefix(style);
    let low = prefix.chars().next().map(String::from).unwrap_or_default();
    let high = prefix
        .chars()
        .last()
        .and_then(|c| char::from_u32(c as u32 + 1))
        .map(String::from)
        .unwrap_or_default();
    RankCover::new(low, high)
}

/// Harden and sort passables with a stable sort.
///
/// Every input is classified before sorting so that a non-passable fails
/// the whole call instead of leaving a partially sorted result.
pub fn sort_by_rank<C: RankCompare + ?Sized>(
    values: impl IntoIterator<Item = Value>,
    compare: &C,
) -> Result<Vec<Value>> {
    let mut values: Vec<Value> = values.into_iter().collect();
    for value in &values {
        harden(value);
        pass_style_of(value)?;
    }
    let mut failure = None;
    values.sort_by(|a, b| match compare.compare(a, b) {
        Ok(ordering) => ordering,
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(values),
    }
}

/// Whether no element sorts after its successor
pub fn is_rank_sorted<C: RankCompare + ?Sized>(values: &[Value], compare: &C) -> Result<bool> {
    for pair in values.windows(2) {
        if compare.compare(&pair[0], &pair[1])? == Ordering::Greater {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Fail unless [`is_rank_sorted`]
pub fn assert_rank_sorted<C: RankCompare + ?Sized>(values: &[Value], compare: &C) -> Result<()> {
    if is_rank_sorted(values, compare)? {
        Ok(())
    } else {
        Err(PassableError::invalid(format!(
            "Must be rank sorted: {}",
            Value::array(values.iter().cloned())
        )))
    }
}

#[derive(Clone, Copy)]
enum Bias {
    LeftMost,
    RightMost,
}

/// Number of elements below `key`, or at or below it with a right bias
fn rank_search<C: RankCompare + ?Sized>(
    sorted: &[Value],
    compare: &C,
    key: &Value,
    bias: Bias,
) -> Result<usize> {
    let (mut left, mut right) = (0, sorted.len());
    while left < right {
        let mid = left + (right - left) / 2;
        let ordering = compare.compare(&sorted[mid], key)?;
        let go_right = match bias {
            Bias::LeftMost => ordering == Ordering::Less,
            Bias::RightMost => ordering != Ordering::Greater,
        };
        if go_right {
            left = mid + 1;
        } else {
            right = mid;
        }
    }
    Ok(left)
}

/// Index range of the elements of `sorted` that fall inside `cover`.
///
/// The range is empty when the cover is. It contains every element of the
/// covered region but can contain more when the cover is loose.
pub fn get_index_cover<C: RankCompare + ?Sized>(
    sorted: &[Value],
    compare: &C,
    cover: &RankCover,
) -> Result<Range<usize>> {
    assert_rank_sorted(sorted, compare)?;
    let start = rank_search(sorted, compare, &cover.low, Bias::LeftMost)?;
    let end = rank_search(sorted, compare, &cover.high, Bias::RightMost)?;
    debug!(start, end, len = sorted.len(), "index cover");
    Ok(start..end.max(start))
}

/// The elements an index cover selects, with their indices
pub fn covered_entries(
    sorted: &[Value],
    cover: Range<usize>,
) -> impl Iterator<Item = (usize, &Value)> + '_ {
    let end = cover.end.min(sorted.len());
    let start = cover.start.min(end);
    sorted[start..end]
        .iter()
        .enumerate()
        .map(move |(offset, value)| (start + offset, value))
}

fn min_rank<C: RankCompare + ?Sized>(compare: &C, a: Value, b: Value) -> Result<Value> {
    Ok(if compare.compare(&a, &b)? != Ordering::Greater { a } else { b })
}

fn max_rank<C: RankCompare + ?Sized>(compare: &C, a: Value, b: Value) -> Result<Value> {
    Ok(if compare.compare(&a, &b)? != Ordering::Less { a } else { b })
}

/// The smallest cover containing every given cover.
///
/// With no covers the result is the empty cover `["{", ""]`.
pub fn union_rank_covers<C: RankCompare + ?Sized>(
    compare: &C,
    covers: impl IntoIterator<Item = RankCover>,
) -> Result<RankCover> {
    covers
        .into_iter()
        .try_fold(RankCover::new("{", ""), |acc, cover| {
            Ok(RankCover {
                low: min_rank(compare, acc.low, cover.low)?,
                high: max_rank(compare, acc.high, cover.high)?,
            })
        })
}

/// The largest cover inside every given cover.
///
/// With no covers the result is [`full_rank_cover`].
pub fn intersect_rank_covers<C: RankCompare + ?Sized>(
    compare: &C,
    covers: impl IntoIterator<Item = RankCover>,
) -> Result<RankCover> {
    covers.into_iter().try_fold(full_rank_cover(), |acc, cover| {
        Ok(RankCover {
            low: max_rank(compare, acc.low, cover.low)?,
            high: min_rank(compare, acc.high, cover.high)?,
        })
    })
}
