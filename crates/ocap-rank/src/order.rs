//! Rank order over passables
//!
//! Values are first grouped by style, using the order of each style's key
//! prefix, then compared within the group. Errors, promises, `undefined` and
//! `null` are tied within their groups. Remotables are tied too unless the
//! comparator was given a way to tell them apart.

use std::cmp::Ordering;
use std::collections::HashMap;

use ocap_core::{
    compare_utf16, name_for_passable_symbol, pass_style_of, same_value_zero, ObjectId, ObjectRef,
    PassStyle, PassableError, Result, Value,
};
use parking_lot::Mutex;

/// Key prefix of every style, sorted by prefix.
///
/// A style's position in this table is its rank among styles. Bigints own
/// two prefixes, `n` for negatives and `p` for the rest.
pub const PASS_STYLE_PREFIXES: [(PassStyle, &str); 13] = [
    (PassStyle::Error, "!"),
    (PassStyle::CopyRecord, "("),
    (PassStyle::Tagged, ":"),
    (PassStyle::Promise, "?"),
    (PassStyle::CopyArray, "["),
    (PassStyle::Boolean, "b"),
    (PassStyle::Number, "f"),
    (PassStyle::Bigint, "np"),
    (PassStyle::Remotable, "r"),
    (PassStyle::String, "s"),
    (PassStyle::Null, "v"),
    (PassStyle::Symbol, "y"),
    (PassStyle::Undefined, "z"),
];

/// Key prefix characters of a style
pub fn pass_style_prefix(style: PassStyle) -> &'static str {
    PASS_STYLE_PREFIXES
        .iter()
        .find(|(s, _)| *s == style)
        .map_or("", |(_, prefix)| prefix)
}

fn style_rank(style: PassStyle) -> usize {
    PASS_STYLE_PREFIXES
        .iter()
        .position(|(s, _)| *s == style)
        .unwrap_or(PASS_STYLE_PREFIXES.len())
}

/// A fallible three-way comparison over passables.
///
/// Comparing classifies both sides, so it fails on non-passable input.
pub trait RankCompare {
    /// Compare two passables
    fn compare(&self, left: &Value, right: &Value) -> Result<Ordering>;

    /// The mirror-image comparator
    fn anti(self) -> AntiRank<Self>
    where
        Self: Sized,
    {
        AntiRank(self)
    }
}

/// Tie-breaker for remotables supplied by the caller
pub type RemotableCompare = Box<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

/// Rank order, optionally refined among remotables
#[derive(Default)]
pub struct RankComparator {
    remotables: Option<RemotableCompare>,
}

impl RankComparator {
    /// Plain rank order: all remotables tie
    pub fn new() -> Self {
        Self::default()
    }

    /// Rank order with remotables ordered by `compare`
    pub fn with_remotable_compare(
        compare: impl Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        RankComparator {
            remotables: Some(Box::new(compare)),
        }
    }
}

impl RankCompare for RankComparator {
    fn compare(&self, left: &Value, right: &Value) -> Result<Ordering> {
        compare_by(left, right, &|a, b| {
            Ok(self.remotables.as_ref().map_or(Ordering::Equal, |f| f(a, b)))
        })
    }
}

/// Rank order refined into a strict order among remotables.
///
/// Each remotable gets an ordinal the first time this comparator sees it, so
/// the order is stable for the comparator's lifetime. Ordinals only break
/// ties, so the result agrees with rank order wherever rank order is
/// decisive.
#[derive(Default)]
pub struct FullOrderComparator {
    ordinals: Mutex<HashMap<ObjectId, u64>>,
}

impl FullOrderComparator {
    /// A comparator that has seen no remotables yet
    pub fn new() -> Self {
        Self::default()
    }

    fn ordinal(&self, value: &Value) -> u64 {
        let Some(obj) = value.as_object() else {
            return 0;
        };
        let mut ordinals = self.ordinals.lock();
        let next = ordinals.len() as u64 + 1;
        *ordinals.entry(obj.id()).or_insert(next)
    }
}

impl RankCompare for FullOrderComparator {
    fn compare(&self, left: &Value, right: &Value) -> Result<Ordering> {
        let rank = compare_rank(left, right)?;
        if rank != Ordering::Equal {
            return Ok(rank);
        }
        compare_by(left, right, &|a, b| {
            let left_ordinal = self.ordinal(a);
            let right_ordinal = self.ordinal(b);
            Ok(left_ordinal.cmp(&right_ordinal))
        })
    }
}

/// The mirror image of another comparator
pub struct AntiRank<C>(pub C);

impl<C: RankCompare> RankCompare for AntiRank<C> {
    fn compare(&self, left: &Value, right: &Value) -> Result<Ordering> {
        self.0.compare(right, left)
    }
}

/// Compare two passables in rank order
pub fn compare_rank(left: &Value, right: &Value) -> Result<Ordering> {
    RankComparator::new().compare(left, right)
}

/// Compare two passables in reverse rank order
pub fn compare_anti_rank(left: &Value, right: &Value) -> Result<Ordering> {
    compare_rank(right, left)
}

/// Record property names in descending order
pub fn record_names(record: &ObjectRef) -> Vec<String> {
    let mut names: Vec<String> = record
        .own_keys()
        .into_iter()
        .filter_map(|key| key.as_str().map(str::to_string))
        .collect();
    names.sort_by(|a, b| compare_utf16(b, a));
    names
}

/// Record names in descending order with their values in the same order
pub fn record_parts(record: &ObjectRef) -> (Vec<String>, Vec<Value>) {
    let names = record_names(record);
    let values = names
        .iter()
        .map(|name| record.get(name).unwrap_or(Value::Undefined))
        .collect();
    (names, values)
}

/// The tag and payload of a tagged value
pub(crate) fn tagged_parts(tagged: &ObjectRef) -> Result<(String, Value)> {
    let tag = tagged
        .marker()
        .and_then(|marker| marker.tag.as_str())
        .ok_or_else(|| PassableError::unrecognized_style("tagged value without a string tag"))?;
    let payload = tagged.get("payload").unwrap_or(Value::Undefined);
    Ok((tag.to_string(), payload))
}

fn compare_by<F>(left: &Value, right: &Value, remotables: &F) -> Result<Ordering>
where
    F: Fn(&Value, &Value) -> Result<Ordering>,
{
    if same_value_zero(left, right) {
        return Ok(Ordering::Equal);
    }
    let left_style = pass_style_of(left)?;
    let right_style = pass_style_of(right)?;
    if left_style != right_style {
        return Ok(style_rank(left_style).cmp(&style_rank(right_style)));
    }
    match (left_style, left, right) {
        (PassStyle::Undefined | PassStyle::Null | PassStyle::Error | PassStyle::Promise, _, _) => {
            Ok(Ordering::Equal)
        }
        (PassStyle::Boolean, Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        (PassStyle::Bigint, Value::BigInt(a), Value::BigInt(b)) => Ok(a.cmp(b)),
        (PassStyle::String, Value::String(a), Value::String(b)) => Ok(compare_utf16(a, b)),
        (PassStyle::Number, Value::Number(a), Value::Number(b)) => Ok(compare_numbers(*a, *b)),
        (PassStyle::Symbol, Value::Symbol(a), Value::Symbol(b)) => {
            let a = name_for_passable_symbol(a).unwrap_or_default();
            let b = name_for_passable_symbol(b).unwrap_or_default();
            Ok(compare_utf16(&a, &b))
        }
        (PassStyle::CopyArray, Value::Object(a), Value::Object(b)) => {
            compare_sequences(&a.elements(), &b.elements(), remotables)
        }
        (PassStyle::CopyRecord, Value::Object(a), Value::Object(b)) => {
            let (left_names, left_values) = record_parts(a);
            let (right_names, right_values) = record_parts(b);
            let by_names = compare_names(&left_names, &right_names);
            if by_names != Ordering::Equal {
                return Ok(by_names);
            }
            compare_sequences(&left_values, &right_values, remotables)
        }
        (PassStyle::Tagged, Value::Object(a), Value::Object(b)) => {
            let (left_tag, left_payload) = tagged_parts(a)?;
            let (right_tag, right_payload) = tagged_parts(b)?;
            let by_tag = compare_utf16(&left_tag, &right_tag);
            if by_tag != Ordering::Equal {
                return Ok(by_tag);
            }
            compare_by(&left_payload, &right_payload, remotables)
        }
        (PassStyle::Remotable, _, _) => remotables(left, right),
        (style, _, _) => Err(PassableError::unrecognized_style(format!(
            "{style} classified a value of another kind: {left}"
        ))),
    }
}

/// Numeric order with every NaN after +Infinity. Zeros are already tied.
fn compare_numbers(left: f64, right: f64) -> Ordering {
    match (left.is_nan(), right.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
    }
}

fn compare_names(left: &[String], right: &[String]) -> Ordering {
    for (a, b) in left.iter().zip(right) {
        let ordering = compare_utf16(a, b);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.len().cmp(&right.len())
}

fn compare_sequences<F>(left: &[Value], right: &[Value], remotables: &F) -> Result<Ordering>
where
    F: Fn(&Value, &Value) -> Result<Ordering>,
{
    for (a, b) in left.iter().zip(right) {
        let ordering = compare_by(a, b, remotables)?;
        if ordering != Ordering::Equal {
            return Ok(ordering);
        }
    }
    Ok(left.len().cmp(&right.len()))
}
