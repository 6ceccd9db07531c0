//! Canonical condition sets.
//!
//! A [`ConditionSet`] is the normalized form of a list of [`Condition`]s:
//! sorted by key (byte-wise) with every key appearing at most once. Equality of
//! two sets is plain structural equality of their normalized forms, which makes
//! the set usable as half of a Config's identity.
//!
//! Duplicate keys are rejected at construction with `InvalidConditionSet`
//! rather than silently resolved.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::determinism::escape::escape_component;
use crate::determinism::hashing::hash_bytes_hex;
use crate::determinism::stable_sort::stable_sort_by_key;
use crate::errors::{ChamberlainError, ChamberlainResult};
use crate::model::Condition;

/// Sorted, key-unique collection of conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Condition>", into = "Vec<Condition>")]
pub struct ConditionSet(Vec<Condition>);

impl ConditionSet {
    /// The empty set (the "default" config of a scene).
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Normalize an arbitrary list of conditions.
    ///
    /// Sorts by key ascending and rejects repeated keys.
    pub fn normalize<I>(conditions: I) -> ChamberlainResult<Self>
    where
        I: IntoIterator<Item = Condition>,
    {
        let mut items: Vec<Condition> = conditions.into_iter().collect();
        stable_sort_by_key(&mut items, |c| c.key.clone());

        if let Some(dup) = items
            .windows(2)
            .find(|w| w[0].key == w[1].key)
            .map(|w| w[0].key.clone())
        {
            return Err(ChamberlainError::invalid_condition_set(format!(
                "duplicate condition key: {dup}"
            )));
        }

        Ok(Self(items))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Condition> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Condition] {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .binary_search_by(|c| c.key.as_str().cmp(key))
            .ok()
            .map(|i| self.0[i].value.as_str())
    }

    /// True iff every condition in `query` is present here with equal key and value.
    ///
    /// An empty query matches every set.
    pub fn matches(&self, query: &[Condition]) -> bool {
        query
            .iter()
            .all(|q| self.get(&q.key) == Some(q.value.as_str()))
    }

    /// Canonical `key:value,key:value` string; `""` for the empty set.
    ///
    /// Delimiters inside keys or values are percent-escaped so the string is
    /// reversible.
    pub fn to_key_string(&self) -> String {
        self.0
            .iter()
            .map(|c| {
                format!(
                    "{}:{}",
                    escape_component(&c.key),
                    escape_component(&c.value)
                )
            })
            .join(",")
    }

    /// SHA-256 hex digest of [`Self::to_key_string`].
    pub fn digest(&self) -> String {
        hash_bytes_hex(self.to_key_string().as_bytes())
    }

    pub fn into_vec(self) -> Vec<Condition> {
        self.0
    }
}

impl TryFrom<Vec<Condition>> for ConditionSet {
    type Error = ChamberlainError;

    fn try_from(v: Vec<Condition>) -> Result<Self, Self::Error> {
        Self::normalize(v)
    }
}

impl From<ConditionSet> for Vec<Condition> {
    fn from(s: ConditionSet) -> Self {
        s.0
    }
}

impl<'a> IntoIterator for &'a ConditionSet {
    type Item = &'a Condition;
    type IntoIter = std::slice::Iter<'a, Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ConditionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("(none)")
        } else {
            f.write_str(&self.to_key_string())
        }
    }
}

/// Compare two raw condition lists for equality irrespective of order.
pub fn conditions_equal(a: &[Condition], b: &[Condition]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let sorted_a = a.iter().sorted_by(|x, y| x.key.cmp(&y.key));
    let sorted_b = b.iter().sorted_by(|x, y| x.key.cmp(&y.key));
    sorted_a.zip(sorted_b).all(|(x, y)| x == y)
}

/// Parse a filter string of the form `k1:v1,k2:v2`.
///
/// Whitespace around keys and values is trimmed; the value is everything after
/// the first `:`. An empty string yields an empty filter.
pub fn parse_condition_filter(s: &str) -> ChamberlainResult<Vec<Condition>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|part| {
            let (k, v) = part.split_once(':').ok_or_else(|| {
                ChamberlainError::invalid_argument(format!(
                    "condition filter entry {part:?} is not key:value"
                ))
            })?;
            let key = k.trim();
            if key.is_empty() {
                return Err(ChamberlainError::invalid_argument(format!(
                    "condition filter entry {part:?} has an empty key"
                )));
            }
            Ok(Condition::new(key, v.trim()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn c(k: &str, v: &str) -> Condition {
        Condition::new(k, v)
    }

    #[test]
    fn normalize_sorts_by_key() {
        let s = ConditionSet::normalize(vec![c("region", "eu"), c("env", "prod")]).unwrap();
        let keys: Vec<_> = s.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["env", "region"]);
    }

    #[test]
    fn normalize_is_byte_wise() {
        let s = ConditionSet::normalize(vec![c("b", "1"), c("B", "2"), c("_a", "3")]).unwrap();
        let keys: Vec<_> = s.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["B", "_a", "b"]);
    }

    #[test]
    fn duplicate_keys_rejected() {
        let err = ConditionSet::normalize(vec![c("env", "prod"), c("env", "dev")]).unwrap_err();
        assert_matches!(err, ChamberlainError::InvalidConditionSet(msg) if msg.contains("env"));
    }

    #[test]
    fn key_string_format() {
        assert_eq!(ConditionSet::empty().to_key_string(), "");
        let s = ConditionSet::normalize(vec![c("region", "eu"), c("env", "prod")]).unwrap();
        assert_eq!(s.to_key_string(), "env:prod,region:eu");
    }

    #[test]
    fn key_string_escapes_delimiters() {
        let s = ConditionSet::normalize(vec![c("url", "http://x,y")]).unwrap();
        assert_eq!(s.to_key_string(), "url:http%3A//x%2Cy");
    }

    #[test]
    fn matches_subset() {
        let target = ConditionSet::normalize(vec![c("env", "prod"), c("region", "eu")]).unwrap();
        assert!(target.matches(&[]));
        assert!(target.matches(&[c("env", "prod")]));
        assert!(target.matches(&[c("region", "eu"), c("env", "prod")]));
        assert!(!target.matches(&[c("env", "dev")]));
        assert!(!target.matches(&[c("tier", "gold")]));
    }

    #[test]
    fn empty_target_only_matches_empty_query() {
        let target = ConditionSet::empty();
        assert!(target.matches(&[]));
        assert!(!target.matches(&[c("env", "prod")]));
    }

    #[test]
    fn raw_equality_ignores_order() {
        assert!(conditions_equal(
            &[c("a", "1"), c("b", "2")],
            &[c("b", "2"), c("a", "1")]
        ));
        assert!(!conditions_equal(&[c("a", "1")], &[c("a", "2")]));
        assert!(!conditions_equal(&[c("a", "1")], &[]));
    }

    #[test]
    fn digest_of_empty_set_is_digest_of_empty_string() {
        assert_eq!(
            ConditionSet::empty().digest(),
            crate::determinism::hashing::hash_bytes_hex(b"")
        );
    }

    #[test]
    fn serde_normalizes_on_load() {
        let s: ConditionSet = serde_json::from_str(
            r#"[{"key":"region","value":"eu"},{"key":"env","value":"prod"}]"#,
        )
        .unwrap();
        assert_eq!(s.as_slice()[0].key, "env");

        let dup: Result<ConditionSet, _> = serde_json::from_str(
            r#"[{"key":"env","value":"a"},{"key":"env","value":"b"}]"#,
        );
        assert!(dup.is_err());
    }

    #[test]
    fn filter_parsing() {
        assert!(parse_condition_filter("").unwrap().is_empty());
        let f = parse_condition_filter(" env : prod ,url:a:b").unwrap();
        assert_eq!(f, vec![c("env", "prod"), c("url", "a:b")]);
        assert!(parse_condition_filter("env").is_err());
        assert!(parse_condition_filter(":x").is_err());
    }

    fn arb_conditions() -> impl Strategy<Value = Vec<Condition>> {
        prop::collection::btree_map("[a-z_]{1,6}", "[a-zA-Z0-9:,% ]{0,6}", 0..6).prop_map(|m| {
            m.into_iter()
                .map(|(k, v)| Condition::new(k, v))
                .collect::<Vec<_>>()
        })
    }

    proptest! {
        #[test]
        fn normalize_is_order_independent(conds in arb_conditions(), seed in any::<u64>()) {
            let mut shuffled = conds.clone();
            // deterministic permutation driven by the seed
            let n = shuffled.len();
            if n > 1 {
                for i in 0..n {
                    let j = ((seed.wrapping_mul(i as u64 + 1)) % n as u64) as usize;
                    shuffled.swap(i, j);
                }
            }
            let a = ConditionSet::normalize(conds).unwrap();
            let b = ConditionSet::normalize(shuffled).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.to_key_string(), b.to_key_string());
            prop_assert_eq!(a.digest(), b.digest());
        }
    }
}
