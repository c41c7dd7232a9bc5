use std::collections::{HashMap, HashSet};

use crate::model::{KeyValue, MatchResult, MatchedPair, Record};

/// Pair source records with target records by equal key values.
///
/// Targets are indexed by position. On duplicate target keys the first
/// occurrence is the only matchable one; the rest stay in `unmatched_target`.
/// Each target pairs at most once, so a repeated source key after the first
/// lands in `unmatched_source`. Records whose key is null or missing never match.
pub fn match_by_key(
    source: &[Record],
    target: &[Record],
    source_key: &str,
    target_key: &str,
) -> MatchResult {
    let mut target_index: HashMap<KeyValue, usize> = HashMap::new();
    for (i, row) in target.iter().enumerate() {
        if let Some(key) = KeyValue::from_value(row.get(target_key)) {
            target_index.entry(key).or_insert(i);
        }
    }

    let mut target_consumed = vec![false; target.len()];
    let mut matched_pairs = Vec::new();
    let mut unmatched_source = Vec::new();

    for (si, source_row) in source.iter().enumerate() {
        let hit = KeyValue::from_value(source_row.get(source_key))
            .and_then(|key| target_index.get(&key).copied())
            .filter(|&ti| !target_consumed[ti]);

        match hit {
            Some(ti) => {
                target_consumed[ti] = true;
                matched_pairs.push(MatchedPair {
                    source_index: si,
                    target_index: ti,
                    source: source_row.clone(),
                    target: target[ti].clone(),
                });
            }
            None => unmatched_source.push(source_row.clone()),
        }
    }

    let unmatched_target = target
        .iter()
        .zip(&target_consumed)
        .filter(|(_, consumed)| !**consumed)
        .map(|(row, _)| row.clone())
        .collect();

    MatchResult {
        matched_pairs,
        unmatched_source,
        unmatched_target,
    }
}

/// Match when both sides use the same key field name.
pub fn match_on_key(source: &[Record], target: &[Record], key: &str) -> MatchResult {
    match_by_key(source, target, key, key)
}

/// Target rows whose key repeats an earlier row, as `(key, index)` in input order.
///
/// Only the first row per key can ever match; these are the stranded rest.
pub fn duplicate_target_keys(target: &[Record], target_key: &str) -> Vec<(KeyValue, usize)> {
    let mut seen: HashSet<KeyValue> = HashSet::new();
    target
        .iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let key = KeyValue::from_value(row.get(target_key))?;
            if seen.contains(&key) {
                Some((key, index))
            } else {
                seen.insert(key);
                None
            }
        })
        .collect()
}
