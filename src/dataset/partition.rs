//! Stratified k-fold partitioning.
//!
//! Folds are filled strictly in order: with `m` items and `n` folds, the first
//! `m % n` folds take `m / n + 1` items and the rest take `m / n`. Each class is
//! partitioned on its own so small classes still reach every fold they can.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartitionError {
    #[error("fold count must be at least 1")]
    ZeroFolds,
}

/// One cross-validation fold of a single class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fold {
    pub index: usize,
    /// Positions into the class's item list held out for testing, in assignment order.
    pub test: Vec<usize>,
}

impl Fold {
    pub fn contains(&self, position: usize) -> bool {
        self.test.contains(&position)
    }

    /// Every position in `0..len` that is not in the test set.
    pub fn training(&self, len: usize) -> Vec<usize> {
        (0..len).filter(|position| !self.contains(*position)).collect()
    }
}

/// Split positions `0..len` into `fold_count` folds in list order.
pub fn partition(len: usize, fold_count: usize) -> Result<Vec<Fold>, PartitionError> {
    let order: Vec<usize> = (0..len).collect();
    partition_order(&order, fold_count)
}

/// Split the positions in `order` into folds, consuming them front to back.
pub fn partition_order(order: &[usize], fold_count: usize) -> Result<Vec<Fold>, PartitionError> {
    if fold_count == 0 {
        return Err(PartitionError::ZeroFolds);
    }
    let base = order.len() / fold_count;
    let remainder = order.len() % fold_count;
    let mut folds = Vec::with_capacity(fold_count);
    let mut cursor = 0usize;
    for index in 0..fold_count {
        let quota = if index < remainder { base + 1 } else { base };
        folds.push(Fold {
            index,
            test: order[cursor..cursor + quota].to_vec(),
        });
        cursor += quota;
    }
    Ok(folds)
}

/// Deterministic permutation of `keys` derived from `seed` and `class_id`.
///
/// Each key is hashed as `seed|class|key`; positions are ordered by hash, ties by
/// original position.
pub fn shuffled_order<K: AsRef<str>>(class_id: &str, keys: &[K], seed: &str) -> Vec<usize> {
    let mut keyed: Vec<(u128, usize)> = keys
        .iter()
        .enumerate()
        .map(|(position, key)| {
            let hash = blake3::hash(format!("{seed}|{class_id}|{}", key.as_ref()).as_bytes());
            let mut prefix = [0u8; 16];
            prefix.copy_from_slice(&hash.as_bytes()[0..16]);
            (u128::from_le_bytes(prefix), position)
        })
        .collect();
    keyed.sort();
    keyed.into_iter().map(|(_, position)| position).collect()
}

/// Partition every class independently.
///
/// `key` names an item for seeded shuffling; without a seed items keep their list
/// order (the loader sorts them by path).
pub fn stratify<T>(
    classes: &BTreeMap<String, Vec<T>>,
    fold_count: usize,
    seed: Option<&str>,
    key: impl Fn(&T) -> String,
) -> Result<BTreeMap<String, Vec<Fold>>, PartitionError> {
    let mut folds = BTreeMap::new();
    for (class_id, items) in classes {
        let order = match seed {
            Some(seed) => {
                let keys: Vec<String> = items.iter().map(&key).collect();
                shuffled_order(class_id, &keys, seed)
            }
            None => (0..items.len()).collect(),
        };
        folds.insert(class_id.clone(), partition_order(&order, fold_count)?);
    }
    Ok(folds)
}
