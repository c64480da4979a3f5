//! Weight normalization to a fixed total of 100.
//!
//! # Responsibility
//! - Rescale non-negative integer weights so they sum to exactly 100.
//!
//! # Invariants
//! - Output order and ids match the input.
//! - Inputs totalling 0 or 100 are returned unchanged.
//! - Ties between equal remainders go to the earlier input position.

use serde::{Deserialize, Serialize};

/// Target sum produced by `normalize_to_100`.
pub const NORMALIZED_TOTAL: u64 = 100;

/// One weighted entry, e.g. a control's share of a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedItem<Id> {
    pub id: Id,
    pub weight: u32,
}

impl<Id> WeightedItem<Id> {
    pub fn new(id: Id, weight: u32) -> Self {
        Self { id, weight }
    }
}

/// Rescales weights to sum to 100 using the largest remainder method.
///
/// Each weight is scaled by `100 / total` and floored; the leftover units go
/// one each to the items with the largest fractional parts. Fractions are
/// compared as the exact integer remainder `weight * 100 mod total`.
pub fn normalize_to_100<Id: Clone>(items: &[WeightedItem<Id>]) -> Vec<WeightedItem<Id>> {
    let total: u64 = items.iter().map(|item| u64::from(item.weight)).sum();
    if total == 0 || total == NORMALIZED_TOTAL {
        return items.to_vec();
    }

    let mut floors = Vec::with_capacity(items.len());
    let mut remainders = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let scaled = u64::from(item.weight) * NORMALIZED_TOTAL;
        floors.push(scaled / total);
        remainders.push((index, scaled % total));
    }

    let assigned: u64 = floors.iter().sum();
    let leftover = NORMALIZED_TOTAL.saturating_sub(assigned);

    // sort_by is stable: equal remainders keep input order
    remainders.sort_by(|left, right| right.1.cmp(&left.1));
    for &(index, _) in remainders.iter().take(leftover as usize) {
        floors[index] += 1;
    }

    items
        .iter()
        .zip(floors)
        .map(|(item, weight)| WeightedItem {
            id: item.id.clone(),
            // every floor is bounded by NORMALIZED_TOTAL
            weight: weight as u32,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{normalize_to_100, WeightedItem};

    fn items(weights: &[u32]) -> Vec<WeightedItem<usize>> {
        weights
            .iter()
            .enumerate()
            .map(|(id, &weight)| WeightedItem::new(id + 1, weight))
            .collect()
    }

    fn weights_of(items: &[WeightedItem<usize>]) -> Vec<u32> {
        items.iter().map(|item| item.weight).collect()
    }

    #[test]
    fn three_equal_weights_give_first_item_the_extra_unit() {
        let normalized = normalize_to_100(&items(&[1, 1, 1]));
        assert_eq!(weights_of(&normalized), vec![34, 33, 33]);
    }

    #[test]
    fn already_normalized_input_is_unchanged() {
        let input = items(&[60, 25, 15]);
        assert_eq!(normalize_to_100(&input), input);
    }

    #[test]
    fn zero_total_is_unchanged() {
        let input = items(&[0, 0]);
        assert_eq!(normalize_to_100(&input), input);
    }

    #[test]
    fn empty_input_is_unchanged() {
        assert!(normalize_to_100::<usize>(&[]).is_empty());
    }

    #[test]
    fn largest_remainder_receives_leftover() {
        // 200/700 -> 28.57, 300/700 -> 42.86, 200/700 -> 28.57
        let normalized = normalize_to_100(&items(&[200, 300, 200]));
        assert_eq!(weights_of(&normalized), vec![29, 43, 28]);
    }

    #[test]
    fn sums_to_100_and_preserves_ids() {
        let cases: &[&[u32]] = &[
            &[1],
            &[3, 7],
            &[1, 2, 3, 4, 5, 6],
            &[999, 1, 1],
            &[1000, 1000, 1000, 1000, 1000, 1000, 1000],
            &[0, 5, 0, 5],
            &[u32::MAX, u32::MAX, 1],
        ];
        for weights in cases {
            let input = items(weights);
            let normalized = normalize_to_100(&input);
            let sum: u32 = normalized.iter().map(|item| item.weight).sum();
            assert_eq!(sum, 100, "weights {weights:?}");
            let ids: Vec<usize> = normalized.iter().map(|item| item.id).collect();
            let expected: Vec<usize> = input.iter().map(|item| item.id).collect();
            assert_eq!(ids, expected);
        }
    }

    #[test]
    fn zero_weights_stay_zero() {
        let normalized = normalize_to_100(&items(&[0, 3, 0, 1]));
        assert_eq!(weights_of(&normalized), vec![0, 75, 0, 25]);
    }
}
