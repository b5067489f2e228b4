//! Fixed product-code ordering
//!
//! The report lists products in a fixed order agreed with finance. The order
//! doubles as a filter: any code outside the list is dropped.

use crate::types::ProductCode;
use std::collections::HashMap;
use tracing::info;

/// Report order of the 61 reportable product codes
pub const DEFAULT_PRODUCT_ORDER: [u32; 61] = [
    756, 719, 731, 714, 464, 715, 737, 750, 725, 740, 747, 727, 739, 749, 748, //
    721, 743, 745, 744, 735, 717, 738, 692, 673, 698, 693, 699, 697, 696, 694, //
    695, 723, 746, 736, 713, 730, 728, 729, 755, 741, 724, 726, 757, 758, 732, //
    273, 425, 435, 436, 734, 733, 722, 274, 708, 709, 710, 764, 768, 766, 767, //
    487,
];

/// Total order over a closed set of product codes
#[derive(Debug, Clone)]
pub struct ProductCodeOrder {
    ranks: HashMap<u32, usize>,
}

/// Result of sorting a batch of rows
#[derive(Debug, Clone, PartialEq)]
pub struct Ordered<T> {
    pub kept: Vec<T>,
    pub dropped: usize,
}

impl Default for ProductCodeOrder {
    fn default() -> Self {
        Self::new(DEFAULT_PRODUCT_ORDER)
    }
}

impl ProductCodeOrder {
    /// Build from codes in report order; a repeated code keeps its first rank
    pub fn new(codes: impl IntoIterator<Item = u32>) -> Self {
        let mut ranks = HashMap::new();
        for code in codes {
            let next = ranks.len();
            ranks.entry(code).or_insert(next);
        }
        Self { ranks }
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn rank(&self, code: &ProductCode) -> Option<usize> {
        code.as_number().and_then(|n| self.ranks.get(&n).copied())
    }

    /// Keep only items whose code is in the set, stably sorted by rank
    pub fn sort_and_filter<T, F>(&self, items: Vec<T>, code_of: F) -> Ordered<T>
    where
        F: Fn(&T) -> Option<ProductCode>,
    {
        let before = items.len();

        let mut ranked: Vec<(usize, T)> = items
            .into_iter()
            .filter_map(|item| {
                let rank = code_of(&item).and_then(|code| self.rank(&code))?;
                Some((rank, item))
            })
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);

        let kept: Vec<T> = ranked.into_iter().map(|(_, item)| item).collect();
        let dropped = before - kept.len();
        if dropped > 0 {
            info!(
                dropped,
                kept = kept.len(),
                "Dropped rows whose product code is outside the {}-code report list",
                self.len()
            );
        }

        Ordered { kept, dropped }
    }
}
