//! Inventory aggregation over canonical bar records.
//!
//! A pure function of its input: grouping uses ordered maps and summation
//! uses exact decimal arithmetic, so two passes over the same records (in
//! any order) produce identical output. Aggregates are ephemeral — always
//! recomputed from the current snapshot, never persisted on their own.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::models::bar::BarRecord;

/// Bar count and summed weight for one group (or a whole provider list).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub bar_count: u64,
    pub total_weight_oz: Decimal,
}

impl Aggregate {
    fn add(&mut self, weight_oz: Decimal) {
        self.bar_count += 1;
        self.total_weight_oz += weight_oz;
    }
}

/// Grouping key: (vault, brand). Both sides are normalized labels, so the
/// key is always comparable.
pub type GroupKey = (String, String);

/// Per-(vault, brand) aggregates plus the provider-level total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySummary {
    pub by_group: BTreeMap<GroupKey, Aggregate>,
    pub total: Aggregate,
}

/// Groups records by (vault, brand) and sums weights exactly.
pub fn aggregate(records: &[BarRecord]) -> InventorySummary {
    let mut summary = InventorySummary::default();
    for record in records {
        summary
            .by_group
            .entry((record.vault.clone(), record.brand.clone()))
            .or_default()
            .add(record.weight_oz);
        summary.total.add(record.weight_oz);
    }
    summary
}
