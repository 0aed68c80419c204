//! Snapshot-to-snapshot delta: what changed in a fund's vault between two
//! recorded bar lists.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// One bar as it appears in a delta section. Ordered by serial.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BarSummary {
    pub serial: String,
    pub brand: String,
    pub vault: String,
    pub weight_oz: Decimal,
}

/// A bar that moved between vaults while staying on the list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VaultTransfer {
    pub serial: String,
    pub from_vault: String,
    pub to_vault: String,
}

/// What changed between the previously recorded snapshot and this one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDelta {
    /// The snapshot being recorded.
    pub snapshot_date: Option<NaiveDate>,
    /// The previously recorded snapshot, if any.
    pub prev_date: Option<NaiveDate>,
    /// True when the fund had no recorded history before this snapshot.
    pub is_first_snapshot: bool,
    /// True when this snapshot date was already recorded; nothing was merged.
    pub is_repeat: bool,
    /// Bars never seen before.
    pub added: BTreeSet<BarSummary>,
    /// Bars present last time, gone now.
    pub removed: BTreeSet<BarSummary>,
    /// Bars that were marked removed and have re-entered the vault.
    pub returned: BTreeSet<BarSummary>,
    /// Same bar, different vault.
    pub transfers: BTreeSet<VaultTransfer>,
    /// Bars present in both snapshots with no change.
    pub unchanged: usize,
    /// Bars in the current snapshot.
    pub total_current: usize,
}

impl SnapshotDelta {
    /// Delta for a snapshot date that was already recorded.
    pub fn repeat(date: NaiveDate, prev_date: Option<NaiveDate>, total_current: usize) -> Self {
        Self {
            snapshot_date: Some(date),
            prev_date,
            is_repeat: true,
            unchanged: total_current,
            total_current,
            ..Self::default()
        }
    }

    /// True if there is nothing added, removed, returned, or transferred.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.returned.is_empty()
            && self.transfers.is_empty()
    }
}

impl fmt::Display for SnapshotDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_repeat {
            return write!(f, "Snapshot date already recorded; no delta");
        }
        if self.is_first_snapshot {
            return write!(
                f,
                "First snapshot: {} bars recorded",
                self.total_current
            );
        }

        // helper: section header with underline
        let mut wrote_any = false;
        let mut section = |title: &str,
                           body: &mut dyn FnMut(&mut fmt::Formatter<'_>) -> fmt::Result|
         -> fmt::Result {
            if wrote_any {
                writeln!(f)?;
            }
            writeln!(f, "{title}")?;
            for _ in 0..title.len() {
                write!(f, "-")?;
            }
            writeln!(f)?;
            body(f)?;
            wrote_any = true;
            Ok(())
        };

        if !self.added.is_empty() {
            section(&format!("Bars Added ({})", self.added.len()), &mut |f| {
                for b in &self.added {
                    writeln!(f, "+ {}  {}  {} oz  {}", b.serial, b.brand, b.weight_oz, b.vault)?;
                }
                Ok(())
            })?;
        }
        if !self.removed.is_empty() {
            section(&format!("Bars Removed ({})", self.removed.len()), &mut |f| {
                for b in &self.removed {
                    writeln!(f, "- {}  {}  {} oz  {}", b.serial, b.brand, b.weight_oz, b.vault)?;
                }
                Ok(())
            })?;
        }
        if !self.returned.is_empty() {
            section(&format!("Bars Returned ({})", self.returned.len()), &mut |f| {
                for b in &self.returned {
                    writeln!(f, "~ {}  {}  {} oz  {}", b.serial, b.brand, b.weight_oz, b.vault)?;
                }
                Ok(())
            })?;
        }
        if !self.transfers.is_empty() {
            section(&format!("Vault Transfers ({})", self.transfers.len()), &mut |f| {
                for t in &self.transfers {
                    writeln!(f, "{}  {} → {}", t.serial, t.from_vault, t.to_vault)?;
                }
                Ok(())
            })?;
        }

        if !wrote_any {
            write!(f, "No changes between snapshots")
        } else {
            Ok(())
        }
    }
}
