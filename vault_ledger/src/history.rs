//! Persistent bar history: every bar ever seen per fund.
//!
//! ## What this does
//! - Loads the previously recorded snapshot so the reconciler can compare
//!   against it (the reconciler itself stays a pure function; this module
//!   owns the cross-run state).
//! - Merges a new snapshot into the ledger: upserts current bars, marks
//!   absentees `removed`, counts re-entries, and appends to the run log.
//!
//! ## Transactions & consistency
//! A snapshot merge runs inside a single **`BEGIN IMMEDIATE`** transaction
//! via `SqliteConnection::immediate_transaction`. This reduces `SQLITE_BUSY`
//! surprises and ensures the whole snapshot is recorded or none of it.
//!
//! ## Repeats
//! Re-recording an already-recorded `(fund, date)` is a no-op: the delta
//! comes back flagged `is_repeat` and nothing is written.

use std::collections::BTreeMap;

use anyhow::Context;
use barlist_engine::models::bar::BarRecord;
use chrono::NaiveDate;
use diesel::SqliteConnection;
use diesel::prelude::*;
use rust_decimal::Decimal;

use crate::delta::{BarSummary, SnapshotDelta, VaultTransfer};
use crate::models::{BarHistoryRow, NewBarHistoryRow, NewSnapshotLogRow};

const STATUS_PRESENT: &str = "present";
const STATUS_REMOVED: &str = "removed";

const DATE_FMT: &str = "%Y-%m-%d";

/// The most recent snapshot date recorded for `fund`, if any.
pub fn last_recorded_date(
    conn: &mut SqliteConnection,
    fund_id: &str,
) -> anyhow::Result<Option<NaiveDate>> {
    use crate::schema::snapshot_log::dsl as sl;

    let latest: Option<String> = sl::snapshot_log
        .filter(sl::fund.eq(fund_id))
        .select(diesel::dsl::max(sl::snapshot_date))
        .first(conn)?;

    latest
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, DATE_FMT)
                .with_context(|| format!("bad snapshot date in ledger: {raw}"))
        })
        .transpose()
}

/// Loads the previously recorded snapshot's record set for the reconciler.
///
/// Returns `Ok(None)` when the fund has no recorded history (first run).
pub fn load_previous(
    conn: &mut SqliteConnection,
    fund_id: &str,
    provider: &str,
) -> anyhow::Result<Option<Vec<BarRecord>>> {
    use crate::schema::bar_history::dsl as bh;

    let Some(prev_date) = last_recorded_date(conn, fund_id)? else {
        return Ok(None);
    };

    let rows: Vec<BarHistoryRow> = bh::bar_history
        .filter(bh::fund.eq(fund_id).and(bh::status.eq(STATUS_PRESENT)))
        .order(bh::serial.asc())
        .load(conn)?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let weight_oz: Decimal = row
            .weight_oz
            .parse()
            .with_context(|| format!("bad weight in ledger for serial {}: {}", row.serial, row.weight_oz))?;
        records.push(BarRecord {
            serial: row.serial,
            weight_oz,
            brand: row.brand,
            vault: row.vault,
            source_provider: provider.to_string(),
            snapshot_date: prev_date,
        });
    }

    Ok(Some(records))
}

/// Merges one snapshot into the ledger and returns what changed.
///
/// Duplicate serials within `bars` collapse to their first occurrence here;
/// surfacing duplicates is the reconciler's job, not the ledger's.
pub fn record_snapshot(
    conn: &mut SqliteConnection,
    fund_id: &str,
    date: NaiveDate,
    bars: &[BarRecord],
) -> anyhow::Result<SnapshotDelta> {
    use crate::schema::bar_history::dsl as bh;
    use crate::schema::snapshot_log::dsl as sl;

    let date_str = date.format(DATE_FMT).to_string();

    conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let prev_date = last_recorded_date(conn, fund_id)?;

        let already: i64 = sl::snapshot_log
            .filter(sl::fund.eq(fund_id).and(sl::snapshot_date.eq(&date_str)))
            .count()
            .get_result(conn)?;
        if already > 0 {
            return Ok(SnapshotDelta::repeat(date, prev_date, bars.len()));
        }

        let history_rows: Vec<BarHistoryRow> =
            bh::bar_history.filter(bh::fund.eq(fund_id)).load(conn)?;
        let mut history: BTreeMap<&str, &BarHistoryRow> = BTreeMap::new();
        for row in &history_rows {
            history.insert(row.serial.as_str(), row);
        }

        let mut current: BTreeMap<&str, &BarRecord> = BTreeMap::new();
        for bar in bars {
            current.entry(bar.serial.as_str()).or_insert(bar);
        }

        let mut delta = SnapshotDelta {
            snapshot_date: Some(date),
            prev_date,
            is_first_snapshot: prev_date.is_none(),
            total_current: current.len(),
            ..SnapshotDelta::default()
        };

        for (serial, bar) in &current {
            match history.get(serial) {
                None => {
                    delta.added.insert(summary_of(bar));
                }
                Some(row) if row.status == STATUS_PRESENT => {
                    if row.vault != bar.vault {
                        delta.transfers.insert(VaultTransfer {
                            serial: (*serial).to_string(),
                            from_vault: row.vault.clone(),
                            to_vault: bar.vault.clone(),
                        });
                    } else {
                        delta.unchanged += 1;
                    }
                }
                Some(_) => {
                    delta.returned.insert(summary_of(bar));
                }
            }
        }

        for row in &history_rows {
            if row.status == STATUS_PRESENT && !current.contains_key(row.serial.as_str()) {
                delta.removed.insert(BarSummary {
                    serial: row.serial.clone(),
                    brand: row.brand.clone(),
                    vault: row.vault.clone(),
                    weight_oz: row.weight_oz.parse().unwrap_or(Decimal::ZERO),
                });
            }
        }

        // Apply: upsert current bars, then flip absentees to removed.
        for (serial, bar) in &current {
            match history.get(serial) {
                Some(row) => {
                    let was_removed = row.status == STATUS_REMOVED;
                    diesel::update(bh::bar_history.filter(bh::id.eq(row.id)))
                        .set((
                            bh::brand.eq(&bar.brand),
                            bh::vault.eq(&bar.vault),
                            bh::weight_oz.eq(bar.weight_oz.to_string()),
                            bh::last_seen.eq(&date_str),
                            bh::appearances.eq(row.appearances + 1),
                            bh::re_entries.eq(row.re_entries + i32::from(was_removed)),
                            bh::status.eq(STATUS_PRESENT),
                        ))
                        .execute(conn)?;
                }
                None => {
                    diesel::insert_into(bh::bar_history)
                        .values(NewBarHistoryRow {
                            fund: fund_id,
                            serial: *serial,
                            brand: &bar.brand,
                            vault: &bar.vault,
                            weight_oz: bar.weight_oz.to_string(),
                            first_seen: date_str.clone(),
                            last_seen: date_str.clone(),
                            appearances: 1,
                            re_entries: 0,
                            status: STATUS_PRESENT,
                        })
                        .execute(conn)?;
                }
            }
        }

        for row in &history_rows {
            if row.status == STATUS_PRESENT && !current.contains_key(row.serial.as_str()) {
                diesel::update(bh::bar_history.filter(bh::id.eq(row.id)))
                    .set(bh::status.eq(STATUS_REMOVED))
                    .execute(conn)?;
            }
        }

        diesel::insert_into(sl::snapshot_log)
            .values(NewSnapshotLogRow {
                fund: fund_id,
                snapshot_date: date_str.clone(),
                bar_count: current.len() as i32,
            })
            .execute(conn)?;

        Ok(delta)
    })
}

/// Bars currently flagged with re-entry history for `fund`.
pub fn reentry_counts(
    conn: &mut SqliteConnection,
    fund_id: &str,
) -> anyhow::Result<Vec<(String, i32)>> {
    use crate::schema::bar_history::dsl as bh;

    let rows: Vec<(String, i32)> = bh::bar_history
        .filter(bh::fund.eq(fund_id).and(bh::re_entries.gt(0)))
        .order(bh::serial.asc())
        .select((bh::serial, bh::re_entries))
        .load(conn)?;
    Ok(rows)
}

/// Deletes all ledger rows for `fund`. Returns how many bar rows went away.
pub fn reset_fund(conn: &mut SqliteConnection, fund_id: &str) -> anyhow::Result<usize> {
    use crate::schema::bar_history::dsl as bh;
    use crate::schema::snapshot_log::dsl as sl;

    conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let bars = diesel::delete(bh::bar_history.filter(bh::fund.eq(fund_id))).execute(conn)?;
        diesel::delete(sl::snapshot_log.filter(sl::fund.eq(fund_id))).execute(conn)?;
        Ok(bars)
    })
}

fn summary_of(bar: &BarRecord) -> BarSummary {
    BarSummary {
        serial: bar.serial.clone(),
        brand: bar.brand.clone(),
        vault: bar.vault.clone(),
        weight_oz: bar.weight_oz,
    }
}
