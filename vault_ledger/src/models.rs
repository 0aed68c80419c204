//! Diesel models mapping to the ledger schema.
//!
//! These types mirror the tables defined in the embedded migrations and in
//! [`crate::schema`] for use with Diesel's Queryable/Insertable APIs:
//! - [`crate::schema::bar_history`] — every bar ever seen per fund, with its
//!   latest attributes and presence bookkeeping
//! - [`crate::schema::snapshot_log`] — append-only log of recorded snapshots
//!
//! See the migrations for constraints (`UNIQUE (fund, serial)`,
//! `UNIQUE (fund, snapshot_date)`, `status` CHECK).

use diesel::prelude::*;

use crate::schema::*;

/// A row in [`crate::schema::bar_history`]: one bar's lifetime record for a
/// fund.
///
/// Used for SELECT/UPDATE operations (Queryable, Identifiable, AsChangeset,
/// Selectable).
#[derive(Debug, Clone, Queryable, Identifiable, AsChangeset, Selectable)]
#[diesel(table_name = bar_history, check_for_backend(diesel::sqlite::Sqlite))]
pub struct BarHistoryRow {
    /// Database primary key (SQLite INTEGER PRIMARY KEY rowid).
    pub id: i32,
    /// Fund identifier (e.g., "invesco").
    pub fund: String,
    /// Canonical bar serial number.
    pub serial: String,
    /// Refiner/brand mark, latest seen.
    pub brand: String,
    /// Vault/location code, latest seen.
    pub vault: String,
    /// Fine weight in troy ounces, stored as decimal text to keep it exact.
    pub weight_oz: String,
    /// First snapshot date (YYYY-MM-DD) this bar appeared on.
    pub first_seen: String,
    /// Most recent snapshot date (YYYY-MM-DD) this bar appeared on.
    pub last_seen: String,
    /// How many recorded snapshots included this bar.
    pub appearances: i32,
    /// How many times the bar came back after being marked removed.
    pub re_entries: i32,
    /// Presence state: "present" | "removed".
    pub status: String,
}

/// Insertable form of [`BarHistoryRow`] for first sightings.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bar_history)]
pub struct NewBarHistoryRow<'a> {
    /// Fund identifier.
    pub fund: &'a str,
    /// Canonical bar serial number.
    pub serial: &'a str,
    /// Refiner/brand mark.
    pub brand: &'a str,
    /// Vault/location code.
    pub vault: &'a str,
    /// Fine weight in troy ounces as decimal text.
    pub weight_oz: String,
    /// First snapshot date (YYYY-MM-DD).
    pub first_seen: String,
    /// Most recent snapshot date (YYYY-MM-DD).
    pub last_seen: String,
    /// Snapshot count at insert time (always 1).
    pub appearances: i32,
    /// Re-entry count at insert time (always 0).
    pub re_entries: i32,
    /// Presence state at insert time (always "present").
    pub status: &'a str,
}

/// A row in [`crate::schema::snapshot_log`]: one recorded snapshot.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = snapshot_log, check_for_backend(diesel::sqlite::Sqlite))]
pub struct SnapshotLogRow {
    /// Database primary key.
    pub id: i32,
    /// Fund identifier.
    pub fund: String,
    /// Snapshot date (YYYY-MM-DD).
    pub snapshot_date: String,
    /// Number of bars recorded for that snapshot.
    pub bar_count: i32,
}

/// Insertable form of [`SnapshotLogRow`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = snapshot_log)]
pub struct NewSnapshotLogRow<'a> {
    /// Fund identifier.
    pub fund: &'a str,
    /// Snapshot date (YYYY-MM-DD).
    pub snapshot_date: String,
    /// Number of bars recorded for that snapshot.
    pub bar_count: i32,
}
