//! Index field names the query builder and dispatcher rely on.

/// Persistent identifier of a record.
pub const PI: &str = "PI";
/// `true` on top-level work records.
pub const IS_WORK: &str = "ISWORK";
/// `true` on anchor (multi-volume parent) records.
pub const IS_ANCHOR: &str = "ISANCHOR";
/// Deletion timestamp (millis); present only on tombstones.
pub const DATE_DELETED: &str = "DATEDELETED";
/// Last update timestamp (millis); the field date windows are applied to.
pub const DATE_UPDATED: &str = "DATEUPDATED";
/// Primary classification; the default target of `set` parameters.
pub const PRIMARY_CLASSIFICATION: &str = "DC";

/// Prefix shared by absolute date fields. Conditions that reference such a
/// field keep the year placeholder untouched.
pub const ABSOLUTE_DATE_PREFIX: &str = "DATE_";
