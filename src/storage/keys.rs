//! Storage key builders.
//!
//! Every persisted blob lives under `<prefix>_<projectId>[_<location>]`, so
//! one project's fields and each of its photo locations are independent
//! entries.

/// Key of the field blob for one form instance.
pub fn field_blob_key(prefix: &str, project_id: &str) -> String {
    format!("{}_{}", prefix, project_id)
}

/// Key of the photo blob for one (form instance, location) pair.
pub fn photo_blob_key(prefix: &str, project_id: &str, location_id: &str) -> String {
    format!("{}_{}_{}", prefix, project_id, location_id)
}

/// Field id of a saved table-row bundle.
pub fn table_row_key(table_id: &str, row: usize) -> String {
    format!("{}_row_{}", table_id, row)
}

/// Field id of one grid cell.
pub fn table_cell_key(table_id: &str, row: usize, col: usize) -> String {
    format!("{}_row{}_col{}", table_id, row, col)
}
