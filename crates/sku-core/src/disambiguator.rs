//! Column renaming so that columns from different sources never collide

use crate::table::Table;

/// Prefix every non-key column with `"{source}_"`
///
/// Every non-key column is renamed regardless of its current text, so two
/// distinct names stay distinct. The table records which source renamed it
/// and a second call with that same source is a no-op.
pub fn disambiguate(table: &mut Table, source: &str, key_column: &str) {
    if table.disambiguated_by.as_deref() == Some(source) {
        return;
    }

    let prefix = format!("{}_", source);
    for column in table.columns.iter_mut() {
        if column.name != key_column {
            column.name = format!("{}{}", prefix, column.name);
        }
    }
    table.disambiguated_by = Some(source.to_string());
}
