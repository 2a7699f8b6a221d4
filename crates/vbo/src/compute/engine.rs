//! Compute engine enforcing the compute-function contract.

use crate::error::{Result, VboError};
use crate::table::DataTable;

/// Runs a compute function against the data table and commits its result
/// only if the contract was honored: exactly one new column, named as
/// requested, with the table's row count, and every existing column left
/// untouched.
///
/// The function receives a clone of the table, so a misbehaving
/// implementation can never corrupt the live data; on any violation the
/// table is left exactly as it was.
pub struct ComputeEngine;

impl ComputeEngine {
    /// Create a new compute engine.
    pub fn new() -> Self {
        Self
    }

    /// Derive and commit a new column. `compute_fn` is handed a copy of the
    /// current table and must return it with the `name` column appended.
    pub fn add_computed_column<F>(&self, table: &mut DataTable, name: &str, compute_fn: F) -> Result<()>
    where
        F: FnOnce(DataTable) -> Result<DataTable>,
    {
        if table.has_column(name) {
            return Err(VboError::DuplicateColumn(name.to_string()));
        }

        let candidate = compute_fn(table.clone())?;
        let values = validate_contract(table, name, &candidate)?;
        table.add_column(name, values)?;
        table.check_lengths()
    }
}

impl Default for ComputeEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Check the compute-function contract and extract the new column's values.
fn validate_contract(original: &DataTable, name: &str, candidate: &DataTable) -> Result<Vec<String>> {
    let contract = |message: String| VboError::ComputeContract {
        column: name.to_string(),
        message,
    };

    if candidate.column_count() != original.column_count() + 1 {
        return Err(contract(format!(
            "expected exactly one new column, had {} and got back {}",
            original.column_count(),
            candidate.column_count()
        )));
    }

    for ((orig_name, orig_values), (cand_name, cand_values)) in original.iter().zip(candidate.iter()) {
        if orig_name != cand_name {
            return Err(contract(format!(
                "existing column '{orig_name}' was replaced or reordered (found '{cand_name}')"
            )));
        }
        if orig_values != cand_values {
            return Err(contract(format!("existing column '{orig_name}' was modified")));
        }
    }

    let (new_name, new_values) = candidate.iter().last().expect("candidate has columns");
    if new_name != name {
        return Err(contract(format!("new column is named '{new_name}'")));
    }
    if new_values.len() != original.row_count() {
        return Err(contract(format!(
            "new column has {} values, expected {}",
            new_values.len(),
            original.row_count()
        )));
    }

    Ok(new_values.to_vec())
}
