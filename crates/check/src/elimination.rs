use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::mem::take;

use log::debug;
use log::trace;

use pmc_number::Value;

/// Solves the equation system `x = A x + b` by eliminating the variables one
/// by one, followed by back substitution. The rows of `A` are given by
/// `coefficients` as pairs of a column and a value, and `b` by `constants`.
///
/// The system must have a unique solution, which is the case for the
/// equations of reachability probabilities and expected rewards restricted to
/// the states that are not decided by the graph precomputations. Only field
/// operations are used, so for rational functions the solution is exact.
pub fn state_elimination<V: Value>(coefficients: Vec<Vec<(usize, V)>>, mut constants: Vec<V>) -> Vec<V> {
    let num_of_variables = constants.len();
    debug_assert_eq!(coefficients.len(), num_of_variables, "Every variable needs one equation");

    let mut rows: Vec<BTreeMap<usize, V>> = coefficients
        .into_iter()
        .map(|row| {
            let mut entries = BTreeMap::new();
            for (column, value) in row {
                add_entry(&mut entries, column, value);
            }
            entries
        })
        .collect();

    // The rows that contain a variable, excluding its own row.
    let mut occurrences: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); num_of_variables];
    for (variable, row) in rows.iter().enumerate() {
        for column in row.keys().filter(|column| **column != variable) {
            occurrences[*column].insert(variable);
        }
    }

    let mut eliminated = vec![false; num_of_variables];
    for variable in 0..num_of_variables {
        let mut row = take(&mut rows[variable]);

        // x = c x + rest is equivalent to x = rest / (1 - c).
        if let Some(self_loop) = row.remove(&variable) {
            // States that cannot leave their own row are excluded by the graph precomputation.
            debug_assert!(!self_loop.is_one(), "Variable {variable} only depends on itself");
            let factor = V::one().div(&V::one().sub(&self_loop));
            for value in row.values_mut() {
                *value = value.mul(&factor);
            }
            constants[variable] = constants[variable].mul(&factor);
        }

        eliminated[variable] = true;

        // Substitute the equation into the equations of the remaining variables.
        for other in take(&mut occurrences[variable]) {
            if eliminated[other] {
                continue;
            }

            let Some(coefficient) = rows[other].remove(&variable) else {
                // The entry was cancelled out.
                continue;
            };

            for (column, value) in &row {
                add_entry(&mut rows[other], *column, coefficient.mul(value));
                if *column != other {
                    occurrences[*column].insert(other);
                }
            }

            let update = coefficient.mul(&constants[variable]);
            constants[other] = constants[other].add(&update);
        }

        trace!("Eliminated variable {variable}, its equation has {} entries", row.len());
        rows[variable] = row;
    }

    // The equation of every variable now only refers to variables that were eliminated later.
    let mut solution = vec![V::zero(); num_of_variables];
    for variable in (0..num_of_variables).rev() {
        let mut value = constants[variable].clone();
        for (column, coefficient) in &rows[variable] {
            debug_assert!(*column > variable, "Back substitution requires an upper triangular system");
            value = value.add(&coefficient.mul(&solution[*column]));
        }

        solution[variable] = value;
    }

    debug!("Solved an equation system with {num_of_variables} variables by state elimination");
    solution
}

/// Adds the value to the given entry of the row, removing it when it becomes zero.
fn add_entry<V: Value>(row: &mut BTreeMap<usize, V>, column: usize, value: V) {
    match row.get_mut(&column) {
        Some(entry) => {
            *entry = entry.add(&value);
            if entry.is_zero() {
                row.remove(&column);
            }
        }
        None => {
            if !value.is_zero() {
                row.insert(column, value);
            }
        }
    }
}
