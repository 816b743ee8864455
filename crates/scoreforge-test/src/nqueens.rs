//! N-Queens fixtures.
//!
//! One queen per column; the `row` planning variable is the only thing that
//! moves.
//!
//! ```
//! use scoreforge_test::nqueens;
//!
//! let (solution, queens) = nqueens::board(&[Some(0), Some(1), None]);
//! assert_eq!(queens.len(), 3);
//! assert_eq!(solution.len(), 3);
//! assert_eq!(nqueens::conflicts(&[0, 1, 3, 3]), 4);
//! ```

use std::sync::Arc;

use scoreforge_core::{
    Fact, FactClassDescriptor, FactId, FieldDescriptor, FieldType, SolutionDescriptor, Value,
    WorkingSolution,
};

pub const QUEEN: usize = 0;

pub const ROW: usize = 0;
pub const COLUMN: usize = 1;

pub fn descriptor() -> Arc<SolutionDescriptor> {
    let mut descriptor = SolutionDescriptor::new("NQueens");
    descriptor
        .add_class(
            FactClassDescriptor::new("Queen")
                .with_field(FieldDescriptor::planning_variable("row", FieldType::Int))
                .with_field(FieldDescriptor::new("column", FieldType::Int)),
        )
        .expect("a single class");
    Arc::new(descriptor)
}

/// A board with one queen per entry of `rows`, in column order.
pub fn board(rows: &[Option<i64>]) -> (WorkingSolution, Vec<FactId>) {
    let mut solution = WorkingSolution::new(descriptor());
    let queens = rows
        .iter()
        .enumerate()
        .map(|(column, row)| {
            let fields = vec![row.map_or(Value::None, Value::Int), Value::Int(column as i64)];
            solution
                .insert(Fact::new(QUEEN, fields))
                .expect("queen fields match the descriptor")
        })
        .collect();
    (solution, queens)
}

/// Pairs of queens sharing a row or a diagonal.
pub fn conflicts(rows: &[i64]) -> i64 {
    let mut count = 0;
    for i in 0..rows.len() {
        for j in (i + 1)..rows.len() {
            let columns = (j - i) as i64;
            let rows_apart = (rows[i] - rows[j]).abs();
            if rows_apart == 0 || rows_apart == columns {
                count += 1;
            }
        }
    }
    count
}
