//! Kuhn-Munkres minimum-cost perfect matching.
//!
//! Shortest augmenting paths with row and column potentials, O(n^3).
//! All scratch arrays are allocated per call, so the solver is a pure
//! function and safe to call from any number of threads.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

use crate::error::AssignmentError;

/// Dense n x n matrix in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareMatrix {
    n: usize,
    data: Vec<f64>,
}

impl SquareMatrix {
    pub fn from_fn(n: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                data.push(f(i, j));
            }
        }
        Self { n, data }
    }

    /// Build from rows, rejecting ragged input.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, AssignmentError> {
        let n = rows.len();
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(AssignmentError::NotSquare {
                row,
                len: r.len(),
                expected: n,
            });
        }
        Ok(Self {
            n,
            data: rows.iter().flatten().copied().collect(),
        })
    }

    /// Embed an r x c matrix in a square one of side max(r, c). Cells in
    /// the padding cost `penalty`.
    pub fn padded(rows: &[Vec<f64>], cols: usize, penalty: f64) -> Result<Self, AssignmentError> {
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(AssignmentError::NotSquare {
                row,
                len: r.len(),
                expected: cols,
            });
        }
        let n = rows.len().max(cols);
        Ok(Self::from_fn(n, |i, j| {
            rows.get(i).and_then(|r| r.get(j)).copied().unwrap_or(penalty)
        }))
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    fn check_finite(&self) -> Result<(), AssignmentError> {
        match self.data.iter().position(|c| !c.is_finite()) {
            Some(k) => Err(AssignmentError::NonFiniteCost {
                row: k / self.n,
                col: k % self.n,
            }),
            None => Ok(()),
        }
    }
}

impl Index<(usize, usize)> for SquareMatrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.n + j]
    }
}

impl IndexMut<(usize, usize)> for SquareMatrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.n + j]
    }
}

/// A perfect matching: row `i` is paired with column `row_to_col[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub row_to_col: Vec<usize>,
    /// Sum of the matched cells of the input matrix.
    pub total_cost: f64,
}

impl Assignment {
    /// Inverse permutation: the row paired with each column.
    pub fn col_to_row(&self) -> Vec<usize> {
        let mut result = vec![0; self.row_to_col.len()];
        for (i, &j) in self.row_to_col.iter().enumerate() {
            result[j] = i;
        }
        result
    }
}

/// Minimum-cost perfect matching. Ties go to the first optimum found.
pub fn solve(cost: &SquareMatrix) -> Result<Assignment, AssignmentError> {
    cost.check_finite()?;
    let n = cost.n;
    if n == 0 {
        return Ok(Assignment {
            row_to_col: vec![],
            total_cost: 0.0,
        });
    }

    // 1-based; column 0 is a virtual column holding the row being added.
    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; n + 1];
    let mut col_owner = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        col_owner[0] = row;
        let mut j0 = 0;
        let mut min_slack = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];
        loop {
            used[j0] = true;
            let i0 = col_owner[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;
            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let slack = cost[(i0 - 1, j - 1)] - u[i0] - v[j];
                if slack < min_slack[j] {
                    min_slack[j] = slack;
                    way[j] = j0;
                }
                if min_slack[j] < delta {
                    delta = min_slack[j];
                    j1 = j;
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[col_owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }
            j0 = j1;
            if col_owner[j0] == 0 {
                break;
            }
        }
        // Flip the augmenting path.
        loop {
            let j1 = way[j0];
            col_owner[j0] = col_owner[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut row_to_col = vec![0; n];
    for j in 1..=n {
        row_to_col[col_owner[j] - 1] = j - 1;
    }
    let total_cost = row_to_col
        .iter()
        .enumerate()
        .map(|(i, &j)| cost[(i, j)])
        .sum();
    Ok(Assignment {
        row_to_col,
        total_cost,
    })
}

/// Maximum-score perfect matching. `total_cost` holds the total score.
pub fn solve_max(score: &SquareMatrix) -> Result<Assignment, AssignmentError> {
    score.check_finite()?;
    let negated = SquareMatrix {
        n: score.n,
        data: score.data.iter().map(|s| -s).collect(),
    };
    let mut assignment = solve(&negated)?;
    assignment.total_cost = -assignment.total_cost;
    Ok(assignment)
}
