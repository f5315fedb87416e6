//! Optimal assignment (Kuhn–Munkres / Hungarian method).
//!
//! Solves the square assignment problem over non-negative integer costs with
//! the classical state machine: reduce, star, cover, prime, augment and
//! adjust. A solution always exists for a valid matrix; the only failure
//! modes are invalid input (returned as an error when the matrix is built)
//! and internal-consistency faults of the state machine, which panic.

use heatclust_core::error::{Error, Result};
use log::trace;

/// Scale applied to floating distances before they become integer costs.
pub const DISTANCE_SCALE: f64 = 128.0;

/// Largest entry accepted in an `n`-square matrix. Row and column
/// reductions plus `n` adjustments then stay within `i64`.
fn max_cost(n: usize) -> i64 {
    i64::MAX / (2 * n.max(1) as i64 + 2)
}

/// A validated square matrix of non-negative integer costs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CostMatrix {
    n: usize,
    data: Vec<i64>,
}

impl CostMatrix {
    /// Builds a matrix from rows.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCostMatrix`] when the rows do not form a
    /// square matrix or hold a negative or oversized entry.
    pub fn from_rows(rows: &[Vec<i64>]) -> Result<Self> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * n);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(Error::InvalidCostMatrix(format!(
                    "row {r} has {} columns, expected {n}",
                    row.len()
                )));
            }
            if let Some(c) = row.iter().position(|&v| v < 0 || v > max_cost(n)) {
                return Err(Error::InvalidCostMatrix(format!(
                    "cost {} at ({r}, {c}) outside 0..={}",
                    row[c],
                    max_cost(n)
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self { n, data })
    }

    /// Builds a square matrix from a possibly rectangular distance table.
    ///
    /// Every distance is multiplied by `scale` and truncated to an integer.
    /// Missing rows or columns are padded with zero cost, so padded slots
    /// never influence the choice among real pairs.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCostMatrix`] for ragged rows, a negative or
    /// non-finite distance, or a scaled distance too large for the
    /// potentials of the solver to stay within `i64`.
    pub fn from_distances(rows: &[Vec<f64>], scale: f64) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(r) = rows.iter().position(|row| row.len() != cols) {
            return Err(Error::InvalidCostMatrix(format!(
                "ragged distance table at row {r}"
            )));
        }
        let n = rows.len().max(cols);
        let limit = max_cost(n) as f64;
        let mut data = vec![0i64; n * n];
        for (r, row) in rows.iter().enumerate() {
            for (c, &d) in row.iter().enumerate() {
                if !d.is_finite() || d < 0.0 {
                    return Err(Error::InvalidCostMatrix(format!(
                        "distance {d} at ({r}, {c}) is not a finite non-negative value"
                    )));
                }
                let scaled = d * scale;
                if !(0.0..=limit).contains(&scaled) {
                    return Err(Error::InvalidCostMatrix(format!(
                        "scaled distance {scaled} at ({r}, {c}) exceeds {limit}"
                    )));
                }
                data[r * n + c] = scaled as i64;
            }
        }
        Ok(Self { n, data })
    }

    /// Side length.
    #[must_use]
    pub fn size(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.data[row * self.n + col]
    }

    /// Total cost of an assignment vector.
    #[must_use]
    pub fn cost_of(&self, assignment: &[usize]) -> i64 {
        assignment
            .iter()
            .enumerate()
            .map(|(row, &col)| self.get(row, col))
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Reduce,
    StarZeros,
    CoverColumns,
    PrimeZeros,
    Augment { row: usize, col: usize },
    AdjustCosts,
    Done,
}

struct Solver {
    n: usize,
    cost: Vec<i64>,
    starred: Vec<bool>,
    primed: Vec<bool>,
    row_covered: Vec<bool>,
    col_covered: Vec<bool>,
}

/// Returns `assignment` where `assignment[row]` is the column given to `row`
/// in a minimum-cost perfect matching.
///
/// # Panics
/// Panics if the state machine reaches an inconsistent state, such as a
/// second primed zero in one row before an augmentation. This signals a
/// defect in the solver, never bad input.
#[must_use]
pub fn munkres(matrix: &CostMatrix) -> Vec<usize> {
    let n = matrix.size();
    if n == 0 {
        return Vec::new();
    }
    let mut solver = Solver {
        n,
        cost: matrix.data.clone(),
        starred: vec![false; n * n],
        primed: vec![false; n * n],
        row_covered: vec![false; n],
        col_covered: vec![false; n],
    };

    let mut step = Step::Reduce;
    while step != Step::Done {
        trace!("munkres step {step:?}");
        step = match step {
            Step::Reduce => solver.reduce(),
            Step::StarZeros => solver.star_zeros(),
            Step::CoverColumns => solver.cover_columns(),
            Step::PrimeZeros => solver.prime_zeros(),
            Step::Augment { row, col } => solver.augment(row, col),
            Step::AdjustCosts => solver.adjust_costs(),
            Step::Done => Step::Done,
        };
    }

    (0..n)
        .map(|r| {
            solver
                .find_in_row(&solver.starred, r)
                .unwrap_or_else(|| panic!("munkres finished without a starred zero in row {r}"))
        })
        .collect()
}

impl Solver {
    #[inline]
    fn at(&self, r: usize, c: usize) -> usize {
        r * self.n + c
    }

    fn find_in_row(&self, marks: &[bool], row: usize) -> Option<usize> {
        (0..self.n).find(|&c| marks[self.at(row, c)])
    }

    fn find_in_col(&self, marks: &[bool], col: usize) -> Option<usize> {
        (0..self.n).find(|&r| marks[self.at(r, col)])
    }

    fn reduce(&mut self) -> Step {
        let n = self.n;
        for r in 0..n {
            let min = self.cost[r * n..(r + 1) * n].iter().copied().min().unwrap_or(0);
            for v in &mut self.cost[r * n..(r + 1) * n] {
                *v -= min;
            }
        }
        for c in 0..n {
            let min = (0..n).map(|r| self.cost[r * n + c]).min().unwrap_or(0);
            for r in 0..n {
                self.cost[r * n + c] -= min;
            }
        }
        Step::StarZeros
    }

    fn star_zeros(&mut self) -> Step {
        for r in 0..self.n {
            for c in 0..self.n {
                if self.cost[self.at(r, c)] == 0 && !self.row_covered[r] && !self.col_covered[c] {
                    let idx = self.at(r, c);
                    self.starred[idx] = true;
                    self.row_covered[r] = true;
                    self.col_covered[c] = true;
                }
            }
        }
        self.clear_covers();
        Step::CoverColumns
    }

    fn cover_columns(&mut self) -> Step {
        let mut covered = 0;
        for c in 0..self.n {
            if self.find_in_col(&self.starred, c).is_some() {
                self.col_covered[c] = true;
                covered += 1;
            }
        }
        if covered == self.n {
            Step::Done
        } else {
            Step::PrimeZeros
        }
    }

    fn prime_zeros(&mut self) -> Step {
        loop {
            let Some((r, c)) = self.find_uncovered_zero() else {
                return Step::AdjustCosts;
            };
            assert!(
                self.find_in_row(&self.primed, r).is_none(),
                "munkres: second primed zero in row {r} before augmentation"
            );
            let idx = self.at(r, c);
            self.primed[idx] = true;
            match self.find_in_row(&self.starred, r) {
                Some(star_col) => {
                    self.row_covered[r] = true;
                    self.col_covered[star_col] = false;
                }
                None => return Step::Augment { row: r, col: c },
            }
        }
    }

    fn find_uncovered_zero(&self) -> Option<(usize, usize)> {
        for r in 0..self.n {
            if self.row_covered[r] {
                continue;
            }
            for c in 0..self.n {
                if !self.col_covered[c] && self.cost[self.at(r, c)] == 0 {
                    return Some((r, c));
                }
            }
        }
        None
    }

    /// Flips the alternating path of primed and starred zeros that starts at
    /// the uncovered primed zero `(row, col)`.
    fn augment(&mut self, row: usize, col: usize) -> Step {
        let mut path = vec![(row, col)];
        let mut c = col;
        while let Some(r) = self.find_in_col(&self.starred, c) {
            path.push((r, c));
            c = self
                .find_in_row(&self.primed, r)
                .unwrap_or_else(|| panic!("munkres: starred zero at ({r}, {c}) has no primed partner"));
            path.push((r, c));
        }
        for &(r, c) in &path {
            let idx = self.at(r, c);
            self.starred[idx] = !self.starred[idx];
        }
        self.primed.iter_mut().for_each(|p| *p = false);
        self.clear_covers();
        Step::CoverColumns
    }

    fn adjust_costs(&mut self) -> Step {
        let mut min: Option<i64> = None;
        for r in 0..self.n {
            if self.row_covered[r] {
                continue;
            }
            for c in 0..self.n {
                if !self.col_covered[c] {
                    let v = self.cost[self.at(r, c)];
                    min = Some(min.map_or(v, |m| m.min(v)));
                }
            }
        }
        let min = min.unwrap_or_else(|| panic!("munkres: no uncovered cost left to adjust"));
        for r in 0..self.n {
            for c in 0..self.n {
                let idx = self.at(r, c);
                if self.row_covered[r] {
                    self.cost[idx] += min;
                }
                if !self.col_covered[c] {
                    self.cost[idx] -= min;
                }
            }
        }
        Step::PrimeZeros
    }

    fn clear_covers(&mut self) {
        self.row_covered.iter_mut().for_each(|v| *v = false);
        self.col_covered.iter_mut().for_each(|v| *v = false);
    }
}
