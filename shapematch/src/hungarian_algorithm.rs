use crate::error::{Result, ShapeMatchError};
use crate::matrix::Matrix;
use log::trace;

/// A one-to-one pairing of rows with columns, as produced by
/// [`HungarianAlgorithm::solve`]. Row `i` is paired with column `columns[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    columns: Vec<usize>,
}

impl Assignment {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The column assigned to `row`.
    pub fn column_for(&self, row: usize) -> usize {
        self.columns[row]
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.columns
    }

    /// `(row, column)` pairs in row order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.columns.iter().copied().enumerate()
    }

    /// Every column appears exactly once.
    pub fn is_permutation(&self) -> bool {
        let mut seen = vec![false; self.columns.len()];
        for &c in &self.columns {
            if c >= seen.len() || seen[c] {
                return false;
            }
            seen[c] = true;
        }
        true
    }

    /// The column-to-row view of the same pairing.
    pub fn inverse(&self) -> Assignment {
        let mut rows = vec![0; self.columns.len()];
        for (r, c) in self.pairs() {
            rows[c] = r;
        }
        Assignment { columns: rows }
    }

    /// Sum of `costs[(i, columns[i])]`.
    pub fn total_cost(&self, costs: &Matrix<f64>) -> f64 {
        self.pairs().map(|(r, c)| costs[(r, c)]).sum()
    }
}

/// Minimum-cost perfect matching on a square cost matrix (Kuhn–Munkres).
///
/// The solver works on a private copy of the costs:
/// 1. Subtract each row's minimum from that row.
/// 2. Star zeros greedily, at most one per row and column.
/// 3. Cover every column holding a star. If all columns are covered, the
///    stars are the answer.
/// 4. Otherwise prime an uncovered zero. If its row holds a star, cover the
///    row and uncover the star's column. If not, walk the alternating
///    prime/star path from it, flip stars and primes along the path, clear
///    all primes and covers, and return to step 3.
/// 5. With no uncovered zero left, take the smallest uncovered value, add it
///    to every covered row and subtract it from every uncovered column, which
///    creates a new uncovered zero.
///
/// # Examples
/// ```
/// # use shapematch::matrix::Matrix;
/// # use shapematch::hungarian_algorithm::HungarianAlgorithm;
/// let costs = Matrix::from_rows(vec![
///     vec![4.0, 1.0, 3.0],
///     vec![2.0, 0.0, 5.0],
///     vec![3.0, 2.0, 2.0],
/// ]).unwrap();
/// let assignment = HungarianAlgorithm::solve(&costs).unwrap();
/// assert_eq!(assignment.as_slice(), &[1, 0, 2]);
/// assert_eq!(assignment.total_cost(&costs), 5.0);
/// ```
pub struct HungarianAlgorithm {
    costs: Matrix<f64>,
    star_in_row: Vec<Option<usize>>,
    star_in_column: Vec<Option<usize>>,
    prime_in_row: Vec<Option<usize>>,
    covered_rows: Vec<bool>,
    covered_columns: Vec<bool>,
}

impl HungarianAlgorithm {
    /// Finds the assignment of minimum total cost.
    ///
    /// # Returns
    /// - `AssignmentShape` if `costs` is not square.
    /// - `InvalidInput` if `costs` holds NaN or infinite values.
    pub fn solve(costs: &Matrix<f64>) -> Result<Assignment> {
        if !costs.is_square() {
            return Err(ShapeMatchError::AssignmentShape {
                rows: costs.rows(),
                columns: costs.cols(),
            });
        }
        if costs.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(ShapeMatchError::InvalidInput(
                "cost matrix contains non-finite values".to_string(),
            ));
        }

        let n = costs.rows();
        let mut solver = HungarianAlgorithm {
            costs: costs.clone(),
            star_in_row: vec![None; n],
            star_in_column: vec![None; n],
            prime_in_row: vec![None; n],
            covered_rows: vec![false; n],
            covered_columns: vec![false; n],
        };
        solver.reduce_rows();
        solver.star_zeros();
        solver.run();

        let columns = solver
            .star_in_row
            .iter()
            .map(|c| c.unwrap_or_default())
            .collect();
        Ok(Assignment { columns })
    }

    fn size(&self) -> usize {
        self.costs.rows()
    }

    fn reduce_rows(&mut self) {
        for r in 0..self.size() {
            let min = self.costs.row(r).into_iter().fold(f64::INFINITY, f64::min);
            for c in 0..self.size() {
                self.costs[(r, c)] -= min;
            }
        }
    }

    fn star_zeros(&mut self) {
        for r in 0..self.size() {
            for c in 0..self.size() {
                if self.costs[(r, c)] == 0.0
                    && self.star_in_row[r].is_none()
                    && self.star_in_column[c].is_none()
                {
                    self.star_in_row[r] = Some(c);
                    self.star_in_column[c] = Some(r);
                }
            }
        }
    }

    fn run(&mut self) {
        let n = self.size();
        loop {
            for c in 0..n {
                self.covered_columns[c] = self.star_in_column[c].is_some();
            }
            let covered = self.covered_columns.iter().filter(|&&c| c).count();
            trace!("hungarian: {covered}/{n} columns covered");
            if covered == n {
                return;
            }

            // Prime zeros until one can start an augmenting path.
            let (row, column) = loop {
                match self.find_uncovered_zero() {
                    None => self.make_more_zeros(),
                    Some((r, c)) => {
                        self.prime_in_row[r] = Some(c);
                        match self.star_in_row[r] {
                            Some(star_column) => {
                                self.covered_rows[r] = true;
                                self.covered_columns[star_column] = false;
                            }
                            None => break (r, c),
                        }
                    }
                }
            };
            self.augment(row, column);
        }
    }

    fn find_uncovered_zero(&self) -> Option<(usize, usize)> {
        let n = self.size();
        (0..n)
            .filter(|&r| !self.covered_rows[r])
            .flat_map(|r| (0..n).map(move |c| (r, c)))
            .find(|&(r, c)| !self.covered_columns[c] && self.costs[(r, c)] == 0.0)
    }

    /// Equivalent to adding the minimum to covered rows and subtracting it from
    /// uncovered columns, done per cell so untouched cells stay bit-exact.
    fn make_more_zeros(&mut self) {
        let n = self.size();
        let mut min = f64::INFINITY;
        for r in (0..n).filter(|&r| !self.covered_rows[r]) {
            for c in (0..n).filter(|&c| !self.covered_columns[c]) {
                min = min.min(self.costs[(r, c)]);
            }
        }
        for r in 0..n {
            for c in 0..n {
                match (self.covered_rows[r], self.covered_columns[c]) {
                    (true, true) => self.costs[(r, c)] += min,
                    (false, false) => self.costs[(r, c)] -= min,
                    _ => {}
                }
            }
        }
    }

    /// Flips stars and primes along the alternating path that starts at the
    /// primed zero `(row, column)`, then clears primes and covers.
    fn augment(&mut self, row: usize, column: usize) {
        let mut path = vec![(row, column)];
        let mut c = column;
        while let Some(r) = self.star_in_column[c] {
            path.push((r, c));
            // A starred row reached here always holds a prime.
            match self.prime_in_row[r] {
                Some(prime_column) => {
                    path.push((r, prime_column));
                    c = prime_column;
                }
                None => break,
            }
        }

        for (i, &(r, c)) in path.iter().enumerate() {
            if i % 2 == 1 {
                // Starred zero on the path: unstar.
                if self.star_in_row[r] == Some(c) {
                    self.star_in_row[r] = None;
                }
                if self.star_in_column[c] == Some(r) {
                    self.star_in_column[c] = None;
                }
            }
        }
        for &(r, c) in path.iter().step_by(2) {
            self.star_in_row[r] = Some(c);
            self.star_in_column[c] = Some(r);
        }

        self.prime_in_row.iter_mut().for_each(|p| *p = None);
        self.covered_rows.iter_mut().for_each(|c| *c = false);
        self.covered_columns.iter_mut().for_each(|c| *c = false);
    }
}
