use std::iter;

use nalgebra::DMatrix;
use num::rational::Ratio;
use num::{BigInt, BigRational, Integer, One, ToPrimitive, Zero};

use crate::error::SolveError;
use crate::machine::Machine;

// -----------------------------------------------------------------------------
// Exact Elimination
// -----------------------------------------------------------------------------

/// Augmented matrix `[A | b]` over the rationals: one row per counter, one
/// column per button plus the targets. Owned by a single solve.
struct JoltageSystem {
    matrix: DMatrix<BigRational>,
    num_vars: usize,
    /// Pivot column of each row, `None` for rows left without one
    row_to_pivot: Vec<Option<usize>>,
}

impl JoltageSystem {
    fn new(machine: &Machine) -> Self {
        let num_eqs = machine.jolts().len();
        let num_vars = machine.buttons().len();

        let mut matrix = DMatrix::from_element(num_eqs, num_vars + 1, BigRational::zero());
        for (c, button) in machine.buttons().iter().enumerate() {
            for &r in button {
                matrix[(r, c)] = BigRational::one();
            }
        }
        for (r, &target) in machine.jolts().iter().enumerate() {
            matrix[(r, num_vars)] = BigRational::from_integer(BigInt::from(target));
        }

        Self {
            matrix,
            num_vars,
            row_to_pivot: vec![None; num_eqs],
        }
    }

    /// Gauss-Jordan elimination with normalized pivot rows.
    ///
    /// Fails when a row reduces to `0 = c` with `c != 0`.
    fn rref(&mut self) -> Result<(), SolveError> {
        let num_eqs = self.matrix.nrows();
        let rhs = self.num_vars;
        let mut pivot_row = 0;

        for c in 0..self.num_vars {
            if pivot_row >= num_eqs {
                break;
            }

            let Some(r) = (pivot_row..num_eqs).find(|&r| !self.matrix[(r, c)].is_zero()) else {
                continue;
            };
            self.matrix.swap_rows(pivot_row, r);

            let pivot = self.matrix[(pivot_row, c)].clone();
            for k in c..=rhs {
                let scaled = &self.matrix[(pivot_row, k)] / &pivot;
                self.matrix[(pivot_row, k)] = scaled;
            }

            for i in 0..num_eqs {
                if i == pivot_row {
                    continue;
                }
                let factor = self.matrix[(i, c)].clone();
                if factor.is_zero() {
                    continue;
                }
                for k in c..=rhs {
                    let delta = &factor * &self.matrix[(pivot_row, k)];
                    self.matrix[(i, k)] -= delta;
                }
            }

            self.row_to_pivot[pivot_row] = Some(c);
            pivot_row += 1;
        }

        // Rows past the last pivot have no coefficients left.
        if (pivot_row..num_eqs).any(|r| !self.matrix[(r, rhs)].is_zero()) {
            return Err(SolveError::InconsistentJoltage);
        }

        Ok(())
    }

    fn free_columns(&self) -> Vec<usize> {
        let mut bound = vec![false; self.num_vars];
        for &c in self.row_to_pivot.iter().flatten() {
            bound[c] = true;
        }
        (0..self.num_vars).filter(|&c| !bound[c]).collect()
    }

    /// Clears the denominators of every pivot row so the search can work on
    /// integers while staying exact.
    fn pivot_rows(&self, free: &[usize]) -> Result<Vec<PivotRow>, SolveError> {
        self.row_to_pivot
            .iter()
            .enumerate()
            .filter_map(|(r, pivot)| pivot.map(|pivot| (r, pivot)))
            .map(|(r, pivot)| self.pivot_row(r, pivot, free))
            .collect()
    }

    fn pivot_row(&self, r: usize, pivot: usize, free: &[usize]) -> Result<PivotRow, SolveError> {
        let entries: Vec<(usize, &BigRational)> = free
            .iter()
            .enumerate()
            .map(|(slot, &c)| (slot, &self.matrix[(r, c)]))
            .filter(|(_, coeff)| !coeff.is_zero())
            .collect();
        let rhs = &self.matrix[(r, self.num_vars)];

        let denom = entries
            .iter()
            .map(|(_, coeff)| coeff.denom())
            .chain(iter::once(rhs.denom()))
            .fold(BigInt::one(), |acc, d| acc.lcm(d));

        let scale = |value: &BigRational| {
            (value.numer() * (&denom / value.denom()))
                .to_i128()
                .ok_or(SolveError::Overflow)
        };

        let terms = entries
            .iter()
            .map(|&(slot, coeff)| scale(coeff).map(|scaled| (slot, scaled)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PivotRow {
            pivot,
            denom: denom.to_i128().ok_or(SolveError::Overflow)?,
            terms,
            rhs: scale(rhs)?,
        })
    }
}

/// `denom * x[pivot] + sum(coeff * free[slot]) = rhs`, with `denom > 0`.
#[derive(Debug)]
struct PivotRow {
    pivot: usize,
    denom: i128,
    /// Non-zero coefficients keyed by position in the free column list.
    terms: Vec<(usize, i128)>,
    rhs: i128,
}

impl PivotRow {
    /// Exact value of the pivot variable once every free variable is fixed.
    fn value(&self, free_values: &[u64]) -> Ratio<i128> {
        let remaining = self
            .terms
            .iter()
            .fold(self.rhs, |acc, &(slot, coeff)| {
                acc - coeff * free_values[slot] as i128
            });
        Ratio::new(remaining, self.denom)
    }
}

/// A press count, if `value` is a non-negative integer.
fn as_presses(value: &Ratio<i128>) -> Option<u64> {
    if value.is_integer() {
        u64::try_from(*value.numer()).ok()
    } else {
        None
    }
}

/// Upper bound on the presses of each button: the smallest target among the
/// counters it feeds. A button wired to nothing is never worth pressing.
pub fn capacities(machine: &Machine) -> Vec<u64> {
    machine
        .buttons()
        .iter()
        .map(|button| {
            button
                .iter()
                .map(|&i| machine.jolts()[i])
                .min()
                .unwrap_or(0)
        })
        .collect()
}

// -----------------------------------------------------------------------------
// Unique Solution
// -----------------------------------------------------------------------------

fn evaluate(rows: &[PivotRow], caps: &[u64]) -> Result<Vec<u64>, SolveError> {
    let mut presses = vec![0; caps.len()];

    for row in rows {
        let value = row.value(&[]);
        let count = as_presses(&value).ok_or_else(|| SolveError::NonInteger {
            button: row.pivot,
            value: value.to_string(),
        })?;
        if count > caps[row.pivot] {
            return Err(SolveError::BoundExceeded {
                button: row.pivot,
                presses: count,
                bound: caps[row.pivot],
            });
        }
        presses[row.pivot] = count;
    }

    Ok(presses)
}

// -----------------------------------------------------------------------------
// Bounded Search over Free Buttons
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Best {
    total: u64,
    presses: Vec<u64>,
}

struct Search<'a> {
    rows: &'a [PivotRow],
    free: &'a [usize],
    caps: &'a [u64],
}

impl Search<'_> {
    /// Tries every completion of `prefix` (values of the first `prefix.len()`
    /// free buttons, summing to `sum`) and returns whichever of `best` and the
    /// completions has the fewest presses.
    fn descend(&self, prefix: &[u64], sum: u64, mut best: Option<Best>) -> Option<Best> {
        if prefix.len() == self.free.len() {
            return match self.complete(prefix, sum, best.as_ref()) {
                Some(found) => {
                    tracing::trace!(total = found.total, "improved joltage assignment");
                    Some(found)
                }
                None => best,
            };
        }

        let slot = prefix.len();
        let mut next = prefix.to_vec();
        next.push(0);

        for v in 0..=self.caps[self.free[slot]] {
            let partial = sum + v;
            // Values only grow from here on.
            if best.as_ref().is_some_and(|b| partial >= b.total) {
                break;
            }
            next[slot] = v;
            if !self.feasible(&next) {
                continue;
            }
            best = self.descend(&next, partial, best);
        }

        best
    }

    /// Interval check: with the unassigned free buttons anywhere in
    /// `[0, capacity]`, can every pivot still land in `[0, capacity]`?
    ///
    /// Only prunes; `complete` re-checks every value exactly.
    fn feasible(&self, assigned: &[u64]) -> bool {
        self.rows.iter().all(|row| {
            let (mut lo, mut hi) = (row.rhs, row.rhs);
            for &(slot, coeff) in &row.terms {
                match assigned.get(slot) {
                    Some(&v) => {
                        let term = coeff * v as i128;
                        lo -= term;
                        hi -= term;
                    }
                    None => {
                        let term = coeff * self.caps[self.free[slot]] as i128;
                        if coeff > 0 {
                            lo -= term;
                        } else {
                            hi -= term;
                        }
                    }
                }
            }

            // denom * x[pivot] lies in [lo, hi]
            let cap = self.caps[row.pivot] as i128 * row.denom;
            lo <= hi && hi >= 0 && lo <= cap
        })
    }

    /// Back-substitutes a full assignment; `None` unless it is valid and beats `best`.
    fn complete(&self, free_values: &[u64], sum: u64, best: Option<&Best>) -> Option<Best> {
        let mut presses = vec![0; self.caps.len()];
        for (&col, &v) in self.free.iter().zip(free_values) {
            presses[col] = v;
        }

        let mut total = sum;
        for row in self.rows {
            let count = as_presses(&row.value(free_values))?;
            if count > self.caps[row.pivot] {
                return None;
            }
            total += count;
            if best.is_some_and(|b| total >= b.total) {
                return None;
            }
            presses[row.pivot] = count;
        }

        Some(Best { total, presses })
    }
}

// -----------------------------------------------------------------------------
// Entry Points
// -----------------------------------------------------------------------------

/// Press counts per button, with the fewest total presses, that drive every
/// counter exactly to its target.
#[tracing::instrument(skip_all, fields(counters = machine.jolts().len(), buttons = machine.buttons().len()))]
pub fn solve(machine: &Machine) -> Result<Vec<u64>, SolveError> {
    if machine.jolts().is_empty() {
        return Ok(vec![0; machine.buttons().len()]);
    }

    let mut system = JoltageSystem::new(machine);
    system.rref()?;

    let caps = capacities(machine);
    let free = system.free_columns();
    let rows = system.pivot_rows(&free)?;
    tracing::debug!(rank = rows.len(), free = free.len(), "reduced joltage system");

    if free.is_empty() {
        return evaluate(&rows, &caps);
    }

    let search = Search {
        rows: &rows,
        free: &free,
        caps: &caps,
    };
    search
        .descend(&[], 0, None)
        .map(|best| best.presses)
        .ok_or(SolveError::Infeasible)
}

/// Fewest total presses that reach the joltage targets.
pub fn min_presses(machine: &Machine) -> Result<u64, SolveError> {
    solve(machine).map(|presses| presses.iter().sum())
}
