use bitvec::prelude::*;

use crate::error::SolveError;
use crate::machine::Machine;

/// A bit vector backed by `usize` words with Least Significant Bit first ordering.
pub type Row = BitVec<usize, Lsb0>;

/// Largest nullity the coset enumeration will walk (2^32 candidates).
pub const MAX_FREE_BUTTONS: usize = 32;

/// Augmented system `[A | b]` over GF(2): one row per light, one column per button.
struct LightSystem {
    matrix: Vec<Row>,
    num_vars: usize,
    /// Maps column index (variable) to pivot row index
    col_to_pivot: Vec<Option<usize>>,
    /// Pivot column of each row, `None` for rows left without one
    row_to_pivot: Vec<Option<usize>>,
}

impl LightSystem {
    fn new(machine: &Machine) -> Self {
        let num_eqs = machine.lights().len();
        let num_vars = machine.buttons().len();

        let mut matrix = vec![Row::repeat(false, num_vars + 1); num_eqs];

        // A: button c toggles light r
        for (c, button) in machine.buttons().iter().enumerate() {
            for &r in button {
                matrix[r].set(c, true);
            }
        }
        // b: augmented column
        for (row, &on) in matrix.iter_mut().zip(machine.lights()) {
            row.set(num_vars, on);
        }

        Self {
            matrix,
            num_vars,
            col_to_pivot: vec![None; num_vars],
            row_to_pivot: vec![None; num_eqs],
        }
    }

    /// Gaussian elimination into Reduced Row Echelon Form.
    ///
    /// Fails when a row without a pivot still asks for an odd parity (0 = 1).
    fn rref(&mut self) -> Result<(), SolveError> {
        let num_eqs = self.matrix.len();
        let mut pivot_row = 0;

        for c in 0..self.num_vars {
            if pivot_row >= num_eqs {
                break;
            }

            let Some(r) = (pivot_row..num_eqs).find(|&r| self.matrix[r][c]) else {
                continue;
            };

            self.matrix.swap(pivot_row, r);
            self.col_to_pivot[c] = Some(pivot_row);
            self.row_to_pivot[pivot_row] = Some(c);

            let pivot_vec = self.matrix[pivot_row].clone();

            // XOR eliminate other rows (both below AND above for RREF)
            for i in 0..num_eqs {
                if i != pivot_row && self.matrix[i][c] {
                    self.matrix[i] ^= &pivot_vec;
                }
            }
            pivot_row += 1;
        }

        let inconsistent = self.matrix[pivot_row..]
            .iter()
            .any(|row| row[self.num_vars]);
        if inconsistent {
            return Err(SolveError::InconsistentLights);
        }

        Ok(())
    }

    /// Particular solution (free variables at 0) plus a null space basis.
    fn solution_space(&self) -> (Row, Vec<Row>) {
        let mut x_p = Row::repeat(false, self.num_vars);
        for (r, pivot) in self.row_to_pivot.iter().enumerate() {
            if let Some(c) = *pivot {
                x_p.set(c, self.matrix[r][self.num_vars]);
            }
        }

        // For each free column f: x_f = 1, and every pivot whose row mentions f
        // flips to cancel it.
        let basis = (0..self.num_vars)
            .filter(|&f| self.col_to_pivot[f].is_none())
            .map(|f| {
                let mut v = Row::repeat(false, self.num_vars);
                v.set(f, true);
                for (r, pivot) in self.row_to_pivot.iter().enumerate() {
                    if let Some(c) = *pivot {
                        if self.matrix[r][f] {
                            v.set(c, true);
                        }
                    }
                }
                v
            })
            .collect();

        (x_p, basis)
    }
}

/// Walks every element of `x_p + span(basis)` in Gray code order and keeps the
/// lightest one.
fn min_weight(mut current: Row, basis: &[Row]) -> Result<Row, SolveError> {
    let k = basis.len();
    if k > MAX_FREE_BUTTONS {
        return Err(SolveError::TooManyFreeButtons {
            free: k,
            limit: MAX_FREE_BUTTONS,
        });
    }

    let mut best = current.clone();
    let mut best_weight = best.count_ones();

    let num_combinations: u64 = 1 << k;
    for i in 1..num_combinations {
        if best_weight == 0 {
            break;
        }

        // gray(i-1) and gray(i) differ in the lowest set bit of i
        let basis_idx = i.trailing_zeros() as usize;
        current ^= &basis[basis_idx];

        let weight = current.count_ones();
        if weight < best_weight {
            best_weight = weight;
            best.copy_from_bitslice(&current);
        }
    }

    Ok(best)
}

/// Returns a press vector of minimum weight (bit `j` set means press button `j`
/// once) that toggles exactly the target lights.
#[tracing::instrument(skip_all, fields(lights = machine.lights().len(), buttons = machine.buttons().len()))]
pub fn solve(machine: &Machine) -> Result<Row, SolveError> {
    if machine.lights().is_empty() {
        return Ok(Row::repeat(false, machine.buttons().len()));
    }

    let mut system = LightSystem::new(machine);
    system.rref()?;

    let (x_p, basis) = system.solution_space();
    tracing::debug!(free = basis.len(), "reduced light system");

    min_weight(x_p, &basis)
}

/// Fewest button presses that produce the target indicator pattern.
pub fn min_presses(machine: &Machine) -> Result<u64, SolveError> {
    solve(machine).map(|presses| presses.count_ones() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn machine(line: &str) -> Machine {
        line.parse().unwrap()
    }

    fn toggled(machine: &Machine, presses: &Row) -> Vec<bool> {
        let mut lights = vec![false; machine.lights().len()];
        for j in presses.iter_ones() {
            for &i in &machine.buttons()[j] {
                lights[i] = !lights[i];
            }
        }
        lights
    }

    fn brute_force(machine: &Machine) -> Option<u64> {
        let m = machine.buttons().len();
        (0u64..1 << m)
            .filter(|mask| {
                let presses: Row = (0..m).map(|j| mask >> j & 1 == 1).collect();
                toggled(machine, &presses) == machine.lights()
            })
            .map(|mask| mask.count_ones() as u64)
            .min()
    }

    #[rstest]
    #[case("[.##.] (3) (1,3) (2) (2,3) (0,2) (0,1) {3,5,4,7}", 2)]
    #[case("[...#.] (0,2,3,4) (2,3) (0,4) (0,1,2) (1,2,3,4) {7,5,12,7,2}", 3)]
    #[case("[.###.#] (0,1,2,3,4) (0,3,4) (0,1,2,4,5) (1,2) {10,11,11,5,10,5}", 2)]
    #[case("[##] (0,1) {1,1}", 1)]
    #[case("[..] (0) (1) {1,1}", 0)]
    #[case("[] (0,1) {2,2}", 0)]
    #[case("[] {}", 0)]
    fn finds_minimum_presses(#[case] line: &str, #[case] expected: u64) {
        assert_eq!(min_presses(&machine(line)).unwrap(), expected);
    }

    #[rstest]
    #[case("[.##.] (3) (1,3) (2) (2,3) (0,2) (0,1) {3,5,4,7}")]
    #[case("[...#.] (0,2,3,4) (2,3) (0,4) (0,1,2) (1,2,3,4) {7,5,12,7,2}")]
    #[case("[.###.#] (0,1,2,3,4) (0,3,4) (0,1,2,4,5) (1,2) {10,11,11,5,10,5}")]
    #[case("[####] (0,1) (1,2) (2,3) (0,3) (0,2) (1,3) {1,1,1,1}")]
    fn press_vector_reproduces_pattern_and_is_minimal(#[case] line: &str) {
        let machine = machine(line);
        let presses = solve(&machine).unwrap();

        assert_eq!(presses.len(), machine.buttons().len());
        assert_eq!(toggled(&machine, &presses), machine.lights());
        assert_eq!(Some(presses.count_ones() as u64), brute_force(&machine));
    }

    #[rstest]
    #[case("[#.] (0,1) {1,1}")]
    #[case("[#] () {1}")]
    #[case("[.#.] (0,2) (0) {1,1,1}")]
    fn unreachable_pattern_is_inconsistent(#[case] line: &str) {
        assert_eq!(
            min_presses(&machine(line)),
            Err(SolveError::InconsistentLights)
        );
    }

    #[test]
    fn guards_against_huge_null_spaces() {
        let basis = vec![Row::repeat(false, 1); MAX_FREE_BUTTONS + 1];
        let err = min_weight(Row::repeat(true, 1), &basis).unwrap_err();
        assert_eq!(
            err,
            SolveError::TooManyFreeButtons {
                free: MAX_FREE_BUTTONS + 1,
                limit: MAX_FREE_BUTTONS
            }
        );
    }
}
