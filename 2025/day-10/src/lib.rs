pub mod error;
pub mod joltage;
pub mod lights;
pub mod machine;
pub mod part1;
pub mod part2;

use rayon::prelude::*;

pub use error::{Error, ParseError, ParseErrorKind, SolveError, Stage};
pub use machine::{parse_machines, Machine};

/// Sums of the per-machine minimum presses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    /// Presses to match every indicator pattern.
    pub lights: u64,
    /// Presses to reach every joltage target.
    pub joltage: u64,
}

/// Solves both halves for every machine in `input`.
///
/// The first machine that cannot be parsed or solved aborts the whole run, so
/// no partial totals are ever reported.
#[tracing::instrument(skip_all)]
pub fn solve(input: &str) -> Result<Totals, Error> {
    let machines = parse_machines(input)?;

    // Machines share nothing; collecting in input order keeps the reported
    // failure the first one.
    let solved: Vec<_> = machines
        .par_iter()
        .map(|machine| (lights::min_presses(machine), joltage::min_presses(machine)))
        .collect();

    solved
        .into_iter()
        .enumerate()
        .try_fold(Totals::default(), |totals, (i, (lights, joltage))| {
            let index = i + 1;
            let lights = lights.map_err(Error::at(index, Stage::Lights))?;
            let joltage = joltage.map_err(Error::at(index, Stage::Joltage))?;
            tracing::debug!(index, lights, joltage, "solved machine");

            Ok(Totals {
                lights: totals.lights + lights,
                joltage: totals.joltage + joltage,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use itertools::Itertools;
    use rstest::rstest;

    const SAMPLE: &str = include_str!("../sample.txt");

    #[test]
    fn solves_sample() -> miette::Result<()> {
        assert_eq!(
            solve(SAMPLE)?,
            Totals {
                lights: 7,
                joltage: 33
            }
        );
        Ok(())
    }

    #[rstest]
    #[case("")]
    #[case("[] {}")]
    #[case("[] {}\n\n[] () {}")]
    fn empty_machines_need_no_presses(#[case] input: &str) -> miette::Result<()> {
        assert_eq!(solve(input)?, Totals::default());
        Ok(())
    }

    #[test]
    fn reparsing_rendered_machines_gives_same_totals() -> miette::Result<()> {
        let rendered = parse_machines(SAMPLE)?.iter().join("\n");
        assert_eq!(solve(&rendered)?, solve(SAMPLE)?);
        Ok(())
    }

    #[rstest]
    #[case("[#] (0) {1}\n[#.] (0,1) {1,1}\n[.] () {0}", 2, Stage::Lights, SolveError::InconsistentLights)]
    #[case(
        "[.] (0) {1}\n\n[..] (0,1) (1) {3,1}",
        2,
        Stage::Joltage,
        SolveError::BoundExceeded { button: 0, presses: 3, bound: 1 }
    )]
    #[case("[..] (0,1) {1,2}", 1, Stage::Joltage, SolveError::InconsistentJoltage)]
    fn first_failing_machine_aborts(
        #[case] input: &str,
        #[case] expected_index: usize,
        #[case] expected_stage: Stage,
        #[case] expected: SolveError,
    ) {
        match solve(input) {
            Err(Error::Machine {
                index,
                stage,
                source,
            }) => {
                assert_eq!(index, expected_index);
                assert_eq!(stage, expected_stage);
                assert_eq!(source, expected);
            }
            other => panic!("expected a machine failure, got {other:?}"),
        }
    }

    #[test]
    fn parse_errors_abort_before_solving() {
        let input = "[#] (0) {1}\n[#] (0 {1}";
        match solve(input) {
            Err(Error::Parse(err)) => assert_eq!(err.line, 2),
            other => panic!("expected a parse failure, got {other:?}"),
        }
    }
}
