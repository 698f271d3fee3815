use miette::Result;

#[tracing::instrument]
pub fn process(input: &str) -> Result<String> {
    let totals = crate::solve(input)?;
    Ok(totals.joltage.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() -> Result<()> {
        let input = "[.##.] (3) (1,3) (2) (2,3) (0,2) (0,1) {3,5,4,7}
[...#.] (0,2,3,4) (2,3) (0,4) (0,1,2) (1,2,3,4) {7,5,12,7,2}
[.###.#] (0,1,2,3,4) (0,3,4) (0,1,2,4,5) (1,2) {10,11,11,5,10,5}";
        assert_eq!("33", process(input)?);
        Ok(())
    }

    #[test]
    fn reports_first_failing_machine() {
        let input = "[.] (0) {1}
[...] (0,1) (1,2) (0,2) {1,1,1}
[..] (0,1) {1,2}";
        let err = process(input).unwrap_err();
        assert_eq!(err.to_string(), "machine 2 jolts");
    }

    #[test]
    fn machine_failing_the_other_half_aborts_the_run() {
        let err = process("[..] (0,1) {1,2}").unwrap_err();
        assert_eq!(err.to_string(), "machine 1 jolts");
    }
}
