use miette::Result;

#[tracing::instrument]
pub fn process(input: &str) -> Result<String> {
    let totals = crate::solve(input)?;
    Ok(totals.lights.to_string())
}
