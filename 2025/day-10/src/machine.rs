use std::fmt;
use std::str::FromStr;

use chumsky::prelude::*;
use itertools::Itertools;

use crate::error::{ParseError, ParseErrorKind};

type Spanned<T> = (T, SimpleSpan);

/// One line of the manual: an indicator diagram, the button wiring and the
/// joltage requirements.
///
/// Validated on construction, so every button index addresses both a light
/// and a counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    lights: Vec<bool>,
    buttons: Vec<Vec<usize>>,
    jolts: Vec<u64>,
}

impl Machine {
    /// Builds a machine, treating an empty light pattern as all lights off
    /// when joltage counters are present.
    pub fn new(
        lights: Vec<bool>,
        buttons: Vec<Vec<usize>>,
        jolts: Vec<u64>,
    ) -> Result<Self, ParseErrorKind> {
        if jolts.is_empty() && !lights.is_empty() {
            return Err(ParseErrorKind::MissingJoltage);
        }

        let lights = match (lights.len(), jolts.len()) {
            (l, c) if l == c => lights,
            (0, c) => vec![false; c],
            (l, c) => {
                return Err(ParseErrorKind::LengthMismatch {
                    lights: l,
                    counters: c,
                })
            }
        };

        let len = lights.len();
        for (button, indices) in buttons.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i >= len) {
                return Err(ParseErrorKind::IndexOutOfRange { button, index, len });
            }
        }

        Ok(Self {
            lights,
            buttons,
            jolts,
        })
    }

    /// Target indicator pattern.
    pub fn lights(&self) -> &[bool] {
        &self.lights
    }

    /// Indices each button toggles (and increments).
    pub fn buttons(&self) -> &[Vec<usize>] {
        &self.buttons
    }

    /// Target value of each joltage counter.
    pub fn jolts(&self) -> &[u64] {
        &self.jolts
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let diagram: String = self
            .lights
            .iter()
            .map(|&on| if on { '#' } else { '.' })
            .collect();
        write!(f, "[{diagram}]")?;
        for button in &self.buttons {
            write!(f, " ({})", button.iter().join(","))?;
        }
        write!(f, " {{{}}}", self.jolts.iter().join(","))
    }
}

impl FromStr for Machine {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_line(&parser(), 1, s.trim())
    }
}

/// Syntactic shape of a line before the cross-field checks.
struct RawMachine {
    lights: Vec<bool>,
    buttons: Vec<Spanned<Vec<usize>>>,
    jolts: Spanned<Vec<u64>>,
}

impl RawMachine {
    fn validate(self, line_no: usize, line: &str) -> Result<Machine, ParseError> {
        let (jolts, jolts_span) = self.jolts;
        let (buttons, button_spans): (Vec<_>, Vec<_>) = self.buttons.into_iter().unzip();

        Machine::new(self.lights, buttons, jolts).map_err(|kind| {
            let span = match &kind {
                ParseErrorKind::IndexOutOfRange { button, .. } => button_spans[*button],
                _ => jolts_span,
            };
            ParseError::new(line_no, line, span.start..span.end, kind)
        })
    }
}

/// Comma separated integers. Blanks around items, leading zeros and empty
/// items (`1,,2`, `1,`) are accepted.
fn int_list<'a, T>() -> impl Parser<'a, &'a str, Vec<T>, extra::Err<Rich<'a, char>>> + Clone
where
    T: FromStr + 'a,
    T::Err: fmt::Display,
{
    let hspace = one_of(" \t").repeated();

    text::digits(10)
        .to_slice()
        .try_map(|digits: &str, span| digits.parse::<T>().map_err(|e| Rich::custom(span, e)))
        .or_not()
        .padded_by(hspace)
        .separated_by(just(','))
        .collect::<Vec<Option<T>>>()
        .map(|items| items.into_iter().flatten().collect())
}

fn parser<'a>() -> impl Parser<'a, &'a str, RawMachine, extra::Err<Rich<'a, char>>> {
    let hspace = one_of(" \t").repeated();

    let light = choice((just('.').to(false), just('#').to(true)));

    // [.##.]
    let diagram = light
        .repeated()
        .collect::<Vec<bool>>()
        .delimited_by(just('['), just(']'));

    // (0,2,3)
    let button = int_list::<usize>()
        .delimited_by(just('('), just(')'))
        .map_with(|indices, e| (indices, e.span()));

    // {3,5,4,7}
    let joltage = int_list::<u64>()
        .delimited_by(just('{'), just('}'))
        .map_with(|jolts, e| (jolts, e.span()));

    diagram
        .then_ignore(hspace.clone())
        .then(
            button
                .padded_by(hspace.clone())
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then_ignore(hspace.clone())
        .then(joltage)
        .then_ignore(hspace)
        .then_ignore(end())
        .map(|((lights, buttons), jolts)| RawMachine {
            lights,
            buttons,
            jolts,
        })
}

fn parse_line<'a>(
    parser: &impl Parser<'a, &'a str, RawMachine, extra::Err<Rich<'a, char>>>,
    line_no: usize,
    line: &'a str,
) -> Result<Machine, ParseError> {
    let raw = parser.parse(line).into_result().map_err(|errors| {
        match errors.into_iter().next() {
            Some(e) => ParseError::new(
                line_no,
                line,
                e.span().start..e.span().end,
                ParseErrorKind::Syntax(e.to_string()),
            ),
            None => ParseError::new(
                line_no,
                line,
                0..line.len(),
                ParseErrorKind::Syntax("unrecognised machine description".to_string()),
            ),
        }
    })?;

    raw.validate(line_no, line)
}

/// Parses every non-blank line of `input`, stopping at the first bad one.
pub fn parse_machines(input: &str) -> Result<Vec<Machine>, ParseError> {
    let parser = parser();

    input
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(line_no, line)| parse_line(&parser, line_no, line))
        .collect()
}
