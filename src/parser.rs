use crate::cue::Cue;
use crate::error::ParseError;

use std::io::{self, BufRead};

use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1, one_of, space0};
use nom::combinator::{all_consuming, map_res, opt, recognize};
use nom::error::VerboseError;
use nom::sequence::{delimited, pair, separated_pair};
use nom::IResult;
use tracing::{debug, warn};

/// What to do with the output once a block turns out to be malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidPolicy {
    /// Discard everything parsed so far and stop reading.
    #[default]
    Abort,
    /// Discard everything parsed so far, then keep running the state machine
    /// over the remaining lines. Blocks after the violation are kept.
    ClearAndContinue,
}

/// Outcome of a parse. A parse never fails outright; a malformed file is
/// reported through `errors` and an emptied (or truncated) output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    /// Cues this parse left in the output sequence.
    pub cues: usize,
    pub errors: Vec<ParseError>,
}

impl ParseReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct Parser {
    policy: InvalidPolicy,
}

impl Parser {
    pub fn new() -> Self {
        Self::with_policy(InvalidPolicy::default())
    }

    pub fn with_policy(policy: InvalidPolicy) -> Self {
        Self { policy }
    }

    /// Parses `lines` and appends the cues, in file order, to `output`.
    pub fn parse_lines<I, S>(&self, lines: I, output: &mut Vec<Cue>) -> ParseReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut machine = Machine::new(self.policy, output);
        for (idx, line) in lines.into_iter().enumerate() {
            if !machine.feed(idx + 1, line.as_ref()) {
                break;
            }
        }
        machine.finish()
    }

    pub fn parse_str(&self, input: &str, output: &mut Vec<Cue>) -> ParseReport {
        self.parse_lines(input.lines(), output)
    }

    /// Like `parse_lines`, reading from `reader`. Only I/O failures are errors.
    pub fn parse_reader<R: BufRead>(
        &self,
        reader: R,
        output: &mut Vec<Cue>,
    ) -> io::Result<ParseReport> {
        let mut machine = Machine::new(self.policy, output);
        for (idx, line) in reader.lines().enumerate() {
            if !machine.feed(idx + 1, &line?) {
                break;
            }
        }
        Ok(machine.finish())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectIndex,
    ExpectTimeRange,
    ExpectText,
}

struct Machine<'a> {
    policy: InvalidPolicy,
    output: &'a mut Vec<Cue>,
    report: ParseReport,
    state: State,
    timing: Option<(f64, f64)>,
    text: String,
}

impl<'a> Machine<'a> {
    fn new(policy: InvalidPolicy, output: &'a mut Vec<Cue>) -> Self {
        Self {
            policy,
            output,
            report: ParseReport::default(),
            state: State::ExpectIndex,
            timing: None,
            text: String::new(),
        }
    }

    /// Returns false once parsing must stop.
    fn feed(&mut self, number: usize, line: &str) -> bool {
        let line = if number == 1 {
            line.trim_start_matches('\u{FEFF}')
        } else {
            line
        };
        let line = line.strip_suffix('\r').unwrap_or(line);
        let blank = line.trim().is_empty();

        match self.state {
            State::ExpectIndex => {
                if blank {
                    return true;
                }
                if index_line(line).is_err() {
                    let err = ParseError::MalformedIndexLine {
                        line: number,
                        content: line.to_string(),
                    };
                    if !self.invalid(err) {
                        return false;
                    }
                }
                self.state = State::ExpectTimeRange;
            }
            State::ExpectTimeRange => {
                match find_time_range(line) {
                    Some(timing) => self.timing = Some(timing),
                    None => {
                        self.timing = None;
                        let err = ParseError::MalformedTimeRangeLine {
                            line: number,
                            content: line.to_string(),
                        };
                        if !self.invalid(err) {
                            return false;
                        }
                    }
                }
                self.state = State::ExpectText;
            }
            State::ExpectText => {
                if blank {
                    self.flush();
                    self.state = State::ExpectIndex;
                } else {
                    self.text.push_str(line);
                    self.text.push('\n');
                }
            }
        }
        true
    }

    fn flush(&mut self) {
        let text = std::mem::take(&mut self.text);
        // A block whose time range was rejected has nothing to be timed against.
        let (start, end) = match self.timing.take() {
            Some(timing) => timing,
            None => return,
        };

        if end < start {
            warn!(start, end, "Caption ends before it starts, keeping it anyway");
        }
        if let Some(prev) = self.output.last() {
            if start < prev.start {
                warn!(
                    start,
                    previous = prev.start,
                    "Caption starts before the previous one, keeping file order"
                );
            }
        }

        self.output.push(Cue::new(text, start, Some(end)));
        self.report.cues += 1;
    }

    /// Applies the invalid-file policy. Returns false when parsing must stop.
    fn invalid(&mut self, err: ParseError) -> bool {
        warn!(
            discarded = self.output.len(),
            "Invalid subtitles file found, cancelling load: {}", err
        );
        self.output.clear();
        self.report.cues = 0;
        self.report.errors.push(err);
        match self.policy {
            InvalidPolicy::Abort => false,
            InvalidPolicy::ClearAndContinue => true,
        }
    }

    fn finish(self) -> ParseReport {
        if self.state == State::ExpectText && !self.text.is_empty() {
            debug!("Dropping final caption block without a terminating blank line");
        }
        self.report
    }
}

fn index_line(input: &str) -> IResult<&str, i64, VerboseError<&str>> {
    all_consuming(delimited(space0, seq_num, space0))(input)
}

/// A signed integer, as in `1`, `+1` or `-1`.
fn seq_num(input: &str) -> IResult<&str, i64, VerboseError<&str>> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        s.parse()
    })(input)
}

/// The first time range anywhere in `line`. Text around it, such as a
/// leading tag or trailing position coordinates, is ignored.
fn find_time_range(line: &str) -> Option<(f64, f64)> {
    line.char_indices()
        .find_map(|(idx, _)| time_range(&line[idx..]).ok())
        .map(|(_, timing)| timing)
}

fn time_range(input: &str) -> IResult<&str, (f64, f64), VerboseError<&str>> {
    let (input, _) = space0(input)?;
    let (input, start) = timestamp(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = tag("-->")(input)?;
    let (input, _) = space0(input)?;
    let (input, end) = timestamp(input)?;

    Ok((input, (start, end)))
}

fn timestamp(input: &str) -> IResult<&str, f64, VerboseError<&str>> {
    let take_int = || map_res(digit1, |s: &str| s.parse::<u64>());
    // The comma is the decimal separator; `,5` means half a second.
    let mut take_secs = map_res(
        recognize(separated_pair(digit1, char(','), digit1)),
        |s: &str| s.replace(',', ".").parse::<f64>(),
    );

    let (input, hours) = take_int()(input)?;
    let (input, _) = tag(":")(input)?;
    let (input, minutes) = take_int()(input)?;
    let (input, _) = tag(":")(input)?;
    let (input, seconds) = take_secs(input)?;

    Ok((
        input,
        hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
    ))
}
