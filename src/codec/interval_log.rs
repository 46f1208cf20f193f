//! Writing and reading interval logs.
//!
//! An interval log records a sequence of histograms over time: some header
//! metadata, then one line per interval with a start timestamp, a duration,
//! a human-readable maximum, and the base64 of the interval histogram's
//! (usually compressed) binary frame. Recording one histogram per second or
//! minute of a load test makes it possible to correlate latency behavior
//! with external events, and the per-interval frames can be re-aggregated
//! into any larger window after the fact.
//!
//! ```text
//! #[Histogram log format version 1.2]
//! #[StartTime: 1441812279.474 (seconds since epoch), Wed Sep 09 08:24:39 PDT 2015]
//! "StartTimestamp","Interval_Length","Interval_Max","Interval_Compressed_Histogram"
//! 0.127,1.007,2.769,HISTFAAAAEV42pNpmSz...
//! ```
//!
//! Three layers are provided:
//!
//! - [`IntervalLogWriter`] appends header lines and interval lines to any
//!   `io::Write`, framing histograms with any [`Encoder`].
//! - [`IntervalLogIterator`] is a zero-copy parser yielding [`LogEntry`]
//!   values with the base64 payloads still encoded, so scanning a large log
//!   for interesting intervals costs no decoding.
//! - [`LogReader`] layers payload decoding and the log's timestamp rules on
//!   top, handing back ready-to-use histograms with their start and end
//!   timestamps set.
//!
//! Logs are written as UTF-8. The reader also accepts UTF-16BE input (as
//! produced by some JVM-based writers), detected by byte-order mark or by a
//! leading NUL byte, and converts it before parsing.

use std::borrow::Cow;
use std::fmt::Write as FmtWrite;
use std::{char, error, fmt, io, ops, str};

use nom::branch::alt;
use nom::bytes::complete::{tag, take_until};
use nom::character::complete::{char as nom_char, line_ending, not_line_ending};
use nom::combinator::{map, map_res, opt};
use nom::number::complete::double;
use nom::sequence::{preceded, terminated};
use nom::IResult;

use super::{DecodeError, Decoder, EncodeError, Encoder};
use crate::counter::Counter;
use crate::Histogram;

/// Divisor applied to interval maxima by convention: microsecond values read
/// as seconds in the log's human-facing max column.
pub const DEFAULT_MAX_VALUE_DIVISOR: f64 = 1_000_000.0;

const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 3600.0;

// ****************************************************************
// Writing
// ****************************************************************

/// Writes interval logs to any `io::Write`, framing histograms with the
/// supplied encoder.
///
/// Header lines (format version, start time, base time, legend, comments)
/// and interval lines can be freely interleaved, but readers expect the
/// metadata before the first interval.
pub struct IntervalLogWriter<'a, 'b, W: io::Write, E: Encoder> {
    writer: &'a mut W,
    encoder: &'b mut E,
    text_buf: String,
    frame_buf: Vec<u8>,
}

impl<'a, 'b, W: io::Write, E: Encoder> IntervalLogWriter<'a, 'b, W, E> {
    /// Create a writer that appends to `writer` and frames histograms with
    /// `encoder`.
    pub fn new(writer: &'a mut W, encoder: &'b mut E) -> IntervalLogWriter<'a, 'b, W, E> {
        IntervalLogWriter {
            writer,
            encoder,
            text_buf: String::new(),
            frame_buf: Vec::new(),
        }
    }

    /// Write the `#[Histogram log format version 1.2]` header line.
    pub fn write_format_version(&mut self) -> io::Result<()> {
        writeln!(self.writer, "#[Histogram log format version 1.2]")
    }

    /// Write the StartTime header line. `seconds` is the log's start as
    /// seconds since the epoch; `human` is a display rendering of the same
    /// instant (readers ignore it).
    pub fn write_start_time(&mut self, seconds: f64, human: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "#[StartTime: {:.3} (seconds since epoch), {}]",
            seconds, human
        )
    }

    /// Write the BaseTime header line; interval timestamps are then offsets
    /// from this base, in seconds since the epoch.
    pub fn write_base_time(&mut self, seconds: f64) -> io::Result<()> {
        writeln!(
            self.writer,
            "#[BaseTime: {:.3} (seconds since epoch)]",
            seconds
        )
    }

    /// Write the quoted column legend line.
    pub fn write_legend(&mut self) -> io::Result<()> {
        writeln!(
            self.writer,
            "\"StartTimestamp\",\"Interval_Length\",\"Interval_Max\",\"Interval_Compressed_Histogram\""
        )
    }

    /// Write a `#`-prefixed comment line.
    pub fn write_comment(&mut self, s: &str) -> io::Result<()> {
        writeln!(self.writer, "#{}", s)
    }

    /// Write one interval histogram line.
    ///
    /// `start_seconds` is the interval's start in seconds since the epoch
    /// (or since the log's BaseTime, when one was written), and
    /// `duration_seconds` its length. The histogram's max is divided by
    /// `max_value_divisor` for the human-facing column;
    /// [`DEFAULT_MAX_VALUE_DIVISOR`] renders microseconds as seconds.
    pub fn write_histogram<C: Counter>(
        &mut self,
        h: &Histogram<C>,
        start_seconds: f64,
        duration_seconds: f64,
        tag: Option<Tag<'_>>,
        max_value_divisor: f64,
    ) -> Result<(), IntervalLogWriterError> {
        self.text_buf.clear();
        self.frame_buf.clear();

        if let Some(Tag(t)) = tag {
            write!(self.text_buf, "Tag={},", t).expect("writes to a String cannot fail");
        }
        write!(
            self.writer,
            "{}{:.3},{:.3},{:.3},",
            self.text_buf,
            start_seconds,
            duration_seconds,
            h.max() as f64 / max_value_divisor
        )?;

        let _len = self.encoder.encode(h, &mut self.frame_buf)?;
        self.text_buf.clear();
        base64::encode_config_buf(&self.frame_buf, base64::STANDARD, &mut self.text_buf);

        self.writer.write_all(self.text_buf.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur while writing a log.
#[derive(Debug)]
pub enum IntervalLogWriterError {
    /// Histogram encoding failed.
    Encode(EncodeError),
    /// An i/o operation failed.
    Io(io::ErrorKind),
}

impl From<EncodeError> for IntervalLogWriterError {
    fn from(e: EncodeError) -> Self {
        IntervalLogWriterError::Encode(e)
    }
}

impl From<io::Error> for IntervalLogWriterError {
    fn from(e: io::Error) -> Self {
        IntervalLogWriterError::Io(e.kind())
    }
}

impl fmt::Display for IntervalLogWriterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IntervalLogWriterError::Encode(e) => write!(f, "histogram encoding failed: {}", e),
            IntervalLogWriterError::Io(kind) => write!(f, "an i/o operation failed: {:?}", kind),
        }
    }
}

impl error::Error for IntervalLogWriterError {}

// ****************************************************************
// Line-level parsing
// ****************************************************************

/// A tag for an interval histogram: a `str` holding none of `,`, `\r`,
/// `\n`, or space.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Tag<'a>(&'a str);

impl<'a> Tag<'a> {
    /// Create a tag, or `None` if `s` contains a disallowed character.
    pub fn new(s: &'a str) -> Option<Tag<'a>> {
        if s.chars()
            .any(|c| c == ',' || c == '\r' || c == '\n' || c == ' ')
        {
            None
        } else {
            Some(Tag(s))
        }
    }

    /// The tag contents.
    pub fn as_str(&self) -> &'a str {
        self.0
    }
}

impl<'a> ops::Deref for Tag<'a> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

/// One interval line parsed from a log, with the histogram payload still
/// base64-encoded.
#[derive(PartialEq, Debug)]
pub struct IntervalLogHistogram<'a> {
    tag: Option<Tag<'a>>,
    start_timestamp: f64,
    duration: f64,
    max_value: f64,
    encoded_histogram: &'a str,
}

impl<'a> IntervalLogHistogram<'a> {
    /// Tag, if any is present.
    pub fn tag(&self) -> Option<Tag<'a>> {
        self.tag
    }

    /// Start of the interval in seconds; absolute or an offset against the
    /// log's StartTime/BaseTime, depending on the log's headers.
    pub fn start_timestamp(&self) -> f64 {
        self.start_timestamp
    }

    /// Duration of the interval in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// The histogram's max as written to the log, already divided by the
    /// writer's max-value divisor.
    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    /// The base64 of the histogram's binary frame. Left encoded so that
    /// scanning a log is cheap; decode with [`base64`] and a [`Decoder`]
    /// (or use [`LogReader`], which does both).
    pub fn encoded_histogram(&self) -> &'a str {
        self.encoded_histogram
    }
}

/// One meaningful line in an interval log.
#[derive(PartialEq, Debug)]
#[allow(variant_size_differences)]
pub enum LogEntry<'a> {
    /// A StartTime header, in seconds since the epoch.
    StartTime(f64),
    /// A BaseTime header, in seconds since the epoch.
    BaseTime(f64),
    /// An interval histogram line.
    Interval(IntervalLogHistogram<'a>),
}

/// Errors that occur when parsing an interval log.
#[derive(Debug, PartialEq)]
pub enum LogIteratorError {
    /// A line matched neither a log entry nor an ignorable line.
    ParseError {
        /// Byte offset in the input where the failed line starts.
        offset: usize,
    },
}

/// Zero-copy parser over the UTF-8 bytes of an interval log.
///
/// Yields each meaningful line as a [`LogEntry`]; comments and the legend
/// line are skipped. Histogram payloads are not decoded, which keeps
/// navigation through large logs cheap.
///
/// ```
/// use centile::codec::interval_log::{IntervalLogIterator, LogEntry};
///
/// let log = b"#A comment\n0.127,1.007,2.769,base64payload\n";
/// let mut entries = IntervalLogIterator::new(&log[..]);
///
/// match entries.next().unwrap().unwrap() {
///     LogEntry::Interval(h) => assert_eq!(0.127, h.start_timestamp()),
///     _ => panic!("expected an interval"),
/// }
/// assert_eq!(None, entries.next());
/// ```
pub struct IntervalLogIterator<'a> {
    orig_len: usize,
    input: &'a [u8],
}

impl<'a> IntervalLogIterator<'a> {
    /// Create an iterator over the UTF-8 bytes of an interval log.
    pub fn new(input: &'a [u8]) -> IntervalLogIterator<'a> {
        IntervalLogIterator {
            orig_len: input.len(),
            input,
        }
    }
}

impl<'a> Iterator for IntervalLogIterator<'a> {
    type Item = Result<LogEntry<'a>, LogIteratorError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.input.is_empty() {
                return None;
            }

            if let Ok((rest, entry)) = log_entry(self.input) {
                self.input = rest;
                return Some(Ok(entry));
            }

            match ignored_line(self.input) {
                Ok((rest, ())) => {
                    self.input = rest;
                }
                Err(_) => {
                    return Some(Err(LogIteratorError::ParseError {
                        offset: self.orig_len - self.input.len(),
                    }));
                }
            }
        }
    }
}

fn start_time(input: &[u8]) -> IResult<&[u8], LogEntry<'_>> {
    let (input, _) = tag("#[StartTime: ")(input)?;
    let (input, seconds) = double(input)?;
    let (input, _) = nom_char(' ')(input)?;
    let (input, _) = not_line_ending(input)?;
    let (input, _) = line_ending(input)?;
    Ok((input, LogEntry::StartTime(seconds)))
}

fn base_time(input: &[u8]) -> IResult<&[u8], LogEntry<'_>> {
    let (input, _) = tag("#[BaseTime: ")(input)?;
    let (input, seconds) = double(input)?;
    let (input, _) = nom_char(' ')(input)?;
    let (input, _) = not_line_ending(input)?;
    let (input, _) = line_ending(input)?;
    Ok((input, LogEntry::BaseTime(seconds)))
}

fn interval_hist(input: &[u8]) -> IResult<&[u8], LogEntry<'_>> {
    let (input, tag_str) = opt(map(
        map_res(
            preceded(tag("Tag="), terminated(take_until(","), tag(","))),
            str::from_utf8,
        ),
        Tag,
    ))(input)?;
    let (input, start_timestamp) = double(input)?;
    let (input, _) = nom_char(',')(input)?;
    let (input, duration) = double(input)?;
    let (input, _) = nom_char(',')(input)?;
    let (input, max_value) = double(input)?;
    let (input, _) = nom_char(',')(input)?;
    let (input, encoded_histogram) = map_res(not_line_ending, str::from_utf8)(input)?;
    let (input, _) = line_ending(input)?;
    Ok((
        input,
        LogEntry::Interval(IntervalLogHistogram {
            tag: tag_str,
            start_timestamp,
            duration,
            max_value,
            encoded_histogram,
        }),
    ))
}

fn log_entry(input: &[u8]) -> IResult<&[u8], LogEntry<'_>> {
    // the magic comments must win over the plain comment parser
    alt((start_time, base_time, interval_hist))(input)
}

fn comment_line(input: &[u8]) -> IResult<&[u8], ()> {
    let (input, _) = tag("#")(input)?;
    let (input, _) = not_line_ending(input)?;
    let (input, _) = line_ending(input)?;
    Ok((input, ()))
}

fn legend_line(input: &[u8]) -> IResult<&[u8], ()> {
    let (input, _) = tag("\"StartTimestamp\"")(input)?;
    let (input, _) = not_line_ending(input)?;
    let (input, _) = line_ending(input)?;
    Ok((input, ()))
}

fn ignored_line(input: &[u8]) -> IResult<&[u8], ()> {
    alt((comment_line, legend_line))(input)
}

// ****************************************************************
// Reading with decoding and timestamp resolution
// ****************************************************************

/// Errors that can occur while reading and decoding an interval log.
#[derive(Debug, PartialEq)]
#[allow(variant_size_differences)]
pub enum LogReadError {
    /// A line could not be parsed; the offset is in bytes from the start of
    /// the (possibly transcoded) input.
    Parse {
        /// Byte offset where the failed line starts.
        offset: usize,
    },
    /// The interval's payload is not valid base64.
    Base64,
    /// The decoded payload is not a valid histogram frame.
    Decode(DecodeError),
}

impl From<DecodeError> for LogReadError {
    fn from(e: DecodeError) -> Self {
        LogReadError::Decode(e)
    }
}

impl fmt::Display for LogReadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogReadError::Parse { offset } => {
                write!(f, "unparseable log line at byte offset {}", offset)
            }
            LogReadError::Base64 => write!(f, "interval payload is not valid base64"),
            LogReadError::Decode(e) => write!(f, "interval payload decoding failed: {}", e),
        }
    }
}

impl error::Error for LogReadError {}

/// An interval histogram decoded out of a log by [`LogReader`].
#[derive(Debug)]
pub struct DecodedInterval<C: Counter> {
    histogram: Histogram<C>,
    tag: Option<String>,
}

impl<C: Counter> DecodedInterval<C> {
    /// The decoded histogram, with start and end timestamps set from the
    /// log.
    pub fn histogram(&self) -> &Histogram<C> {
        &self.histogram
    }

    /// Consume the interval, keeping the histogram.
    pub fn into_histogram(self) -> Histogram<C> {
        self.histogram
    }

    /// The interval's tag, if the line carried one.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}

/// Reads an interval log, decoding each interval histogram and resolving
/// the log's timestamp conventions.
///
/// Timestamps follow the log headers: when no StartTime header is present,
/// the first interval's timestamp is adopted as the start time. When no
/// BaseTime header is present, interval timestamps are treated as offsets
/// from the start time if the first one lies more than a year before it,
/// and as absolute seconds since the epoch otherwise. Each decoded
/// histogram carries `start_timestamp = round((timestamp + base) * 1000)`
/// milliseconds and an end timestamp one interval length later.
///
/// Input may be UTF-8 or UTF-16BE; the latter is detected and transcoded up
/// front.
pub struct LogReader<'a> {
    input: Cow<'a, [u8]>,
    pos: usize,
    start_time: Option<f64>,
    base_time: Option<f64>,
    observed_base_time: bool,
    decoder: Decoder,
}

impl<'a> LogReader<'a> {
    /// Create a reader over the bytes of an interval log.
    pub fn new(bytes: &'a [u8]) -> LogReader<'a> {
        let input = match utf16be_to_utf8(bytes) {
            Some(converted) => Cow::Owned(converted),
            None => Cow::Borrowed(bytes),
        };
        LogReader {
            input,
            pos: 0,
            start_time: None,
            base_time: None,
            observed_base_time: false,
            decoder: Decoder::new(),
        }
    }

    /// The log's start time in seconds since the epoch, once one has been
    /// observed (from a header or adopted from the first interval).
    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    /// The log's explicit BaseTime header, if one has been observed.
    pub fn base_time(&self) -> Option<f64> {
        self.base_time
    }

    /// Decode the next interval histogram, skipping headers and comments.
    /// Returns `None` at end of input.
    pub fn next_interval<C: Counter>(
        &mut self,
    ) -> Option<Result<DecodedInterval<C>, LogReadError>> {
        loop {
            let remaining = &self.input.as_ref()[self.pos..];
            if remaining.is_empty() {
                return None;
            }

            let (consumed, entry) = match log_entry(remaining) {
                Ok((rest, entry)) => (remaining.len() - rest.len(), Some(entry)),
                Err(_) => match ignored_line(remaining) {
                    Ok((rest, ())) => (remaining.len() - rest.len(), None),
                    Err(_) => {
                        return Some(Err(LogReadError::Parse { offset: self.pos }));
                    }
                },
            };

            // Resolve the entry into owned data before advancing.
            let interval = match entry {
                None => {
                    self.pos += consumed;
                    continue;
                }
                Some(LogEntry::StartTime(seconds)) => {
                    if self.start_time.is_none() {
                        self.start_time = Some(seconds);
                    }
                    self.pos += consumed;
                    continue;
                }
                Some(LogEntry::BaseTime(seconds)) => {
                    self.base_time = Some(seconds);
                    self.observed_base_time = true;
                    self.pos += consumed;
                    continue;
                }
                Some(LogEntry::Interval(interval)) => interval,
            };

            let timestamp = interval.start_timestamp();
            let duration = interval.duration();
            let tag = interval.tag().map(|t| t.as_str().to_owned());
            let payload = match base64::decode(interval.encoded_histogram()) {
                Ok(bytes) => bytes,
                Err(_) => {
                    self.pos += consumed;
                    return Some(Err(LogReadError::Base64));
                }
            };
            self.pos += consumed;

            if self.start_time.is_none() {
                // no explicit StartTime; adopt the first interval's
                self.start_time = Some(timestamp);
            }
            if !self.observed_base_time {
                let start = self.start_time.expect("start time was just populated");
                // A timestamp more than a year before the start time cannot
                // be absolute, so the log must be offset-based.
                self.base_time = if timestamp < start - SECONDS_PER_YEAR {
                    Some(start)
                } else {
                    Some(0.0)
                };
                self.observed_base_time = true;
            }
            let base = self.base_time.unwrap_or(0.0);

            let mut histogram: Histogram<C> = match self.decoder.decode(&mut payload.as_slice()) {
                Ok(h) => h,
                Err(e) => return Some(Err(LogReadError::Decode(e))),
            };
            let start_millis = ((timestamp + base) * 1000.0).round() as u64;
            histogram.set_start_timestamp(start_millis);
            histogram.set_end_timestamp(start_millis + (duration * 1000.0).round() as u64);

            return Some(Ok(DecodedInterval { histogram, tag }));
        }
    }
}

/// Transcode UTF-16BE log bytes to UTF-8, or `None` when the input does not
/// look like UTF-16BE. Detection is by byte-order mark, or by the leading
/// NUL of a big-endian ASCII character.
fn utf16be_to_utf8(bytes: &[u8]) -> Option<Vec<u8>> {
    let body = if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        &bytes[2..]
    } else if !bytes.is_empty() && bytes[0] == 0x00 {
        bytes
    } else {
        return None;
    };
    if body.len() % 2 != 0 {
        return None;
    }
    let units = body
        .chunks_exact(2)
        .map(|pair| u16::from(pair[0]) << 8 | u16::from(pair[1]));
    let decoded: Result<String, _> = char::decode_utf16(units).collect();
    decoded.ok().map(String::into_bytes)
}
