//! Human-facing percentile distribution tables.
//!
//! A report walks the percentile iterator and prints one row per percentile
//! tick: the value at that percentile (scaled into display units), the
//! percentile as a quantile, the cumulative sample count, and `1/(1-q)` —
//! the "one in N" reading of the tail. The plain format appends a footer
//! with summary statistics; the CSV format is the same table for machine
//! consumption.
//!
//! ```
//! use centile::Histogram;
//! use centile::report::{percentile_distribution, ReportConfig};
//!
//! let mut h = Histogram::<u64>::new_with_max(3_600_000_000, 3).unwrap();
//! for v in &[1_500_u64, 2_100, 45_000, 1_300_000] {
//!     h.record(*v).unwrap();
//! }
//!
//! let mut out = Vec::new();
//! percentile_distribution(&h, &mut out, &ReportConfig::default()).unwrap();
//! ```

use std::io;

use crate::counter::Counter;
use crate::Histogram;

/// Output format for a percentile distribution report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Fixed-width columns with a summary footer.
    Plain,
    /// Comma-separated values, no footer.
    Csv,
}

/// Configuration for a percentile distribution report.
#[derive(Debug, Clone, Copy)]
pub struct ReportConfig {
    /// Percentile ticks per halving of the distance to 100%; more ticks
    /// yield a finer table. Defaults to 5.
    pub ticks_per_half_distance: u32,
    /// Divisor applied to values for display, e.g. 1000.0 to print recorded
    /// microseconds as milliseconds. Defaults to 1000.0.
    pub unit_ratio: f64,
    /// Table format. Defaults to [`ReportFormat::Plain`].
    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> ReportConfig {
        ReportConfig {
            ticks_per_half_distance: 5,
            unit_ratio: 1000.0,
            format: ReportFormat::Plain,
        }
    }
}

/// Write `h`'s percentile distribution table to `out`.
///
/// If the histogram's counters have overflowed, the table cannot be trusted;
/// a single `# Histogram counts indicate OVERFLOW values` line is written
/// instead and the call still succeeds.
pub fn percentile_distribution<C: Counter, W: io::Write>(
    h: &Histogram<C>,
    out: &mut W,
    config: &ReportConfig,
) -> io::Result<()> {
    if h.has_overflowed() {
        return writeln!(out, "# Histogram counts indicate OVERFLOW values");
    }

    match config.format {
        ReportFormat::Plain => plain(h, out, config),
        ReportFormat::Csv => csv(h, out, config),
    }
}

fn plain<C: Counter, W: io::Write>(
    h: &Histogram<C>,
    out: &mut W,
    config: &ReportConfig,
) -> io::Result<()> {
    let prec = usize::from(h.significant_digits());
    writeln!(
        out,
        "{:>12} {:>14} {:>10} {:>14}\n",
        "Value", "Percentile", "TotalCount", "1/(1-Percentile)"
    )?;

    for point in h.iter_percentiles(config.ticks_per_half_distance) {
        let value = point.value_iterated_to() as f64 / config.unit_ratio;
        let quantile = point.percentile_level_iterated_to() / 100.0;
        if point.percentile_level_iterated_to() != 100.0 {
            writeln!(
                out,
                "{:>12.prec$} {:>2.12} {:>10} {:>14.2}",
                value,
                quantile,
                point.total_count_to_value(),
                1.0 / (1.0 - quantile),
                prec = prec
            )?;
        } else {
            // the last row's "one in N" column is unbounded and omitted
            writeln!(
                out,
                "{:>12.prec$} {:>2.12} {:>10}",
                value,
                quantile,
                point.total_count_to_value(),
                prec = prec
            )?;
        }
    }

    writeln!(
        out,
        "#[Mean    = {:>12.prec$}, StdDeviation   = {:>12.prec$}]",
        h.mean() / config.unit_ratio,
        h.stdev() / config.unit_ratio,
        prec = prec
    )?;
    writeln!(
        out,
        "#[Max     = {:>12.prec$}, Total count    = {:>12}]",
        h.max() as f64 / config.unit_ratio,
        h.len(),
        prec = prec
    )?;
    writeln!(
        out,
        "#[Buckets = {:>12}, SubBuckets     = {:>12}]",
        h.bucket_count(),
        h.sub_bucket_count()
    )
}

fn csv<C: Counter, W: io::Write>(
    h: &Histogram<C>,
    out: &mut W,
    config: &ReportConfig,
) -> io::Result<()> {
    let prec = usize::from(h.significant_digits());
    writeln!(
        out,
        "\"Value\",\"Percentile\",\"TotalCount\",\"1/(1-Percentile)\""
    )?;

    for point in h.iter_percentiles(config.ticks_per_half_distance) {
        let value = point.value_iterated_to() as f64 / config.unit_ratio;
        let quantile = point.percentile_level_iterated_to() / 100.0;
        if point.percentile_level_iterated_to() != 100.0 {
            writeln!(
                out,
                "{:.prec$},{:.12},{},{:.2}",
                value,
                quantile,
                point.total_count_to_value(),
                1.0 / (1.0 - quantile),
                prec = prec
            )?;
        } else {
            writeln!(
                out,
                "{:.prec$},{:.12},{},Infinity",
                value,
                quantile,
                point.total_count_to_value(),
                prec = prec
            )?;
        }
    }
    Ok(())
}
