//! Human-readable report lines
//!
//! One line per dataset:
//!
//! ```text
//! N<size>.txt <mean> <std_dev> <geometric_mean> <median> <p95> <min> <max>
//! ```
//!
//! Numbers use `%g`-style formatting with a configurable number of
//! significant digits, so reports stay comparable with the historical ones.

use crate::stats::SummaryReport;

/// Format a value like C's `%.<precision>g`
///
/// Fixed notation when the decimal exponent `X` satisfies
/// `-4 <= X < precision`, scientific notation otherwise. Trailing zeros
/// are removed.
///
/// # Examples
///
/// ```
/// use datacrunch::output::text::format_general;
///
/// assert_eq!(format_general(3.0, 12), "3");
/// assert_eq!(format_general(0.5, 12), "0.5");
/// assert_eq!(format_general(1.0e20, 12), "1e+20");
/// assert_eq!(format_general(1.5e-7, 12), "1.5e-07");
/// ```
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }

    let precision = precision.max(1);

    // Exponent after rounding to `precision` significant digits
    let sci = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exponent >= -4 && exponent < precision as i32 {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    }
}

/// Strip trailing zeros (and a dangling point) from a fractional number
fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Format one report line
pub fn format_report_line(report: &SummaryReport, precision: usize) -> String {
    let fields = [
        report.mean,
        report.std_dev,
        report.geometric_mean,
        report.median,
        report.p95,
        report.min,
        report.max,
    ];

    let mut line = format!("N{}.txt", report.size);
    for value in fields {
        line.push(' ');
        line.push_str(&format_general(value, precision));
    }
    line
}

/// Print one report line to stdout
pub fn print_report(report: &SummaryReport, precision: usize) {
    println!("{}", format_report_line(report, precision));
}
