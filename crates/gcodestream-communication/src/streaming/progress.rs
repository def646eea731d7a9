//! Progress annotation for transmitted lines

/// Formats the `(NN%) LLLLLLLL | payload` annotation printed per line
///
/// The percent divisor is computed once from the program length as
/// `total/100 + 1`, which keeps the arithmetic integral, never divides by
/// zero, and makes the percent non-decreasing as the offset grows.
#[derive(Debug, Clone)]
pub struct ProgressMeter {
    divisor: u64,
    separator: Option<char>,
}

impl ProgressMeter {
    /// Meter for a program of `total_bytes` bytes, with `,` digit grouping
    pub fn new(total_bytes: u64) -> Self {
        Self {
            divisor: total_bytes / 100 + 1,
            separator: Some(','),
        }
    }

    /// Change (or disable) the thousands separator used for line numbers
    pub fn with_separator(mut self, separator: Option<char>) -> Self {
        self.separator = separator;
        self
    }

    /// Percent complete at byte `offset`
    pub fn percent(&self, offset: u64) -> u64 {
        offset / self.divisor
    }

    /// The annotation for `payload`, read as line `line_number`, ending at `offset`
    pub fn format_line(&self, offset: u64, line_number: u64, payload: &[u8]) -> String {
        format!(
            "({:02}%) {:>8} | {}",
            self.percent(offset),
            group_thousands(line_number, self.separator),
            String::from_utf8_lossy(payload)
        )
    }
}

/// Render `value` with a separator between groups of three digits
pub fn group_thousands(value: u64, separator: Option<char>) -> String {
    let digits = value.to_string();
    let Some(separator) = separator else {
        return digits;
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(digit);
    }
    grouped
}
