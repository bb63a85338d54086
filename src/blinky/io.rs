//! Console collaborators of the demo

use core::fmt;
use core::future::Future;

/// Line oriented output
pub trait OutputSink {
    /// Print one line; the sink adds the line break
    fn print(&self, line: &str);

    /// Print a formatted line, truncated to [`LineBuf`] capacity
    fn print_fmt(&self, args: fmt::Arguments<'_>) {
        let mut line = LineBuf::new();
        // A full buffer only truncates.
        let _ = fmt::write(&mut line, args);
        self.print(line.as_str());
    }
}

impl<S: OutputSink + ?Sized> OutputSink for &S {
    fn print(&self, line: &str) {
        (**self).print(line)
    }
}

/// Why [`InputSource::read_int`] produced no number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputError {
    /// Input did not start with an integer; the rest of the line was dropped
    Malformed,
    /// No more input will arrive
    Closed,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Malformed => f.write_str("malformed input"),
            InputError::Closed => f.write_str("input closed"),
        }
    }
}

/// Integer input
///
/// While no input is available the future must suspend the task through a
/// kernel operation (a delay, a queue receive) so lower priority tasks and
/// time keep running.
pub trait InputSource {
    /// Read the next whitespace separated integer
    fn read_int(&self) -> impl Future<Output = Result<i64, InputError>>;
}

/// Outcome of scanning buffered input for an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// An integer and the number of bytes it used, leading blanks included
    Int(i64, usize),
    /// Only whitespace left
    Empty,
    /// Something other than an integer comes next
    Malformed,
}

/// Scan one integer the way `scanf("%d")` does
///
/// Leading whitespace is skipped and the longest `[+-]?[0-9]+` prefix is
/// taken; trailing garbage is left for the next read.
pub fn scan_int(input: &str) -> Scan {
    let start = input.len() - input.trim_start().len();
    let rest = &input[start..];
    if rest.is_empty() {
        return Scan::Empty;
    }

    let bytes = rest.as_bytes();
    let sign = usize::from(matches!(bytes[0], b'+' | b'-'));
    let digits = bytes[sign..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return Scan::Malformed;
    }

    let end = sign + digits;
    match rest[..end].parse::<i64>() {
        Ok(value) => Scan::Int(value, start + end),
        Err(_) => Scan::Malformed,
    }
}

/// Fixed capacity line buffer
pub struct LineBuf {
    buf: [u8; Self::CAPACITY],
    len: usize,
}

impl LineBuf {
    pub const CAPACITY: usize = 96;

    pub const fn new() -> Self {
        Self {
            buf: [0; Self::CAPACITY],
            len: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        // Only whole UTF-8 sequences are ever copied in.
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl Default for LineBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for LineBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = Self::CAPACITY - self.len;
        let mut take = s.len().min(room);
        while !s.is_char_boundary(take) {
            take -= 1;
        }
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        if take < s.len() {
            Err(fmt::Error)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    #[test]
    fn scans_like_scanf() {
        assert_eq!(scan_int("  42\n"), Scan::Int(42, 4));
        assert_eq!(scan_int("-7 1"), Scan::Int(-7, 2));
        assert_eq!(scan_int("12abc"), Scan::Int(12, 2));
        assert_eq!(scan_int(" \n"), Scan::Empty);
        assert_eq!(scan_int("abc"), Scan::Malformed);
        assert_eq!(scan_int("-"), Scan::Malformed);
        assert_eq!(scan_int("99999999999999999999"), Scan::Malformed);
    }

    #[test]
    fn line_buf_truncates_on_char_boundary() {
        let mut line = LineBuf::new();
        write!(line, "Reset value: {}", 3).unwrap();
        assert_eq!(line.as_str(), "Reset value: 3");

        let mut full = LineBuf::new();
        let long = "é".repeat(LineBuf::CAPACITY);
        assert!(full.write_str(&long).is_err());
        assert_eq!(full.as_str().len(), LineBuf::CAPACITY);
    }
}
