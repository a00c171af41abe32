//! Console output that never takes the worker down
//!
//! Progress lines go to stdout for the operator. A closed or broken stdout
//! loses those lines but must not interrupt treatment, so write failures are
//! logged and swallowed instead of panicking like `println!`.

use std::fmt;
use std::io::Write;

/// Write `line` plus a newline to `out`
///
/// Returns `false` when the write failed; the failure is logged at warn level.
pub fn write_line<W: Write + ?Sized>(out: &mut W, line: fmt::Arguments<'_>) -> bool {
    match writeln!(out, "{line}").and_then(|()| out.flush()) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Console output lost");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader closed"))
        }
    }

    #[test]
    fn test_write_line_appends_newline() {
        let mut out = Vec::new();
        assert!(write_line(&mut out, format_args!("🩺 Now treating: {}", "Jane Doe")));
        assert!(write_line(&mut out, format_args!("")));
        assert_eq!(String::from_utf8(out).unwrap(), "🩺 Now treating: Jane Doe\n\n");
    }

    #[test]
    fn test_failing_writer_is_reported_not_panicked() {
        let mut out = BrokenPipe;
        assert!(!write_line(&mut out, format_args!("Now treating: {}", "Jane Doe")));
        assert!(!write_line(&mut out, format_args!("")));
    }
}
