//! Destinations for pre-formatted log lines.

use std::io::Write;
use std::sync::Mutex;

/// A sink that receives newline-terminated log lines.
pub trait LogSink: Send + Sync {
    /// Write a line to the sink.
    fn write_line(&self, line: &str);
}

/// Log sink that writes to stderr, keeping stdout free for command output.
#[derive(Debug, Default)]
pub struct StderrLogSink;

impl LogSink for StderrLogSink {
    fn write_line(&self, line: &str) {
        let mut stderr = std::io::stderr().lock();
        if let Err(error) = stderr.write_all(line.as_bytes()) {
            eprintln!("log sink write failed: {error}");
        }
    }
}

/// Log sink over any writer; lines are written whole under a lock.
#[derive(Debug)]
pub struct WriterLogSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterLogSink<W> {
    /// Wrap `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer, e.g. to inspect a buffer.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> LogSink for WriterLogSink<W> {
    fn write_line(&self, line: &str) {
        let mut guard = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(error) = guard.write_all(line.as_bytes()).and_then(|()| guard.flush()) {
            eprintln!("log sink write failed: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_sink_keeps_lines_in_order() -> Result<(), std::string::FromUtf8Error> {
        let sink = WriterLogSink::new(Vec::new());
        sink.write_line("hello\n");
        sink.write_line("world\n");

        let text = String::from_utf8(sink.into_inner())?;
        assert_eq!(text, "hello\nworld\n");
        Ok(())
    }
}
