//! Trace sinks.
//!
//! A sink receives every captured [`CallFrame`] synchronously, in call
//! order. Write failures are returned to the caller, which logs and drops
//! them; a sink never gets to influence the traced program.

use std::io::{self, Write};

use calltrace_frame::CallFrame;

/// Destination for trace records.
pub trait TraceSink: Send {
    /// Record one intercepted call.
    ///
    /// # Errors
    ///
    /// Returns the underlying write error, if any.
    fn record(&mut self, frame: &CallFrame) -> io::Result<()>;

    /// Flush buffered records.
    ///
    /// # Errors
    ///
    /// Returns the underlying flush error, if any.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: TraceSink + ?Sized> TraceSink for Box<S> {
    fn record(&mut self, frame: &CallFrame) -> io::Result<()> {
        (**self).record(frame)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Writes one formatted line per call.
#[derive(Debug)]
pub struct WriterSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<io::Stderr> {
    /// Sink on the process diagnostic stream.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> TraceSink for WriterSink<W> {
    fn record(&mut self, frame: &CallFrame) -> io::Result<()> {
        writeln!(self.writer, "{frame}")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Keeps every frame in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<CallFrame>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatted trace lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.frames.iter().map(ToString::to_string).collect()
    }
}

impl TraceSink for MemorySink {
    fn record(&mut self, frame: &CallFrame) -> io::Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn record(&mut self, _frame: &CallFrame) -> io::Result<()> {
        Ok(())
    }
}
