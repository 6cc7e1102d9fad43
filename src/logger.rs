// Console LED Trigger - Diagnostic Logger
//
// `log` backend that formats each record once and writes the line to every
// registered sink in order (USB console first, then the UART mirror).

use std::io::Write;
use std::sync::Mutex;

use log::{LevelFilter, Log, Metadata, Record};

/// Byte destination for formatted log lines.
pub trait Sink: Send {
    fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()>;
}

/// Process stdout; on the device this is the USB serial/JTAG console.
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(bytes)?;
        out.flush()?;
        Ok(())
    }
}

pub struct FanoutLogger {
    level: LevelFilter,
    sinks: Mutex<Vec<Box<dyn Sink>>>,
}

impl FanoutLogger {
    pub fn new(level: LevelFilter, sinks: Vec<Box<dyn Sink>>) -> Self {
        Self {
            level,
            sinks: Mutex::new(sinks),
        }
    }

    fn format(record: &Record) -> String {
        let tag = match record.level() {
            log::Level::Error => 'E',
            log::Level::Warn => 'W',
            log::Level::Info => 'I',
            log::Level::Debug => 'D',
            log::Level::Trace => 'V',
        };
        format!("{} {}: {}\n", tag, record.target(), record.args())
    }
}

impl Log for FanoutLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Self::format(record);
        let mut sinks = match self.sinks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for sink in sinks.iter_mut() {
            // Nowhere to report a failing sink; keep feeding the others.
            let _ = sink.write(line.as_bytes());
        }
    }

    fn flush(&self) {}
}

/// Install the fan-out logger as the global `log` backend. Call once at boot.
pub fn init(sinks: Vec<Box<dyn Sink>>, level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let logger: &'static FanoutLogger = Box::leak(Box::new(FanoutLogger::new(level, sinks)));
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}
