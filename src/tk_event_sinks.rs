// Event sinks for simulation output
//
// The talkers only see `EventSink`; these are the concrete consumers used by
// the binaries and the tests.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use log::{info, warn};

use crate::tk_interface::{Event, EventSink};

/// One log line: `[   123 ms] talker 0 dials 2`
pub fn format_line(elapsed: Duration, event: &Event) -> String {
    format!("[{:6} ms] {}", elapsed.as_millis(), event)
}

// ============================================================================
// Console
// ============================================================================

/// Logging event sink that outputs events through the `log` facade
pub struct LoggingEventSink {
    enabled: bool,
}

impl LoggingEventSink {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl EventSink for LoggingEventSink {
    fn log(&self, elapsed: Duration, event: Event) {
        if !self.enabled {
            return;
        }
        info!("{}", format_line(elapsed, &event));
    }
}

// ============================================================================
// Log file
// ============================================================================

/// Writes every event to a log file and mirrors it to the console
///
/// Each line is flushed as soon as it is written so a crashed or interrupted
/// run still leaves a complete log behind.
pub struct FileEventSink {
    writer: Mutex<BufWriter<File>>,
    console: LoggingEventSink,
}

impl FileEventSink {
    /// Create (or truncate) the log file, creating parent directories as needed
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            console: LoggingEventSink::new(true),
        })
    }

    /// Write to the file only
    pub fn without_console(mut self) -> Self {
        self.console = LoggingEventSink::new(false);
        self
    }
}

impl EventSink for FileEventSink {
    fn log(&self, elapsed: Duration, event: Event) {
        let line = format_line(elapsed, &event);
        {
            let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
                warn!("failed to write log line: {}", e);
            }
        }
        self.console.log(elapsed, event);
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Collects events in memory for later analysis
#[derive(Default)]
pub struct MemoryEventSink {
    records: Mutex<Vec<(Duration, Event)>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything logged so far, in arrival order
    pub fn records(&self) -> Vec<(Duration, Event)> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.records().into_iter().map(|(_, event)| event).collect()
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, event)| matches(event))
            .count()
    }
}

impl EventSink for MemoryEventSink {
    fn log(&self, elapsed: Duration, event: Event) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((elapsed, event));
    }
}

// ============================================================================
// Fan-out
// ============================================================================

/// Forwards every event to each of its sinks in order
#[derive(Default)]
pub struct FanOutSink<'a> {
    sinks: Vec<&'a dyn EventSink>,
}

impl<'a> FanOutSink<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: &'a dyn EventSink) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanOutSink<'_> {
    fn log(&self, elapsed: Duration, event: Event) {
        for sink in &self.sinks {
            sink.log(elapsed, event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_pads_elapsed() {
        let line = format_line(Duration::from_millis(42), &Event::LastFinished);
        assert_eq!(line, "[    42 ms] last talker finished");
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemoryEventSink::new();
        sink.log(Duration::from_millis(1), Event::Joined { peer: 0 });
        sink.log(Duration::from_millis(2), Event::Joined { peer: 1 });
        sink.log(
            Duration::from_millis(3),
            Event::LineBusy {
                target: 1,
                caller: 0,
            },
        );

        assert_eq!(
            sink.events(),
            vec![
                Event::Joined { peer: 0 },
                Event::Joined { peer: 1 },
                Event::LineBusy {
                    target: 1,
                    caller: 0
                },
            ]
        );
        assert_eq!(sink.count(|e| matches!(e, Event::Joined { .. })), 2);
    }

    #[test]
    fn test_file_sink_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputs").join("run.log");

        let sink = FileEventSink::create(&path).unwrap();
        sink.log(Duration::from_millis(5), Event::Joined { peer: 0 });
        sink.log(
            Duration::from_millis(17),
            Event::Disconnected {
                peer: 0,
                remaining: 0,
            },
        );

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[     5 ms] talker 0 joined",
                "[    17 ms] talker 0 disconnected (0 remaining)",
            ]
        );
    }

    #[test]
    fn test_fan_out_reaches_file_and_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fan.log");
        let file = FileEventSink::create(&path).unwrap().without_console();
        let memory = MemoryEventSink::new();

        let sink = FanOutSink::new().with(&file).with(&memory);
        sink.log(
            Duration::from_millis(9),
            Event::AttemptsExhausted {
                caller: 0,
                attempts: 0,
            },
        );

        assert_eq!(memory.count(|e| matches!(e, Event::AttemptsExhausted { .. })), 1);
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
