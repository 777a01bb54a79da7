//! Operator-facing output channel.
//!
//! Lines go straight to stdout when the process is talking to a person or a
//! streaming controller. Otherwise they are collected so they can travel in
//! `RemoteResult.messages`.

use std::fmt;

pub const RULE_WIDTH: usize = 69;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn prefix(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO ",
            LogLevel::Warn => "WARN ",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_end())
    }
}

#[derive(Debug)]
enum Sink {
    Stdout,
    Memory(Vec<String>),
    Collect(Vec<String>),
}

#[derive(Debug)]
pub struct Console {
    threshold: LogLevel,
    sink: Sink,
}

impl Console {
    /// Print lines directly to stdout.
    pub fn stdout(threshold: LogLevel) -> Self {
        Self {
            threshold,
            sink: Sink::Stdout,
        }
    }

    /// Gather lines for shipment in a `RemoteResult`.
    pub fn collecting(threshold: LogLevel) -> Self {
        Self {
            threshold,
            sink: Sink::Collect(Vec::new()),
        }
    }

    /// Keep output in memory so it can be inspected (for testing).
    pub fn memory(threshold: LogLevel) -> Self {
        Self {
            threshold,
            sink: Sink::Memory(Vec::new()),
        }
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.threshold
    }

    /// True when lines reach the operator as they are written.
    pub fn is_direct(&self) -> bool {
        !matches!(self.sink, Sink::Collect(_))
    }

    fn emit(&mut self, line: String) {
        match &mut self.sink {
            Sink::Stdout => println!("{line}"),
            Sink::Memory(lines) | Sink::Collect(lines) => lines.push(line),
        }
    }

    /// Write a leveled message. Empty messages produce a blank line.
    pub fn write(&mut self, level: LogLevel, host: Option<&str>, message: &str) {
        if !self.enabled(level) {
            return;
        }
        if message.is_empty() {
            self.emit(String::new());
            return;
        }
        let prefix = match host {
            Some(host) => format!("{} >> {host} >> ", level.prefix()),
            None => format!("{} >> ", level.prefix()),
        };
        for line in message.lines() {
            self.emit(format!("{prefix}{line}"));
        }
    }

    /// Write text without a level prefix.
    pub fn raw(&mut self, level: LogLevel, text: &str) {
        if !self.enabled(level) {
            return;
        }
        for line in text.lines() {
            self.emit(line.to_string());
        }
    }

    pub fn header(&mut self, level: LogLevel, title: &str) {
        if !self.enabled(level) {
            return;
        }
        let rule = "#".repeat(RULE_WIDTH);
        self.emit(rule.clone());
        self.emit(format!("# {title}"));
        self.emit(rule);
    }

    pub fn divider(&mut self, level: LogLevel) {
        if !self.enabled(level) {
            return;
        }
        self.emit("-".repeat(RULE_WIDTH));
    }

    /// Drain lines gathered by a collecting or memory console.
    pub fn take_lines(&mut self) -> Vec<String> {
        match &mut self.sink {
            Sink::Stdout => Vec::new(),
            Sink::Memory(lines) | Sink::Collect(lines) => std::mem::take(lines),
        }
    }

    /// Everything written so far to a memory console, newline-joined.
    pub fn captured(&self) -> String {
        match &self.sink {
            Sink::Stdout => String::new(),
            Sink::Memory(lines) | Sink::Collect(lines) => lines.join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_include_host_when_known() {
        let mut console = Console::memory(LogLevel::Info);
        console.write(LogLevel::Info, Some("db1"), "Checking");
        console.write(LogLevel::Error, None, "Broken");

        assert_eq!(console.captured(), "INFO  >> db1 >> Checking\nERROR >> Broken");
    }

    #[test]
    fn levels_below_threshold_are_dropped() {
        let mut console = Console::memory(LogLevel::Warn);
        console.write(LogLevel::Info, None, "hidden");
        console.divider(LogLevel::Info);
        console.write(LogLevel::Warn, None, "shown");

        assert_eq!(console.captured(), "WARN  >> shown");
    }

    #[test]
    fn header_is_framed_by_rules() {
        let mut console = Console::collecting(LogLevel::Info);
        console.header(LogLevel::Info, "Local deploy /opt/continuent");

        let lines = console.take_lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "#".repeat(RULE_WIDTH));
        assert_eq!(lines[1], "# Local deploy /opt/continuent");
        assert!(!console.is_direct());
    }
}
