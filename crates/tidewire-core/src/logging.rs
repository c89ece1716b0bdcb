//! Structured logging.
//!
//! Records are JSON lines by default (`{"timestamp","level","target",
//! "message","fields"}`) with a compact single-line alternative for
//! development. The sink is any `Write`; production deployments point it
//! at stderr or a file descriptor owned by the process supervisor.
//!
//! The server shell reports access events through its `on_access_log`
//! hook; [`Logger::access`] is the matching consumer.

use std::io::Write;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Map, Value};
use tidewire_http::connection::ServerConnection;
use tidewire_http::util::iso8601;

/// Severity, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Logger configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level to emit.
    pub level: LogLevel,
    /// JSON lines when true, compact text otherwise.
    pub json_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json_output: true,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_json_output(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }
}

/// A level-filtered writer of structured records.
pub struct Logger {
    config: LogConfig,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl Logger {
    /// Logger writing to stderr.
    #[must_use]
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            sink: Mutex::new(Box::new(std::io::stderr())),
        }
    }

    /// Logger writing to an arbitrary sink; tests capture output this way.
    #[must_use]
    pub fn with_sink(config: LogConfig, sink: Box<dyn Write + Send>) -> Self {
        Self {
            config,
            sink: Mutex::new(sink),
        }
    }

    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.config.level
    }

    /// Emit one record. Fields are structured key/value context.
    pub fn log(&self, level: LogLevel, target: &str, message: &str, fields: Map<String, Value>) {
        if !self.enabled(level) {
            return;
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let line = if self.config.json_output {
            let mut record = json!({
                "timestamp": iso8601(timestamp),
                "level": level.as_str(),
                "target": target,
                "message": message,
            });
            if !fields.is_empty() {
                record["fields"] = Value::Object(fields);
            }
            record.to_string()
        } else {
            let mut line = format!(
                "{} {:5} {} {}",
                iso8601(timestamp),
                level.as_str(),
                target,
                message
            );
            for (key, value) in &fields {
                line.push_str(&format!(" {key}={value}"));
            }
            line
        };

        if let Ok(mut sink) = self.sink.lock() {
            let _ = writeln!(sink, "{line}");
        }
    }

    pub fn debug(&self, target: &str, message: &str) {
        self.log(LogLevel::Debug, target, message, Map::new());
    }

    pub fn info(&self, target: &str, message: &str) {
        self.log(LogLevel::Info, target, message, Map::new());
    }

    pub fn warn(&self, target: &str, message: &str) {
        self.log(LogLevel::Warn, target, message, Map::new());
    }

    pub fn error(&self, target: &str, message: &str) {
        self.log(LogLevel::Error, target, message, Map::new());
    }

    /// Write an access record for a served reply; install as the server's
    /// `on_access_log` hook.
    pub fn access(&self, connection: &mut ServerConnection) {
        let mut fields = Map::new();
        fields.insert(
            "connection".into(),
            Value::from(connection.id()),
        );
        fields.insert(
            "method".into(),
            Value::from(connection.request().method.clone()),
        );
        fields.insert("uri".into(), Value::from(connection.request().uri.clone()));
        fields.insert(
            "status".into(),
            Value::from(connection.reply().status.code()),
        );
        fields.insert(
            "length".into(),
            Value::from(connection.reply().content.len()),
        );
        if let Some(addr) = connection.peer_addr() {
            fields.insert("peer".into(), Value::from(addr.to_string()));
        }

        self.log(LogLevel::Info, "access", "request served", fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    #[derive(Clone, Default)]
    struct SharedSink(Arc<StdMutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedSink {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn json_records_carry_fields() {
        let sink = SharedSink::default();
        let logger = Logger::with_sink(LogConfig::default(), Box::new(sink.clone()));

        let mut fields = Map::new();
        fields.insert("user".into(), Value::from("alice"));
        logger.log(LogLevel::Info, "auth", "login ok", fields);

        let record: Value = serde_json::from_str(sink.text().trim()).unwrap();
        assert_eq!(record["level"], "info");
        assert_eq!(record["target"], "auth");
        assert_eq!(record["message"], "login ok");
        assert_eq!(record["fields"]["user"], "alice");
        assert!(record["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn level_filter_suppresses_lower_records() {
        let sink = SharedSink::default();
        let logger = Logger::with_sink(
            LogConfig::new().with_level(LogLevel::Warn),
            Box::new(sink.clone()),
        );

        logger.info("t", "dropped");
        logger.warn("t", "kept");

        let text = sink.text();
        assert!(!text.contains("dropped"));
        assert!(text.contains("kept"));
    }

    #[test]
    fn compact_output_is_single_line_text() {
        let sink = SharedSink::default();
        let logger = Logger::with_sink(
            LogConfig::new().with_json_output(false),
            Box::new(sink.clone()),
        );

        logger.error("core", "boom");
        let text = sink.text();
        assert!(text.contains("error"));
        assert!(text.contains("core"));
        assert!(text.contains("boom"));
        assert!(!text.trim().contains('\n'));
    }
}
