use serde_json::{Map, Value};

/// Logger channel every notifier event is emitted under.
pub const LOG_CHANNEL: &str = "IndexNowNotifier";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

pub type LogContext<'a> = &'a [(&'a str, String)];

/// Structured log sink the notifier and hooks write to.
pub trait NotifyLog {
    fn log(&self, level: LogLevel, message: &str, context: LogContext<'_>);

    fn info(&self, message: &str, context: LogContext<'_>) {
        self.log(LogLevel::Info, message, context);
    }

    fn warning(&self, message: &str, context: LogContext<'_>) {
        self.log(LogLevel::Warning, message, context);
    }

    fn error(&self, message: &str, context: LogContext<'_>) {
        self.log(LogLevel::Error, message, context);
    }
}

impl<L: NotifyLog + ?Sized> NotifyLog for &L {
    fn log(&self, level: LogLevel, message: &str, context: LogContext<'_>) {
        (**self).log(level, message, context);
    }
}

/// Forwards to `tracing` under the [`LOG_CHANNEL`] target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl NotifyLog for TracingLog {
    fn log(&self, level: LogLevel, message: &str, context: LogContext<'_>) {
        let context = render_context(context);
        match level {
            LogLevel::Info => tracing::info!(target: LOG_CHANNEL, %context, "{message}"),
            LogLevel::Warning => tracing::warn!(target: LOG_CHANNEL, %context, "{message}"),
            LogLevel::Error => tracing::error!(target: LOG_CHANNEL, %context, "{message}"),
        }
    }
}

pub fn render_context(context: LogContext<'_>) -> String {
    let mut map = Map::new();
    for (key, value) in context {
        map.insert((*key).to_string(), Value::String(value.clone()));
    }
    Value::Object(map).to_string()
}


#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn render_context_produces_json_object() {
        let rendered = render_context(&[
            ("url", "https://wiki.example.com/wiki/A".to_string()),
            ("http_code", "200".to_string()),
        ]);
        let value: Value = serde_json::from_str(&rendered).expect("json");
        assert_eq!(value["url"], "https://wiki.example.com/wiki/A");
        assert_eq!(value["http_code"], "200");
    }

    #[test]
    fn level_names() {
        assert_eq!(LogLevel::Warning.as_str(), "warning");
        assert_eq!(LogLevel::Error.as_str(), "error");
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("buffer lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(emit: impl FnOnce()) -> String {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_target(true)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, emit);
        let bytes = buffer.0.lock().expect("buffer lock").clone();
        String::from_utf8(bytes).expect("utf8 log output")
    }

    #[test]
    fn tracing_log_emits_under_channel_with_context() {
        let output = capture(|| {
            TracingLog.warning(
                "IndexNowKey not configured. Skipping submission.",
                &[("url", "https://wiki.example.com/wiki/A".to_string())],
            );
        });
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains(LOG_CHANNEL), "{output}");
        assert!(output.contains("IndexNowKey not configured"), "{output}");
        assert!(
            output.contains(r#"context={"url":"https://wiki.example.com/wiki/A"}"#),
            "{output}"
        );
    }

    #[test]
    fn tracing_log_maps_each_level() {
        let output = capture(|| {
            TracingLog.info("submitted", &[]);
            TracingLog.error("failed", &[]);
        });
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2, "{output}");
        assert!(lines[0].contains("INFO") && lines[0].contains("submitted"));
        assert!(lines[1].contains("ERROR") && lines[1].contains("failed"));
        assert!(lines.iter().all(|line| line.contains("context={}")));
    }
}
