// 控制台输出

use crate::logging::LevelWrite;
use crate::logging::logger::{LEVEL_FIELD, MESSAGE_FIELD, TIME_FIELD, TIME_FORMAT};
use chrono::{Local, NaiveDateTime, TimeZone};
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// 控制台写入器
///
/// 原始模式直接输出 JSON 行；美化模式输出
/// `<时间> | INFO  | <消息> key=value ...`。
pub struct ConsoleWriter {
    out: Mutex<Box<dyn Write + Send>>,
    beautify: bool,
}

impl ConsoleWriter {
    pub fn new(out: impl Write + Send + 'static, beautify: bool) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            beautify,
        }
    }

    /// 写到标准输出
    pub fn stdout(beautify: bool) -> Self {
        Self::new(io::stdout(), beautify)
    }
}

impl LevelWrite for ConsoleWriter {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);

        if self.beautify {
            if let Some(line) = beautify_line(buf) {
                out.write_all(line.as_bytes())?;
                out.flush()?;
                return Ok(buf.len());
            }
        }

        out.write_all(buf)?;
        out.flush()?;
        Ok(buf.len())
    }
}

impl std::fmt::Debug for ConsoleWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleWriter")
            .field("beautify", &self.beautify)
            .finish()
    }
}

/// 级别标签: 大写、定宽、竖线包围
pub fn format_level_label(level: &str) -> String {
    format!("| {:<6}|", level).to_uppercase()
}

/// 把一条 JSON 记录转换成易读的单行文本，无法解析时返回 None
pub fn beautify_line(buf: &[u8]) -> Option<String> {
    let record: Map<String, Value> = serde_json::from_slice(buf).ok()?;

    let mut parts = Vec::new();

    if let Some(time) = record.get(TIME_FIELD).and_then(Value::as_str) {
        parts.push(format_time(time));
    }

    let level = record
        .get(LEVEL_FIELD)
        .and_then(Value::as_str)
        .unwrap_or("???");
    parts.push(format_level_label(level));

    if let Some(message) = record.get(MESSAGE_FIELD) {
        parts.push(plain_value(message));
    }

    let mut fields: Vec<(&String, &Value)> = record
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), TIME_FIELD | LEVEL_FIELD | MESSAGE_FIELD))
        .collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (key, value) in fields {
        parts.push(format!("{}={}", key, quoted_value(value)));
    }

    let mut line = parts.join(" ");
    line.push('\n');
    Some(line)
}

fn format_time(time: &str) -> String {
    NaiveDateTime::parse_from_str(time, TIME_FORMAT)
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).single())
        .map(|local| local.to_rfc3339_opts(chrono::SecondsFormat::Secs, false))
        .unwrap_or_else(|| time.to_string())
}

fn plain_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn quoted_value(value: &Value) -> String {
    match value {
        Value::String(s) if s.is_empty() || s.contains(char::is_whitespace) => {
            Value::String(s.clone()).to_string()
        }
        other => plain_value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Shared {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_level_label() {
        assert_eq!(format_level_label("info"), "| INFO  |");
        assert_eq!(format_level_label("error"), "| ERROR |");
        assert_eq!(format_level_label("fatal"), "| FATAL |");
    }

    #[test]
    fn test_raw_console_passes_json_through() {
        let out = Shared::default();
        let console = ConsoleWriter::new(out.clone(), false);

        let line = b"{\"level\":\"info\",\"message\":\"hi\"}\n";
        assert_eq!(console.write(line).unwrap(), line.len());

        assert_eq!(out.contents().as_bytes(), line);
    }

    #[test]
    fn test_beautified_console() {
        let out = Shared::default();
        let console = ConsoleWriter::new(out.clone(), true);

        let line = b"{\"level\":\"warn\",\"host\":\"svc\",\"user\":\"bob smith\",\"count\":3,\"message\":\"disk low\"}\n";
        console.write(line).unwrap();

        assert_eq!(
            out.contents(),
            "| WARN  | disk low count=3 host=svc user=\"bob smith\"\n"
        );
    }

    #[test]
    fn test_beautified_console_falls_back_to_raw() {
        let out = Shared::default();
        let console = ConsoleWriter::new(out.clone(), true);

        console.write(b"not json\n").unwrap();

        assert_eq!(out.contents(), "not json\n");
    }

    #[test]
    fn test_unparseable_time_is_kept() {
        let line = beautify_line(b"{\"time\":\"yesterday\",\"level\":\"info\"}").unwrap();
        assert_eq!(line, "yesterday | INFO  |\n");
    }
}
