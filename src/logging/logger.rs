// 日志记录器与事件构建器

use crate::logging::{Context, LevelWrite};
use chrono::Local;
use fanlog_common::Level;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

pub const LEVEL_FIELD: &str = "level";
pub const TIME_FIELD: &str = "time";
pub const MESSAGE_FIELD: &str = "message";
pub const ERROR_FIELD: &str = "error";

/// 由记录器自己写入的字段，上下文字段不能覆盖
pub(crate) const RESERVED_FIELDS: [&str; 3] = [LEVEL_FIELD, TIME_FIELD, MESSAGE_FIELD];

/// 时间字段格式，精确到微秒
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// 日志记录器
///
/// 克隆开销很小，写入器通过 `Arc` 共享。固定字段会出现在每条记录中。
#[derive(Clone)]
pub struct Logger {
    writer: Option<Arc<dyn LevelWrite>>,
    fields: Map<String, Value>,
    timestamp: bool,
}

impl Logger {
    /// 使用给定写入器创建记录器，不带时间字段
    pub fn new(writer: impl LevelWrite + 'static) -> Self {
        Self {
            writer: Some(Arc::new(writer)),
            fields: Map::new(),
            timestamp: false,
        }
    }

    /// 不输出任何内容的记录器
    pub fn disabled() -> Self {
        Self {
            writer: None,
            fields: Map::new(),
            timestamp: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    /// 每条记录附带时间字段
    pub fn with_timestamp(mut self) -> Self {
        self.timestamp = true;
        self
    }

    /// 追加一个固定字段
    pub fn with_str(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), Value::String(value.into()));
        self
    }

    /// 派生一个附带额外固定字段的记录器，不修改当前记录器
    pub fn with_fields(&self, identifiers: &HashMap<String, String>) -> Logger {
        let mut child = self.clone();
        for (key, value) in identifiers {
            child.fields.insert(key.clone(), Value::String(value.clone()));
        }
        child
    }

    /// 固定字段
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn event(&self, level: Level) -> Event {
        let Some(writer) = &self.writer else {
            return Event::disabled(level);
        };

        let mut fields = Map::with_capacity(self.fields.len() + 4);
        fields.insert(LEVEL_FIELD.to_string(), Value::String(level.as_str().to_string()));
        for (key, value) in &self.fields {
            fields.insert(key.clone(), value.clone());
        }

        Event {
            level,
            inner: Some(Box::new(EventInner {
                writer: writer.clone(),
                fields,
                timestamp: self.timestamp,
            })),
        }
    }

    pub fn trace(&self) -> Event {
        self.event(Level::Trace)
    }

    pub fn debug(&self) -> Event {
        self.event(Level::Debug)
    }

    pub fn info(&self) -> Event {
        self.event(Level::Info)
    }

    pub fn warn(&self) -> Event {
        self.event(Level::Warn)
    }

    pub fn error(&self) -> Event {
        self.event(Level::Error)
    }

    /// fatal 级别事件
    ///
    /// 事件发出后进程以状态码 1 退出。这是不可恢复错误的信号，而不只是一条消息。
    pub fn fatal(&self) -> Event {
        self.event(Level::Fatal)
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("enabled", &self.is_enabled())
            .field("fields", &self.fields)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

struct EventInner {
    writer: Arc<dyn LevelWrite>,
    fields: Map<String, Value>,
    timestamp: bool,
}

/// 日志事件构建器
///
/// 通过链式调用附加字段，最后调用 [`Event::msg`] 或 [`Event::send`] 发出。
/// 未发出的事件被丢弃时不写任何内容。
#[must_use = "事件需要调用 msg 或 send 才会写出"]
pub struct Event {
    level: Level,
    inner: Option<Box<EventInner>>,
}

impl Event {
    fn disabled(level: Level) -> Self {
        Self { level, inner: None }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// 是否会真正写出
    pub fn enabled(&self) -> bool {
        self.inner.is_some()
    }

    fn insert(mut self, key: impl Into<String>, value: Value) -> Self {
        if let Some(inner) = self.inner.as_mut() {
            inner.fields.insert(key.into(), value);
        }
        self
    }

    pub fn str(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, Value::String(value.into()))
    }

    pub fn int(self, key: impl Into<String>, value: i64) -> Self {
        self.insert(key, Value::from(value))
    }

    pub fn uint(self, key: impl Into<String>, value: u64) -> Self {
        self.insert(key, Value::from(value))
    }

    pub fn float(self, key: impl Into<String>, value: f64) -> Self {
        self.insert(key, Value::from(value))
    }

    pub fn bool(self, key: impl Into<String>, value: bool) -> Self {
        self.insert(key, Value::Bool(value))
    }

    /// 附加任意可序列化的值，序列化失败时记录失败原因
    pub fn field<T: Serialize + ?Sized>(self, key: impl Into<String>, value: &T) -> Self {
        if self.inner.is_none() {
            return self;
        }
        self.insert(key, to_json_value(value))
    }

    /// 以 `error` 字段记录错误
    pub fn err(self, err: &dyn std::error::Error) -> Self {
        self.insert(ERROR_FIELD, Value::String(err.to_string()))
    }

    /// 批量附加字段
    pub fn fields<K, V, I>(mut self, fields: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        if let Some(inner) = self.inner.as_mut() {
            for (key, value) in fields {
                inner.fields.insert(key.into(), value.into());
            }
        }
        self
    }

    /// 合并上下文中的 LogContext 字段，上下文未附带 LogContext 时原样返回
    pub fn with_context(mut self, ctx: &Context) -> Self {
        if let (Some(inner), Some(log_context)) = (self.inner.as_mut(), ctx.log_context()) {
            log_context.merge_into(&mut inner.fields);
        }
        self
    }

    /// 带消息发出事件
    pub fn msg(self, message: impl Display) {
        self.finish(Some(message.to_string()));
    }

    /// 不带消息发出事件
    pub fn send(self) {
        self.finish(None);
    }

    fn finish(self, message: Option<String>) {
        if let Some(inner) = self.inner {
            write_event(self.level, *inner, message);
        }

        if self.level == Level::Fatal {
            std::process::exit(1);
        }
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("level", &self.level)
            .field("fields", &self.inner.as_ref().map(|i| &i.fields))
            .finish()
    }
}

fn to_json_value<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| Value::String(format!("序列化失败: {}", e)))
}

pub(crate) fn current_time() -> String {
    Local::now().format(TIME_FORMAT).to_string()
}

fn write_event(level: Level, inner: EventInner, message: Option<String>) {
    let EventInner {
        writer,
        mut fields,
        timestamp,
    } = inner;

    if timestamp {
        fields.insert(TIME_FIELD.to_string(), Value::String(current_time()));
    }
    if let Some(message) = message {
        fields.insert(MESSAGE_FIELD.to_string(), Value::String(message));
    }

    let mut buf = match serde_json::to_vec(&fields) {
        Ok(buf) => buf,
        Err(e) => {
            eprintln!("fanlog: 日志事件序列化失败: {}", e);
            return;
        }
    };
    buf.push(b'\n');

    if let Err(e) = writer.write_level(level, &buf) {
        eprintln!("fanlog: 日志事件写入失败: {}", e);
    }
}
