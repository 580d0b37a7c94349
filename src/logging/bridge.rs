// tracing 桥接
// 把 tracing 事件转换成扇出日志事件

use crate::logging::{Logger, setup};
use fanlog_common::Level;
use serde_json::{Map, Value};
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// tracing 目标字段名
pub const TARGET_FIELD: &str = "target";

/// 转发 tracing 事件的层
///
/// 未指定记录器时，每个事件发出时读取全局记录器。
#[derive(Debug, Clone, Default)]
pub struct FanoutLayer {
    logger: Option<Logger>,
}

impl FanoutLayer {
    /// 写入全局记录器
    pub fn global() -> Self {
        Self::default()
    }

    /// 写入指定记录器
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: Some(logger),
        }
    }
}

/// tracing 没有 fatal 级别，其余一一对应
pub fn map_level(level: &tracing::Level) -> Level {
    if *level == tracing::Level::TRACE {
        Level::Trace
    } else if *level == tracing::Level::DEBUG {
        Level::Debug
    } else if *level == tracing::Level::INFO {
        Level::Info
    } else if *level == tracing::Level::WARN {
        Level::Warn
    } else {
        Level::Error
    }
}

impl<S: Subscriber> Layer<S> for FanoutLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = map_level(metadata.level());

        let entry = match &self.logger {
            Some(logger) => logger.event(level),
            None => setup::event(level),
        };
        if !entry.enabled() {
            return;
        }

        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let entry = entry
            .str(TARGET_FIELD, metadata.target())
            .fields(visitor.fields);

        match visitor.message {
            Some(message) => entry.msg(message),
            None => entry.send(),
        }
    }
}

/// 收集 tracing 字段
#[derive(Default)]
struct JsonVisitor {
    fields: Map<String, Value>,
    message: Option<String>,
}

impl JsonVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for JsonVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{:?}", value)));
    }
}
