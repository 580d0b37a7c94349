// 日志上下文管理
// 请求级别的字段集合，随请求上下文传递并合并到每条日志

use crate::logging::Event;
use crate::logging::logger::RESERVED_FIELDS;
use crate::logging::setup;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 请求 ID 字段名
pub const REQUEST_ID_FIELD: &str = "request_id";

/// 日志上下文
///
/// 读写锁保护的字段集合。`set` 持有写锁，`get`、克隆和日志合并持有读锁，
/// 因此日志看到的总是某一时刻的完整快照。
#[derive(Debug, Default)]
pub struct LogContext {
    values: RwLock<BTreeMap<String, Value>>,
}

impl LogContext {
    /// 创建空的日志上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带随机请求 ID 的日志上下文
    pub fn for_request() -> Self {
        let context = Self::new();
        context.set(REQUEST_ID_FIELD, Uuid::new_v4().to_string());
        context
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Value>> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Value>> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 设置字段，键冲突时后写覆盖
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.write().insert(key.into(), value.into());
        self
    }

    /// 设置任意可序列化的值，序列化失败时存入失败原因
    pub fn set_serialized<T: Serialize + ?Sized>(&self, key: impl Into<String>, value: &T) -> &Self {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|e| Value::String(format!("序列化失败: {}", e)));
        self.set(key, value)
    }

    /// 读取字段
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// 当前全部字段的副本
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.read().clone()
    }

    /// 在读锁下把全部字段写入事件字段，跳过 level/time/message
    pub(crate) fn merge_into(&self, fields: &mut Map<String, Value>) {
        for (key, value) in self.read().iter() {
            if RESERVED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            fields.insert(key.clone(), value.clone());
        }
    }
}

impl Clone for LogContext {
    /// 复制当前全部字段，之后两者互不影响
    fn clone(&self) -> Self {
        Self {
            values: RwLock::new(self.snapshot()),
        }
    }
}

/// 请求上下文
///
/// 携带取消令牌和至多一个日志上下文。克隆开销很小，派生出的上下文共享父级的取消状态。
/// 日志调用不关心取消状态，已取消的上下文仍可正常记录日志。
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    log_context: Option<Arc<LogContext>>,
}

impl Context {
    /// 根上下文，不带日志上下文
    pub fn background() -> Self {
        Self::default()
    }

    /// 派生子上下文：父级取消时子级一起取消，子级取消不影响父级
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            log_context: self.log_context.clone(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 等待上下文被取消
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// 派生附带指定日志上下文的上下文，替换已有的日志上下文
    pub fn with_log_context(&self, log_context: Arc<LogContext>) -> Self {
        Self {
            token: self.token.clone(),
            log_context: Some(log_context),
        }
    }

    /// 派生附带全新空日志上下文的上下文
    pub fn with_fresh_log_context(&self) -> Self {
        self.with_log_context(Arc::new(LogContext::new()))
    }

    /// 取出日志上下文，未附带时返回 None
    pub fn log_context(&self) -> Option<&Arc<LogContext>> {
        self.log_context.as_ref()
    }
}

/// 带上下文字段的 trace 事件
pub fn trace_with_ctx(ctx: &Context) -> Event {
    setup::trace().with_context(ctx)
}

/// 带上下文字段的 debug 事件
pub fn debug_with_ctx(ctx: &Context) -> Event {
    setup::debug().with_context(ctx)
}

/// 带上下文字段的 info 事件
pub fn info_with_ctx(ctx: &Context) -> Event {
    setup::info().with_context(ctx)
}

/// 带上下文字段的 warn 事件
pub fn warn_with_ctx(ctx: &Context) -> Event {
    setup::warn().with_context(ctx)
}

/// 带上下文字段的 error 事件
pub fn error_with_ctx(ctx: &Context) -> Event {
    setup::error().with_context(ctx)
}

/// 带上下文字段的 fatal 事件，发出后进程退出
pub fn fatal_with_ctx(ctx: &Context) -> Event {
    setup::fatal().with_context(ctx)
}
