use anyhow::Context as _;
use fanlog::{ConfigLoader, Context, LogContext, LoggingSetup};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化配置
    let config = ConfigLoader::init().context("加载日志配置失败")?;

    // 初始化日志系统，命令行入口允许控制台输出
    LoggingSetup::init(config, true).context("初始化日志系统失败")?;

    ConfigLoader::print_summary(config);

    fanlog::info()
        .str("version", env!("CARGO_PKG_VERSION"))
        .msg("启动 fanlog 演示");

    let worker_logger = fanlog::logger_with_identifiers(&HashMap::from([(
        "component".to_string(),
        "worker-pool".to_string(),
    )]));

    let root = Context::background();
    let mut handles = Vec::new();

    for worker in 0..3u64 {
        let log_context = Arc::new(LogContext::for_request());
        log_context.set("worker", worker);
        let ctx = root.child().with_log_context(log_context);
        let logger = worker_logger.clone();

        handles.push(tokio::spawn(async move {
            fanlog::debug_with_ctx(&ctx).msg("开始处理请求");

            tokio::select! {
                _ = ctx.cancelled() => {
                    fanlog::warn_with_ctx(&ctx).msg("请求被取消");
                }
                _ = tokio::time::sleep(Duration::from_millis(20 * (worker + 1))) => {
                    if let Some(lc) = ctx.log_context() {
                        lc.set("elapsed_ms", 20 * (worker + 1));
                    }
                    logger.info().with_context(&ctx).msg("请求处理完成");
                }
            }
        }));
    }

    for handle in handles {
        handle.await.context("工作任务异常退出")?;
    }

    fanlog::info().msg("演示结束");
    Ok(())
}
