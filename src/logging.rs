use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use anyhow::Result;

/// 初始化日志系统
pub fn init_logging(
    log_level: &str,
    log_format: Option<&str>,
    log_file: Option<&str>,
    quiet: bool,
) -> Result<()> {
    // 如果静默模式，只输出错误
    let level = if quiet {
        "error"
    } else {
        log_level
    };

    // 解析日志级别
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    // 可选的文件输出（按天滚动，无颜色）
    // 预先解析路径（非泛型部分），文件层在各分支内按需构造，
    // 以便每个分支独立推断订阅者类型。
    let file_target = log_file.map(|path| {
        let path = Path::new(path);
        let dir = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "privchat-media.log".to_string());
        (dir, name)
    });

    // 根据格式选择不同的输出方式
    match log_format {
        Some("json") => {
            // JSON 格式（适合生产环境）
            let file_layer = file_target.as_ref().map(|(dir, name)| {
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(tracing_appender::rolling::daily(dir, name))
            });
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .with(file_layer)
                .init();
        }
        Some("pretty") | Some("dev") => {
            // Pretty 格式（适合开发环境）
            let file_layer = file_target.as_ref().map(|(dir, name)| {
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(tracing_appender::rolling::daily(dir, name))
            });
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .with(file_layer)
                .init();
        }
        _ => {
            // Compact 格式（默认）
            let file_layer = file_target.as_ref().map(|(dir, name)| {
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(tracing_appender::rolling::daily(dir, name))
            });
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact())
                .with(file_layer)
                .init();
        }
    }

    Ok(())
}
