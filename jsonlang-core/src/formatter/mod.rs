//! 格式化器
//!
//! - [`json`]：求值结果的规范 JSON 文本
//! - [`source`]：源码的规范化重排

pub mod json;
pub mod source;

use crate::compiler::{parse_source, StaticError};
use jsonlang_config::FmtConfig;
use jsonlang_log::{debug, Logger};
use std::sync::Arc;

/// 解析源码并按 `config` 重新打印
pub fn format_source(
    file: &str,
    text: &str,
    config: &FmtConfig,
    logger: &Arc<Logger>,
) -> Result<String, StaticError> {
    let ast = parse_source(file, text, logger)?;
    let out = source::format_expr(&ast, config);
    debug!(logger, "Formatted {}: {} -> {} bytes", file, text.len(), out.len());
    Ok(out)
}
