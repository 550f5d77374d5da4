//! API 类型定义
//!
//! 求值的输出类型。

use std::collections::BTreeMap;

/// 按输出模式区分的求值结果，每个文档都以换行结尾
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutput {
    /// 单个文档
    Regular(String),
    /// 文件名 -> 文档
    Multi(BTreeMap<String, String>),
    /// 文档流
    Stream(Vec<String>),
}

impl EvalOutput {
    /// 单文档结果（非 regular 模式为 None）
    pub fn as_regular(&self) -> Option<&str> {
        match self {
            EvalOutput::Regular(doc) => Some(doc),
            _ => None,
        }
    }

    /// 文档数量
    pub fn document_count(&self) -> usize {
        match self {
            EvalOutput::Regular(_) => 1,
            EvalOutput::Multi(files) => files.len(),
            EvalOutput::Stream(docs) => docs.len(),
        }
    }
}
