//! 内存导入器
//!
//! 路径 -> 内容的映射，供嵌入方和测试使用。相对路径基于导入方目录解析，
//! `.` 与 `..` 段在查表前规范化。

use jsonlang_core::{ImportCallback, ImportedFile};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryImporter {
    files: BTreeMap<String, String>,
}

impl MemoryImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, content: &str) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: &str, content: &str) {
        self.files.insert(normalize(path), content.to_string());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn is_directory(&self, path: &str) -> bool {
        let prefix = format!("{path}/");
        self.files.keys().any(|key| key.starts_with(&prefix))
    }
}

impl ImportCallback for MemoryImporter {
    fn import(&self, dir: &str, path: &str) -> Result<Option<ImportedFile>, String> {
        if path.is_empty() {
            return Err("empty import path".to_string());
        }
        if path.ends_with('/') {
            return Err("is a directory".to_string());
        }
        let joined = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{dir}{path}")
        };
        let canonical = normalize(&joined);
        match self.files.get(&canonical) {
            Some(content) => Ok(Some(ImportedFile::new(canonical, content.clone()))),
            None if self.is_directory(&canonical) => Err("is a directory".to_string()),
            None => Ok(None),
        }
    }
}

/// 去掉 `.` 段，`..` 回退一级（不越过根）
fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}
