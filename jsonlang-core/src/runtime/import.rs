//! 导入回调
//!
//! 核心从不访问文件系统：`import` / `importstr` 都交给宿主注入的回调解析。

/// 回调解析出的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedFile {
    /// 规范路径，作为导入值的去重键，也是导入单元的文件名
    pub canonical_path: String,
    pub content: String,
}

impl ImportedFile {
    pub fn new(canonical_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            canonical_path: canonical_path.into(),
            content: content.into(),
        }
    }
}

/// 宿主提供的导入解析
///
/// `dir` 为导入方所在目录（含末尾的 `/`，顶层文件为空串），`path` 为源码中的字面路径。
/// 返回 `Ok(None)` 表示找不到，`Err` 表示回调自身出错。
pub trait ImportCallback: Send + Sync {
    fn import(&self, dir: &str, path: &str) -> Result<Option<ImportedFile>, String>;
}

impl<F> ImportCallback for F
where
    F: Fn(&str, &str) -> Result<Option<ImportedFile>, String> + Send + Sync,
{
    fn import(&self, dir: &str, path: &str) -> Result<Option<ImportedFile>, String> {
        self(dir, path)
    }
}

/// 拒绝一切导入
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImports;

impl ImportCallback for NoImports {
    fn import(&self, _dir: &str, _path: &str) -> Result<Option<ImportedFile>, String> {
        Ok(None)
    }
}

/// 文件所在目录（到最后一个 `/` 为止，含 `/`）
pub fn dir_of(file: &str) -> &str {
    match file.rfind('/') {
        Some(i) => &file[..=i],
        None => "",
    }
}
