use thiserror::Error;
use std::path::Path;

/// 自定义错误类型
///
/// 只用于真正需要中止的情况（IO、配置、外部转换器）。
/// 解析和变更过程中的局部异常见 `diagnostics`，它们从不作为错误返回。
#[derive(Error, Debug)]
pub enum VfxError {
    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Emitter not found: {0}")]
    EmitterNotFound(String),

    #[error("Nothing to {0}")]
    EmptyHistory(&'static str),

    #[error("Converter error: {0}")]
    Converter(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// 创建文件备份
pub fn create_backup(file_path: &Path) -> Result<std::path::PathBuf, VfxError> {
    if !file_path.exists() {
        return Err(VfxError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "原文件不存在"
        )));
    }

    let timestamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
    let extension = file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!("{}.{}.bak", ext, timestamp))
        .unwrap_or_else(|| format!("{}.bak", timestamp));
    let backup_path = file_path.with_extension(extension);

    std::fs::copy(file_path, &backup_path)
        .map_err(VfxError::IoError)?;

    Ok(backup_path)
}
