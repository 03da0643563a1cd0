/// 文本转储 IO 实现
///
/// 提供基于文件系统的默认读写实现
use encoding_rs::Encoding;
use std::path::Path;
use tracing::{debug, warn};
use super::traits::{RawTextData, TextReader, TextWriter};
use crate::utils::{create_backup, VfxError};

/// 默认的文本读取器（基于 std::fs）
///
/// 优先按 UTF-8（含 BOM 检测）解码，失败时退回 `fallback`。
#[derive(Debug, Clone)]
pub struct DefaultTextReader {
    pub fallback: &'static Encoding,
}

impl Default for DefaultTextReader {
    fn default() -> Self {
        Self {
            fallback: encoding_rs::WINDOWS_1252,
        }
    }
}

impl DefaultTextReader {
    pub fn with_fallback(fallback: &'static Encoding) -> Self {
        Self { fallback }
    }

    /// 解码字节
    pub fn decode(&self, bytes: &[u8]) -> RawTextData {
        let (text, encoding, had_errors) = encoding_rs::UTF_8.decode(bytes);
        if !had_errors {
            return RawTextData::from_decoded(&text, encoding);
        }

        warn!(fallback = self.fallback.name(), "Text is not valid UTF-8, using fallback encoding");
        let (text, encoding, _) = self.fallback.decode(bytes);
        RawTextData::from_decoded(&text, encoding)
    }
}

impl TextReader for DefaultTextReader {
    fn read(&self, path: &Path) -> Result<RawTextData, VfxError> {
        let bytes = std::fs::read(path)?;
        let data = self.decode(&bytes);
        debug!(path = %path.display(), lines = data.lines.len(), encoding = data.encoding.name(), "Read text dump");
        Ok(data)
    }
}

/// 默认的文本写入器（基于 std::fs）
#[derive(Debug, Clone, Default)]
pub struct DefaultTextWriter {
    /// 覆盖已有文件前先创建带时间戳的备份
    pub backup: bool,
}

impl DefaultTextWriter {
    pub fn with_backup() -> Self {
        Self { backup: true }
    }
}

impl TextWriter for DefaultTextWriter {
    fn write(&self, data: &RawTextData, path: &Path) -> Result<(), VfxError> {
        // 确保父目录存在
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        if self.backup && path.exists() {
            let backup = create_backup(path)?;
            debug!(backup = %backup.display(), "Created backup");
        }

        let text = data.to_text();
        let (bytes, _, had_errors) = data.encoding.encode(&text);
        if had_errors {
            warn!(encoding = data.encoding.name(), "Some characters could not be encoded");
        }
        std::fs::write(path, &bytes)?;
        Ok(())
    }
}
