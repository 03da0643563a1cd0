/// IO 抽象层 - trait 定义
use encoding_rs::Encoding;
use std::path::Path;
use crate::utils::VfxError;

/// 文本转储的原始内容
///
/// 除行内容外还记录换行风格、末尾换行和编码，写回时按原格式还原。
#[derive(Debug, Clone, PartialEq)]
pub struct RawTextData {
    pub lines: Vec<String>,
    /// 是否使用 `\r\n` 换行
    pub crlf: bool,
    /// 最后一行之后是否有换行
    pub trailing_newline: bool,
    /// 读取时使用的编码
    pub encoding: &'static Encoding,
}

impl RawTextData {
    /// 从已解码的文本构造（UTF-8）
    pub fn from_text(text: &str) -> Self {
        Self::from_decoded(text, encoding_rs::UTF_8)
    }

    pub(crate) fn from_decoded(text: &str, encoding: &'static Encoding) -> Self {
        let crlf = text.contains("\r\n");
        let trailing_newline = text.ends_with('\n');
        let lines = text
            .lines()
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();

        Self {
            lines,
            crlf,
            trailing_newline,
            encoding,
        }
    }

    /// 换上新的行内容，保留格式信息
    pub fn with_lines(&self, lines: Vec<String>) -> Self {
        Self {
            lines,
            crlf: self.crlf,
            trailing_newline: self.trailing_newline,
            encoding: self.encoding,
        }
    }

    pub fn line_ending(&self) -> &'static str {
        if self.crlf {
            "\r\n"
        } else {
            "\n"
        }
    }

    /// 拼接为完整文本
    pub fn to_text(&self) -> String {
        let mut text = self.lines.join(self.line_ending());
        if self.trailing_newline && !self.lines.is_empty() {
            text.push_str(self.line_ending());
        }
        text
    }
}

impl Default for RawTextData {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            crlf: false,
            trailing_newline: true,
            encoding: encoding_rs::UTF_8,
        }
    }
}

/// 文本转储读取 trait
///
/// # 职责
/// - 读取并解码文件，不负责解析
pub trait TextReader {
    fn read(&self, path: &Path) -> Result<RawTextData, VfxError>;
}

/// 文本转储写入 trait
pub trait TextWriter {
    fn write(&self, data: &RawTextData, path: &Path) -> Result<(), VfxError>;
}

/// 二进制⇄文本转换器
///
/// 核心从不直接调用转换器，由调用方在读取前和保存后使用。
pub trait BinConverter {
    fn bin_to_text(&self, bin: &Path, text: &Path) -> Result<(), VfxError>;

    fn text_to_bin(&self, text: &Path, bin: &Path) -> Result<(), VfxError>;
}
