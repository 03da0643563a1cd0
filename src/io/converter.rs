/// 外部转换器
///
/// 二进制⇄文本转换由外部可执行文件完成，这里只负责以子进程方式调用并检查退出状态。
/// 调用形式为 `<program> [args...] <input> <output>`，格式由转换器根据扩展名判断。
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;
use super::traits::BinConverter;
use crate::utils::VfxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalConverter {
    pub program: PathBuf,
    /// 放在输入输出路径之前的额外参数
    pub args: Vec<String>,
}

impl ExternalConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn run(&self, input: &Path, output: &Path) -> Result<(), VfxError> {
        debug!(
            program = %self.program.display(),
            input = %input.display(),
            output = %output.display(),
            "Running converter"
        );

        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(input)
            .arg(output)
            .output()
            .map_err(|e| {
                VfxError::Converter(format!("failed to start {}: {}", self.program.display(), e))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(VfxError::Converter(format!(
                "{} exited with {}: {}",
                self.program.display(),
                result.status,
                stderr.trim()
            )));
        }

        if !output.exists() {
            return Err(VfxError::Converter(format!(
                "{} produced no output at {}",
                self.program.display(),
                output.display()
            )));
        }

        Ok(())
    }
}

impl BinConverter for ExternalConverter {
    fn bin_to_text(&self, bin: &Path, text: &Path) -> Result<(), VfxError> {
        self.run(bin, text)
    }

    fn text_to_bin(&self, text: &Path, bin: &Path) -> Result<(), VfxError> {
        self.run(text, bin)
    }
}
