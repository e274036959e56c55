use thiserror::Error;

/// 页面结构解析错误。全部不可重试：直接中止当前页面的扫描，带上出问题的区块文本。
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no download links section found")]
    MissingDownloadSection,
    #[error("base game name {text:?} implies both NSP *and* XCI")]
    AmbiguousBaseGame { text: String },
    #[error("document ended while {expecting} (last block: {after:?})")]
    Exhausted {
        expecting: &'static str,
        after: String,
    },
    #[error("duplicate game index url: {0}")]
    DuplicateIndexUrl(String),
    #[error("invalid naming variation pattern: {0}")]
    InvalidNaming(String),
}

impl ScanError {
    pub fn is_structure(&self) -> bool {
        !self.is_exhaustion()
    }

    pub fn is_exhaustion(&self) -> bool {
        matches!(self, ScanError::Exhausted { .. })
    }
}
