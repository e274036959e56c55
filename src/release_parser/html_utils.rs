//! HTML → 区块序列。
//!
//! 页面没有结构化数据：从「Download Links」粗体标题开始，之后的每个 `<p>` 就是一个区块，
//! 扫描器只看区块文本和其中的 `<a href>`。

use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

use super::error::ScanError;

fn sel_marker_or_block() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    S.get_or_init(|| Selector::parse("strong, p").unwrap())
}

fn sel_anchor() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    S.get_or_init(|| Selector::parse("a[href]").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub text: String,
    pub href: String,
}

impl Anchor {
    /// 空文本的「幽灵」链接在所有子解析器里都跳过。
    pub fn is_phantom(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub text: String,
    pub anchors: Vec<Anchor>,
}

impl Block {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            anchors: Vec::new(),
        }
    }

    pub fn with_anchor(mut self, text: &str, href: &str) -> Self {
        self.anchors.push(Anchor {
            text: text.to_string(),
            href: href.to_string(),
        });
        self
    }

    /// 至少有一个 href 非空的链接。
    pub fn has_links(&self) -> bool {
        self.anchors.iter().any(|a| !a.href.is_empty())
    }

    fn from_element(el: ElementRef<'_>) -> Self {
        let text: String = el.text().collect();
        let anchors = el
            .select(sel_anchor())
            .filter_map(|a| {
                let href = a.value().attr("href")?.trim();
                if href.is_empty() {
                    return None;
                }
                Some(Anchor {
                    text: a.text().collect(),
                    href: href.to_string(),
                })
            })
            .collect();
        Self { text, anchors }
    }
}

/// 只读的区块序列，扫描器通过 `Cursor` 顺序访问。
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// 找到第一个文本包含 `marker`（不区分大小写）的 `<strong>`，收集其后所有 `<p>`。
    pub fn from_html(html: &str, marker: &str) -> Result<Self, ScanError> {
        let page = Html::parse_document(html);
        let marker = marker.to_lowercase();

        let mut found = false;
        let mut blocks = Vec::new();
        for el in page.select(sel_marker_or_block()) {
            let name = el.value().name();
            if !found {
                if name == "strong" && element_text(el).to_lowercase().contains(&marker) {
                    found = true;
                }
                continue;
            }
            if name == "p" {
                blocks.push(Block::from_element(el));
            }
        }

        if !found {
            return Err(ScanError::MissingDownloadSection);
        }
        Ok(Self { blocks })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_paragraphs_after_marker_only() {
        let html = r#"
            <p>Intro <a href="https://x">skip me</a></p>
            <p><strong>Download Links</strong></p>
            <p><strong>USA [English]</strong></p>
            <p>1Fichier: <a href="https://ouo.io/abc">Part 1</a> <a href="">empty</a></p>
        "#;
        let doc = Document::from_html(html, "download links").unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.blocks[0].text, "USA [English]");
        assert_eq!(doc.blocks[1].anchors.len(), 1);
        assert_eq!(doc.blocks[1].anchors[0].href, "https://ouo.io/abc");
        assert!(doc.blocks[1].has_links());
        assert!(!doc.blocks[0].has_links());
    }

    #[test]
    fn missing_marker_is_structure_error() {
        let err = Document::from_html("<p>nothing here</p>", "download links").unwrap_err();
        assert!(matches!(err, ScanError::MissingDownloadSection));
        assert!(err.is_structure());
    }
}
