//! 只进不退的区块游标。
//!
//! 游标按值在扫描器与子解析器之间传递：谁拿着游标谁负责推进，推进后的位置通过返回值交回。

use super::error::ScanError;
use super::html_utils::{Block, Document};

#[derive(Debug, Clone, Copy)]
pub struct Cursor<'d> {
    blocks: &'d [Block],
    pos: usize,
}

impl<'d> Cursor<'d> {
    pub fn new(doc: &'d Document) -> Self {
        Self {
            blocks: &doc.blocks,
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn current(&self) -> Option<&'d Block> {
        self.blocks.get(self.pos)
    }

    /// 当前区块；已走到文档末尾时报 `Exhausted`，附上最后一个区块的文本。
    pub fn expect_current(&self, expecting: &'static str) -> Result<&'d Block, ScanError> {
        self.current().ok_or_else(|| ScanError::Exhausted {
            expecting,
            after: self
                .pos
                .checked_sub(1)
                .and_then(|i| self.blocks.get(i))
                .map(|b| b.text.clone())
                .unwrap_or_default(),
        })
    }

    pub fn advance(mut self, expecting: &'static str) -> Result<(Self, &'d Block), ScanError> {
        self.pos += 1;
        let block = self.expect_current(expecting)?;
        Ok((self, block))
    }

    /// 至少前进一步，然后跳过所有带链接的区块，停在第一个不带链接的区块上。
    pub fn advance_skipping_linked(
        self,
        expecting: &'static str,
    ) -> Result<(Self, &'d Block), ScanError> {
        let (mut cur, mut block) = self.advance(expecting)?;
        while block.has_links() {
            (cur, block) = cur.advance(expecting)?;
        }
        Ok((cur, block))
    }
}
