//! 页面解析模块入口。
//!
//! 子模块：
//! - `html_utils`  — HTML → 区块序列（`Document` / `Block` / `Anchor`）
//! - `cursor`      — 只进不退的区块游标
//! - `classify`    — 区域/语言/类别/站点分类器与配置表视图
//! - `sub_parsers` — 本体与 DLC/Update 列表的子解析器
//! - `scanner`     — 发行扫描状态机
//! - `index`       — 游戏索引页
//! - `models`      — 发行目录数据模型

pub mod classify;
pub mod cursor;
pub mod error;
pub mod html_utils;
pub mod index;
pub mod models;
pub mod scanner;
pub mod sub_parsers;

use tracing::debug;

use crate::base_system::context::Config;

use error::ScanError;
use html_utils::Document;
use models::Catalogue;

/// 从一页游戏详情 HTML 得到发行目录。
pub fn parse_page(html: &str, config: &Config) -> Result<Catalogue, ScanError> {
    let doc = Document::from_html(html, &config.download_marker)?;
    debug!(target: "scanner", blocks = doc.len(), "下载区块已提取");
    scanner::scan_document(&doc, &config.scan_tables())
}
