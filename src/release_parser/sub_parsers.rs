//! 本体（多区块、多站点）与行内（DLC/Update）两种列表的解析。
//!
//! 两个子解析器都接管游标：从标题区块开始推进，返回停下的位置和本次产出的条目。

use tracing::debug;

use super::classify::{ScanTables, find_site, match_category};
use super::cursor::Cursor;
use super::error::ScanError;
use super::html_utils::Block;
use super::models::{CategoryKind, DownloadEntry, EntryKind, EntryMap};

const NSP: &str = "NSP";
const XCI: &str = "XCI";

/// 本体标题里的 NSP/XCI 标记决定条目键；两者都有视为格式错误。
pub fn base_game_kind(text: &str) -> Result<EntryKind, ScanError> {
    match (text.contains(NSP), text.contains(XCI)) {
        (true, false) => Ok(EntryKind::BaseGameNsp),
        (false, true) => Ok(EntryKind::BaseGameXci),
        (false, false) => Ok(EntryKind::BaseGameUndefined),
        (true, true) => Err(ScanError::AmbiguousBaseGame {
            text: text.to_string(),
        }),
    }
}

pub fn parse_base_game<'d>(
    cursor: Cursor<'d>,
    tables: &ScanTables<'_>,
) -> Result<(Cursor<'d>, EntryMap), ScanError> {
    let header = cursor.expect_current("reading a base game header")?;
    let kind = base_game_kind(&header.text)?;

    let mut base = DownloadEntry::new(&header.text);
    // 同一站点横幅下偶尔夹着 DLC/Update 链接，分流到同级条目
    let mut diverted: Vec<(EntryKind, DownloadEntry)> = Vec::new();

    let mut cur = cursor;
    loop {
        let block;
        (cur, block) = cur.advance("collecting base game links")?;
        let Some(site) = find_site(&block.text, tables.dl_sites) else {
            break;
        };
        collect_site_block(block, site, tables, &mut base, &mut diverted);
    }

    // 收尾：越过仍带链接的分卷区块
    let (cur, _) = cur.advance_skipping_linked("closing a base game listing")?;

    debug!(
        target: "scanner",
        kind = %kind,
        sites = base.links_by_site.len(),
        diverted = diverted.len(),
        "本体列表解析完成"
    );

    let mut out: EntryMap = vec![(kind, base)];
    out.extend(diverted);
    Ok((cur, out))
}

fn collect_site_block(
    block: &Block,
    site: &str,
    tables: &ScanTables<'_>,
    base: &mut DownloadEntry,
    diverted: &mut Vec<(EntryKind, DownloadEntry)>,
) {
    // a later block may name the same site again (multi-part), keep appending
    base.links_by_site.entry(site.to_string()).or_default();

    for anchor in block.anchors.iter().filter(|a| !a.is_phantom()) {
        let sibling = match_category(&anchor.text, tables.categories)
            .and_then(CategoryKind::inline_kind);
        match sibling {
            Some(kind) => {
                let idx = match diverted.iter().position(|(k, _)| *k == kind) {
                    Some(i) => i,
                    None => {
                        diverted.push((kind, DownloadEntry::new(&anchor.text)));
                        diverted.len() - 1
                    }
                };
                diverted[idx].1.push_link(site, &anchor.href);
            }
            None => base.push_link(site, &anchor.href),
        }
    }
}

pub fn parse_inline<'d>(
    cursor: Cursor<'d>,
    kind: EntryKind,
    tables: &ScanTables<'_>,
) -> Result<(Cursor<'d>, EntryMap), ScanError> {
    let header = cursor.expect_current("reading an inline header")?;
    let mut entry = DownloadEntry::new(&header.text);

    let (cur, block) = cursor.advance("reading inline links")?;
    for anchor in block.anchors.iter().filter(|a| !a.is_phantom()) {
        if let Some(site) = find_site(&anchor.text, tables.dl_sites) {
            entry.push_link(site, &anchor.href);
        }
    }

    let (cur, _) = cur.advance_skipping_linked("closing an inline listing")?;
    debug!(target: "scanner", kind = %kind, sites = entry.links_by_site.len(), "行内列表解析完成");
    Ok((cur, vec![(kind, entry)]))
}
