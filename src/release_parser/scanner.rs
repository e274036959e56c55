//! 发行扫描器：区块序列 → 发行目录。
//!
//! 每个发行先读标题（区域/语言），再循环识别类别区块并交给对应子解析器；
//! 一个发行一条条目都没收到时视为结构化区段结束（第一个发行也一样，此时目录为空）。

use tracing::{debug, info};

use super::classify::{ScanTables, classify_category, classify_regions, languages_for};
use super::cursor::Cursor;
use super::error::ScanError;
use super::html_utils::Document;
use super::models::{Catalogue, Release, Scope};
use super::sub_parsers::{parse_base_game, parse_inline};

pub fn scan_document(doc: &Document, tables: &ScanTables<'_>) -> Result<Catalogue, ScanError> {
    let mut catalogue = Catalogue::default();
    let mut cursor = Cursor::new(doc);
    let mut ordinal = 1usize;

    loop {
        let (after_header, regions, languages) = read_release_header(cursor, tables)?;
        let mut release = Release::new(ordinal, regions, languages);
        cursor = scan_categories(after_header, tables, &mut release)?;

        if release.is_empty() {
            debug!(
                target: "scanner",
                ordinal,
                at = cursor.current().map(|b| b.text.as_str()).unwrap_or_default(),
                "空发行，结构化区段结束"
            );
            break;
        }

        debug!(
            target: "scanner",
            release = %release.key(),
            regions = %release.regions,
            languages = %release.languages,
            "发行解析完成"
        );
        catalogue.releases.push(release);
        ordinal += 1;
    }

    info!(target: "scanner", releases = catalogue.len(), "下载目录解析完成");
    Ok(catalogue)
}

fn read_release_header<'d>(
    cursor: Cursor<'d>,
    tables: &ScanTables<'_>,
) -> Result<(Cursor<'d>, Scope, Scope), ScanError> {
    let Some(block) = cursor.current() else {
        // 文档已经走完：交给类别扫描得出空发行
        return Ok((cursor, Scope::All, Scope::All));
    };

    let regions = classify_regions(&block.text, tables.regions);
    if !regions.is_empty() {
        let languages = languages_for(&block.text, &regions, tables);
        let (next, _) = cursor.advance("reading the first category after a region header")?;
        return Ok((
            next,
            Scope::from_names(regions),
            Scope::from_names(languages),
        ));
    }

    if tables
        .regionless_titles
        .iter()
        .any(|t| block.text.contains(t.as_str()))
    {
        let (next, _) = cursor.advance("reading the first category after a release title")?;
        return Ok((next, Scope::All, Scope::All));
    }

    // 没有标题：当前区块本身就是第一个类别区块
    Ok((cursor, Scope::All, Scope::All))
}

fn scan_categories<'d>(
    mut cursor: Cursor<'d>,
    tables: &ScanTables<'_>,
    release: &mut Release,
) -> Result<Cursor<'d>, ScanError> {
    while let Some(block) = cursor.current() {
        let Some(category) = classify_category(&block.text, tables.categories) else {
            break;
        };
        let (next, parsed) = match category.inline_kind() {
            None => parse_base_game(cursor, tables)?,
            Some(kind) => parse_inline(cursor, kind, tables)?,
        };
        release.merge(parsed);
        cursor = next;
    }
    Ok(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release_parser::classify::{CategoryTags, LanguageAlias};
    use crate::release_parser::html_utils::Block;
    use crate::release_parser::models::{CategoryKind, EntryKind};
    use std::collections::BTreeMap;

    struct Tables {
        regions: Vec<String>,
        languages: Vec<LanguageAlias>,
        implied: BTreeMap<String, String>,
        regionless: Vec<String>,
        sites: Vec<String>,
        cats: Vec<CategoryTags>,
    }

    impl Tables {
        fn new() -> Self {
            Self {
                regions: vec!["USA".into(), "Europe".into(), "Japan".into()],
                languages: vec![
                    LanguageAlias {
                        name: "English".into(),
                        aliases: vec!["EN".into()],
                    },
                    LanguageAlias {
                        name: "Japanese".into(),
                        aliases: vec!["JP".into()],
                    },
                ],
                implied: BTreeMap::from([("Japan".into(), "Japanese".into())]),
                regionless: vec!["Region Free".into()],
                sites: vec!["1Fichier".into(), "MegaUp".into()],
                cats: vec![
                    CategoryTags {
                        category: CategoryKind::BaseGame,
                        tag_names: vec!["Base Game".into()],
                    },
                    CategoryTags {
                        category: CategoryKind::Dlc,
                        tag_names: vec!["DLC".into()],
                    },
                    CategoryTags {
                        category: CategoryKind::Update,
                        tag_names: vec!["Update".into()],
                    },
                ],
            }
        }

        fn view(&self) -> ScanTables<'_> {
            ScanTables {
                regions: &self.regions,
                languages: &self.languages,
                implied_languages: &self.implied,
                regionless_titles: &self.regionless,
                dl_sites: &self.sites,
                categories: &self.cats,
            }
        }
    }

    fn two_release_page() -> &'static str {
        r#"<html><body>
        <p><strong>Download Links</strong></p>
        <p><strong>USA [EN]</strong></p>
        <p>Base Game NSP</p>
        <p>1Fichier: <a href="https://ouo.io/b1">Download</a></p>
        <p>MegaUp: <a href="https://ouo.io/b2">Download</a></p>
        <p></p>
        <p>Update v1.0.1</p>
        <p><a href="https://ouo.io/u1">1Fichier</a> | <a href="https://ouo.io/u2">MegaUp</a></p>
        <p><strong>Japan</strong></p>
        <p>Base Game XCI</p>
        <p>1Fichier: <a href="https://ouo.io/j1">Part 1</a> <a href="https://ouo.io/j2">Part 2</a></p>
        <p></p>
        <p>Comments</p>
        <p>More comments</p>
        </body></html>"#
    }

    #[test]
    fn scans_releases_with_contiguous_ordinals() {
        let t = Tables::new();
        let doc = Document::from_html(two_release_page(), "download links").unwrap();
        let cat = scan_document(&doc, &t.view()).unwrap();

        assert_eq!(cat.keys(), vec!["release_1", "release_2"]);

        let usa = cat.get("release_1").unwrap();
        assert_eq!(usa.regions, Scope::Only(vec!["USA".into()]));
        assert_eq!(usa.languages, Scope::Only(vec!["English".into()]));
        assert!(usa.has(EntryKind::BaseGameNsp));
        assert_eq!(usa.entries[&EntryKind::Update][0].full_name, "Update v1.0.1");

        let jp = cat.get("release_2").unwrap();
        assert_eq!(jp.languages, Scope::Only(vec!["Japanese".into()]));
        assert_eq!(
            jp.entries[&EntryKind::BaseGameXci][0].links_by_site["1Fichier"].len(),
            2
        );
    }

    #[test]
    fn headerless_release_defaults_to_all() {
        let t = Tables::new();
        let doc = Document::from_blocks(vec![
            Block::new("DLC: Pack"),
            Block::new("x").with_anchor("1Fichier", "https://ouo.io/d"),
            Block::new(""),
            Block::new("footer"),
        ]);
        let cat = scan_document(&doc, &t.view()).unwrap();
        assert_eq!(cat.len(), 1);
        assert!(cat.releases[0].regions.is_all());
        assert!(cat.releases[0].languages.is_all());
    }

    #[test]
    fn regionless_title_is_consumed() {
        let t = Tables::new();
        let doc = Document::from_blocks(vec![
            Block::new("Region Free Release"),
            Block::new("Update 2.0"),
            Block::new("x").with_anchor("MegaUp", "https://ouo.io/u"),
            Block::new(""),
            Block::new("end"),
        ]);
        let cat = scan_document(&doc, &t.view()).unwrap();
        assert!(cat.releases[0].regions.is_all());
        assert!(cat.releases[0].has(EntryKind::Update));
    }

    #[test]
    fn release_keeps_both_dlc_listings_before_non_matching_block() {
        let t = Tables::new();
        let doc = Document::from_blocks(vec![
            Block::new("Europe"),
            Block::new("DLC: One"),
            Block::new("x").with_anchor("1Fichier", "https://ouo.io/1"),
            Block::new("DLC: Two"),
            Block::new("x").with_anchor("1Fichier", "https://ouo.io/2"),
            Block::new("USA"),
            Block::new("Base Game NSP"),
            Block::new("1Fichier").with_anchor("Download", "https://ouo.io/3"),
            Block::new(""),
            Block::new("the end"),
        ]);
        let cat = scan_document(&doc, &t.view()).unwrap();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.releases[0].entries[&EntryKind::Dlc].len(), 2);
        assert_eq!(cat.releases[0].regions, Scope::Only(vec!["Europe".into()]));
        assert!(cat.releases[0].languages.is_all());
        assert_eq!(cat.releases[1].regions, Scope::Only(vec!["USA".into()]));
    }

    #[test]
    fn ambiguous_base_game_aborts_scan() {
        let t = Tables::new();
        let doc = Document::from_blocks(vec![
            Block::new("USA"),
            Block::new("Base Game NSP + XCI"),
            Block::new("1Fichier").with_anchor("Download", "https://ouo.io/3"),
        ]);
        let err = scan_document(&doc, &t.view()).unwrap_err();
        assert!(matches!(err, ScanError::AmbiguousBaseGame { .. }));
    }

    #[test]
    fn page_without_any_category_gives_empty_catalogue() {
        let t = Tables::new();
        let doc = Document::from_blocks(vec![Block::new("Just text"), Block::new("more")]);
        let cat = scan_document(&doc, &t.view()).unwrap();
        assert!(cat.is_empty());
    }

    #[test]
    fn listing_cut_off_by_document_end_reports_last_block() {
        let t = Tables::new();
        let doc = Document::from_blocks(vec![
            Block::new("USA"),
            Block::new("Update 1.1"),
            Block::new("x").with_anchor("1Fichier", "https://ouo.io/u"),
        ]);
        let err = scan_document(&doc, &t.view()).unwrap_err();
        assert!(matches!(
            err,
            ScanError::Exhausted { ref after, .. } if after == "x"
        ));
    }
}
