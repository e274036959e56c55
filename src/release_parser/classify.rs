//! 区域 / 语言 / 类别 / 站点分类器。
//!
//! 全部是纯函数：结果只取决于单个区块文本和配置表，与区块在文档中的位置无关。
//! 类别与站点按配置顺序做子串匹配，先匹配先赢。

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::models::CategoryKind;

fn re_bracket() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\[(.*?)\]").unwrap())
}

/// 语言名及其别名，例如 `English: [English, EN, Eng]`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageAlias {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// 一个类别及用来识别它的标签子串。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTags {
    pub category: CategoryKind,
    pub tag_names: Vec<String>,
}

/// 扫描一页所需的全部配置表（借用自 `Config`）。
#[derive(Debug, Clone, Copy)]
pub struct ScanTables<'c> {
    pub regions: &'c [String],
    pub languages: &'c [LanguageAlias],
    pub implied_languages: &'c BTreeMap<String, String>,
    pub regionless_titles: &'c [String],
    pub dl_sites: &'c [String],
    pub categories: &'c [CategoryTags],
}

// ── 区域 ────────────────────────────────────────────────────────

/// 不区分大小写的子串匹配，结果保持 `known` 的优先顺序。
pub fn classify_regions(text: &str, known: &[String]) -> Vec<String> {
    let lower = text.to_lowercase();
    known
        .iter()
        .filter(|r| lower.contains(&r.to_lowercase()))
        .cloned()
        .collect()
}

// ── 语言 ────────────────────────────────────────────────────────

/// 依次检查每个 `[...]`，返回第一个能识别出语言的方括号组。
pub fn classify_languages(text: &str, known: &[LanguageAlias]) -> Vec<String> {
    for cap in re_bracket().captures_iter(text) {
        let group = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
        let found = parse_language_group(group, known);
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

fn parse_language_group(group: &str, known: &[LanguageAlias]) -> Vec<String> {
    let lower = group.to_lowercase();
    known
        .iter()
        .filter(|lang| {
            std::iter::once(&lang.name)
                .chain(lang.aliases.iter())
                .any(|alias| contains_word(&lower, &alias.to_lowercase()))
        })
        .map(|lang| lang.name.clone())
        .collect()
}

/// 明确的方括号语言优先；没有时按区域推断；仍为空则由调用方视为 `All`。
pub fn languages_for(text: &str, regions: &[String], tables: &ScanTables<'_>) -> Vec<String> {
    let explicit = classify_languages(text, tables.languages);
    if !explicit.is_empty() {
        return explicit;
    }
    regions
        .iter()
        .filter_map(|r| tables.implied_languages.get(r).cloned())
        .collect()
}

// "EN" must not match inside "French".
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let mut from = 0;
    while let Some(idx) = haystack[from..].find(needle) {
        let start = from + idx;
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        from = start + needle.chars().next().map_or(1, char::len_utf8);
    }
    false
}

// ── 类别 / 站点 ────────────────────────────────────────────────

/// 去掉第一个 `(` 之后的内容再匹配，类别表顺序即优先级。
pub fn classify_category(text: &str, table: &[CategoryTags]) -> Option<CategoryKind> {
    let head = text.split('(').next().unwrap_or_default();
    match_category(head, table)
}

/// 不裁剪括号的版本，用于本体区块里混入的 DLC/Update 链接文本。
pub fn match_category(text: &str, table: &[CategoryTags]) -> Option<CategoryKind> {
    table
        .iter()
        .find(|c| c.tag_names.iter().any(|t| text.contains(t.as_str())))
        .map(|c| c.category)
}

pub fn find_site<'s>(text: &str, sites: &'s [String]) -> Option<&'s str> {
    sites
        .iter()
        .find(|s| text.contains(s.as_str()))
        .map(String::as_str)
}
