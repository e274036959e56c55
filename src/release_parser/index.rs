//! 游戏索引页解析：`div#easyindex-index` 下的每个 `<li>` 是一款游戏。

use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

use super::error::ScanError;
use super::html_utils::element_text;
use crate::base_system::context::{Config, NamingVariations};

fn sel_index_item() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    S.get_or_init(|| Selector::parse("div#easyindex-index li").unwrap())
}

fn sel_link() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    S.get_or_init(|| Selector::parse("a[href]").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameIndexEntry {
    pub long_name: String,
    pub short_name: String,
    pub url: String,
    pub has_nsp: bool,
    pub has_xci: bool,
    pub has_update: bool,
    pub has_dlc: bool,
}

/// 由配置里的命名变体编译出的正则。
pub struct NameMatcher {
    name_end: Regex,
    nsp: Option<Regex>,
    xci: Option<Regex>,
    update: Option<Regex>,
    dlc: Option<Regex>,
}

impl NameMatcher {
    pub fn new(naming: &NamingVariations) -> Result<Self, regex::Error> {
        let nsp_xci = naming
            .nsp_variations
            .iter()
            .chain(naming.xci_variations.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("|");
        // 短名止于以下任一标记之前：Switch NSP/XCI、- Cloud Version、(eShop)、Switch +、+ Update、+ DLC
        let name_end = format!(
            r"(?:\s?Swi(?:tc|ct)h)?\s\(?(?:{nsp_xci})\)?|\s[-|–]\sCloud Version|\(eShop\)|\s?Switch\s\+|\s?\+\sUpdate|\s?\+\sDLC"
        );
        Ok(Self {
            name_end: Regex::new(&name_end)?,
            nsp: alternation(&naming.nsp_variations)?,
            xci: alternation(&naming.xci_variations)?,
            update: alternation(&naming.update_variations)?,
            dlc: alternation(&naming.dlc_variations)?,
        })
    }

    /// 取第一个结束标记之前的部分；找不到标记（或标记在开头）时保留原名。
    pub fn short_name<'a>(&self, long_name: &'a str) -> &'a str {
        match self.name_end.find(long_name) {
            Some(m) if m.start() > 0 => long_name[..m.start()].trim_end(),
            _ => long_name,
        }
    }
}

fn alternation(variants: &[String]) -> Result<Option<Regex>, regex::Error> {
    if variants.is_empty() {
        return Ok(None);
    }
    Regex::new(&variants.join("|")).map(Some)
}

fn has_filetype(re: &Option<Regex>, remaining: &str) -> bool {
    re.as_ref().is_some_and(|r| r.is_match(remaining))
}

pub fn parse_game_index(html: &str, config: &Config) -> Result<Vec<GameIndexEntry>, ScanError> {
    let matcher =
        NameMatcher::new(&config.naming).map_err(|e| ScanError::InvalidNaming(e.to_string()))?;
    let page = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut games = Vec::new();
    for item in page.select(sel_index_item()) {
        let long_name = element_text(item);
        if config.forbidden_titles.iter().any(|t| *t == long_name) {
            debug!(target: "scanner", title = %long_name, "跳过屏蔽标题");
            continue;
        }
        let Some(url) = item
            .select(sel_link())
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        if !seen.insert(url.to_string()) {
            return Err(ScanError::DuplicateIndexUrl(url.to_string()));
        }

        let short_name = matcher.short_name(&long_name).to_string();
        let remaining = long_name.replacen(&short_name, "", 1);
        games.push(GameIndexEntry {
            has_nsp: has_filetype(&matcher.nsp, &remaining),
            has_xci: has_filetype(&matcher.xci, &remaining),
            has_update: has_filetype(&matcher.update, &remaining),
            has_dlc: has_filetype(&matcher.dlc, &remaining),
            long_name,
            short_name,
            url: url.to_string(),
        });
    }
    Ok(games)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> NameMatcher {
        NameMatcher::new(&NamingVariations::default()).unwrap()
    }

    #[test]
    fn short_name_stops_at_switch_marker() {
        let m = matcher();
        assert_eq!(m.short_name("Super Game Switch NSP + Update"), "Super Game");
        assert_eq!(m.short_name("Other Game (XCI)"), "Other Game");
        assert_eq!(m.short_name("Cloud Thing - Cloud Version"), "Cloud Thing");
        assert_eq!(m.short_name("Shop Game (eShop)"), "Shop Game");
        assert_eq!(m.short_name("Plain Title"), "Plain Title");
    }

    #[test]
    fn index_flags_and_forbidden_titles() {
        let mut config = Config::default();
        config.forbidden_titles = vec!["Hidden Game Switch NSP".into()];
        let html = r#"
            <div id="easyindex-index"><ul>
              <li><a href="https://site/a/">Alpha Switch NSP + Update + DLC</a></li>
              <li><a href="https://site/b/">Beta Switch XCI</a></li>
              <li><a href="https://site/h/">Hidden Game Switch NSP</a></li>
            </ul></div>
        "#;
        let games = parse_game_index(html, &config).unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].short_name, "Alpha");
        assert!(games[0].has_nsp && games[0].has_update && games[0].has_dlc);
        assert!(!games[0].has_xci);
        assert!(games[1].has_xci && !games[1].has_nsp);
    }

    #[test]
    fn duplicate_urls_are_rejected() {
        let html = r#"
            <div id="easyindex-index"><ul>
              <li><a href="https://site/a/">Alpha Switch NSP</a></li>
              <li><a href="https://site/a/">Alpha Again Switch NSP</a></li>
            </ul></div>
        "#;
        let err = parse_game_index(html, &Config::default()).unwrap_err();
        assert!(matches!(err, ScanError::DuplicateIndexUrl(_)));
    }
}
