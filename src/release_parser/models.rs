//! 目录数据模型：Release / DownloadEntry / Catalogue。
//!
//! 解析器只负责产出这些结构；选择、去重、缓存都在调用方。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 区域/语言的适用范围。没有明确标记时为 `All`，不会出现空集。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<String>", from = "Vec<String>")]
pub enum Scope {
    All,
    Only(Vec<String>),
}

pub const ALL: &str = "All";

impl Scope {
    /// 空列表退化为 `All`，同时去重（保留首次出现的顺序）。
    pub fn from_names(names: Vec<String>) -> Self {
        let mut out: Vec<String> = Vec::with_capacity(names.len());
        for n in names {
            if n == ALL {
                return Scope::All;
            }
            if !out.contains(&n) {
                out.push(n);
            }
        }
        if out.is_empty() {
            Scope::All
        } else {
            Scope::Only(out)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Scope::All)
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            Scope::All => vec![ALL],
            Scope::Only(v) => v.iter().map(String::as_str).collect(),
        }
    }

    /// `All` 作为普通名字参与比较，与 `allowed_regions: [All, USA]` 这种配置对应。
    pub fn intersects(&self, wanted: &[String]) -> bool {
        self.names().iter().any(|n| wanted.iter().any(|w| w == n))
    }
}

impl From<Scope> for Vec<String> {
    fn from(value: Scope) -> Self {
        match value {
            Scope::All => vec![ALL.to_string()],
            Scope::Only(v) => v,
        }
    }
}

impl From<Vec<String>> for Scope {
    fn from(value: Vec<String>) -> Self {
        Scope::from_names(value)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join("/"))
    }
}

/// 三类下载条目，配置里的类别表按这个枚举书写。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryKind {
    #[serde(rename = "Base Game")]
    BaseGame,
    #[serde(rename = "DLC")]
    Dlc,
    #[serde(rename = "Update")]
    Update,
}

impl CategoryKind {
    /// 仅 DLC/Update 有固定的条目键；本体要看 NSP/XCI 标记。
    pub fn inline_kind(self) -> Option<EntryKind> {
        match self {
            CategoryKind::BaseGame => None,
            CategoryKind::Dlc => Some(EntryKind::Dlc),
            CategoryKind::Update => Some(EntryKind::Update),
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CategoryKind::BaseGame => "Base Game",
            CategoryKind::Dlc => "DLC",
            CategoryKind::Update => "Update",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    BaseGameNsp,
    BaseGameXci,
    BaseGameUndefined,
    Dlc,
    Update,
}

impl EntryKind {
    pub fn key(self) -> &'static str {
        match self {
            EntryKind::BaseGameNsp => "base_game_nsp",
            EntryKind::BaseGameXci => "base_game_xci",
            EntryKind::BaseGameUndefined => "base_game_undefined",
            EntryKind::Dlc => "dlc",
            EntryKind::Update => "update",
        }
    }

    /// 交给下载工具时使用的子目录。
    pub fn folder(self) -> &'static str {
        match self {
            _ if self.is_base_game() => "Games",
            EntryKind::Dlc => "DLC",
            _ => "Updates",
        }
    }

    pub fn is_base_game(self) -> bool {
        matches!(
            self,
            EntryKind::BaseGameNsp | EntryKind::BaseGameXci | EntryKind::BaseGameUndefined
        )
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEntry {
    pub full_name: String,
    /// 站点 -> 原始链接（多分卷时一个站点会有多条）
    pub links_by_site: BTreeMap<String, Vec<String>>,
}

impl DownloadEntry {
    pub fn new(full_name: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            links_by_site: BTreeMap::new(),
        }
    }

    pub fn push_link(&mut self, site: &str, href: &str) {
        self.links_by_site
            .entry(site.to_string())
            .or_default()
            .push(href.to_string());
    }

}

/// 子解析器一次调用产出的条目，按 kind 分组，保持插入顺序。
pub type EntryMap = Vec<(EntryKind, DownloadEntry)>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub ordinal: usize,
    pub regions: Scope,
    pub languages: Scope,
    pub entries: BTreeMap<EntryKind, Vec<DownloadEntry>>,
}

impl Release {
    pub fn new(ordinal: usize, regions: Scope, languages: Scope) -> Self {
        Self {
            ordinal,
            regions,
            languages,
            entries: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> String {
        format!("release_{}", self.ordinal)
    }

    /// 追加而非覆盖：同一发行里可以有多段 DLC/Update。
    pub fn merge(&mut self, parsed: EntryMap) {
        for (kind, mut entry) in parsed {
            entry.full_name = entry.full_name.trim().to_string();
            self.entries.entry(kind).or_default().push(entry);
        }
    }

    pub fn has(&self, kind: EntryKind) -> bool {
        self.entries.get(&kind).is_some_and(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalogue {
    pub releases: Vec<Release>,
}

impl Catalogue {
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Release> {
        self.releases.iter().find(|r| r.key() == key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.releases.iter().map(Release::key).collect()
    }
}
