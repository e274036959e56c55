//! 全局配置结构（Config）与默认值。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息，以及扫描器所需配置表的借用视图。

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::config::{ConfigSpec, FieldMeta};
use crate::release_parser::classify::{CategoryTags, LanguageAlias, ScanTables};
use crate::release_parser::models::CategoryKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingVariations {
    #[serde(default)]
    pub nsp_variations: Vec<String>,
    #[serde(default)]
    pub xci_variations: Vec<String>,
    #[serde(default)]
    pub update_variations: Vec<String>,
    #[serde(default)]
    pub dlc_variations: Vec<String>,
}

impl Default for NamingVariations {
    fn default() -> Self {
        Self {
            nsp_variations: strings(&["NSP"]),
            xci_variations: strings(&["XCI"]),
            update_variations: strings(&["Update", "UPD"]),
            dlc_variations: strings(&["DLC"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 站点配置
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_download_marker")]
    pub download_marker: String,

    // 解析配置表
    #[serde(default = "default_regions")]
    pub regions: Vec<String>,
    #[serde(default = "default_languages")]
    pub languages: Vec<LanguageAlias>,
    #[serde(default = "default_implied_languages")]
    pub implied_languages: BTreeMap<String, String>,
    #[serde(default = "default_regionless_titles")]
    pub regionless_titles: Vec<String>,
    #[serde(default = "default_dl_sites")]
    pub dl_sites: Vec<String>,
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryTags>,
    #[serde(default)]
    pub naming: NamingVariations,
    #[serde(default)]
    pub forbidden_titles: Vec<String>,

    // 下载偏好
    #[serde(default = "default_allowed_regions")]
    pub allowed_regions: Vec<String>,
    #[serde(default = "default_allowed_languages")]
    pub allowed_languages: Vec<String>,
    #[serde(default = "default_prefer_filetype")]
    pub prefer_filetype: String,
    #[serde(default = "default_true")]
    pub download_dlc: bool,
    #[serde(default = "default_true")]
    pub download_update: bool,
    #[serde(default)]
    pub download_dir: String,

    // 网络配置
    #[serde(default = "default_shortener_hosts")]
    pub shortener_hosts: Vec<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    // 人机验证
    #[serde(default = "default_recaptcha_site_key")]
    pub recaptcha_site_key: String,
    #[serde(default = "default_recaptcha_origin")]
    pub recaptcha_origin: String,
    #[serde(default = "default_recaptcha_version")]
    pub recaptcha_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            download_marker: default_download_marker(),
            regions: default_regions(),
            languages: default_languages(),
            implied_languages: default_implied_languages(),
            regionless_titles: default_regionless_titles(),
            dl_sites: default_dl_sites(),
            categories: default_categories(),
            naming: NamingVariations::default(),
            forbidden_titles: Vec::new(),
            allowed_regions: default_allowed_regions(),
            allowed_languages: default_allowed_languages(),
            prefer_filetype: default_prefer_filetype(),
            download_dlc: default_true(),
            download_update: default_true(),
            download_dir: String::new(),
            shortener_hosts: default_shortener_hosts(),
            request_timeout: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            recaptcha_site_key: default_recaptcha_site_key(),
            recaptcha_origin: default_recaptcha_origin(),
            recaptcha_version: default_recaptcha_version(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 23] = [
            FieldMeta {
                name: "base_url",
                description: "站点根地址（游戏索引位于 Index/game-index/games/）",
            },
            FieldMeta {
                name: "download_marker",
                description: "下载区段起始粗体标题包含的文字（不区分大小写）",
            },
            FieldMeta {
                name: "regions",
                description: "可识别的区域，按优先级排列",
            },
            FieldMeta {
                name: "languages",
                description: "可识别的语言及其别名（方括号内匹配）",
            },
            FieldMeta {
                name: "implied_languages",
                description: "区域 -> 默认语言（标题未写明语言时使用）",
            },
            FieldMeta {
                name: "regionless_titles",
                description: "不含区域信息但仍算发行标题的文字",
            },
            FieldMeta {
                name: "dl_sites",
                description: "下载站点，按优先级排列",
            },
            FieldMeta {
                name: "categories",
                description: "类别 -> 标签文字，顺序即匹配优先级",
            },
            FieldMeta {
                name: "naming",
                description: "索引页 NSP/XCI/Update/DLC 的命名变体（正则片段）",
            },
            FieldMeta {
                name: "forbidden_titles",
                description: "索引页中忽略的完整标题",
            },
            FieldMeta {
                name: "allowed_regions",
                description: "允许下载的区域（All 表示未标注区域的发行）",
            },
            FieldMeta {
                name: "allowed_languages",
                description: "允许下载的语言",
            },
            FieldMeta {
                name: "prefer_filetype",
                description: "同时存在 NSP 与 XCI 时优先的格式, 可选: [NSP, XCI]",
            },
            FieldMeta {
                name: "download_dlc",
                description: "是否下载 DLC",
            },
            FieldMeta {
                name: "download_update",
                description: "是否下载更新",
            },
            FieldMeta {
                name: "download_dir",
                description: "下载目录（留空为当前目录）",
            },
            FieldMeta {
                name: "shortener_hosts",
                description: "需要解析跳转的短链域名",
            },
            FieldMeta {
                name: "request_timeout",
                description: "请求超时时间（秒）",
            },
            FieldMeta {
                name: "max_retries",
                description: "短链解析最大重试次数",
            },
            FieldMeta {
                name: "retry_delay_secs",
                description: "短链解析失败后的固定等待时间（秒）",
            },
            FieldMeta {
                name: "recaptcha_site_key",
                description: "短链站点的 reCAPTCHA site key",
            },
            FieldMeta {
                name: "recaptcha_origin",
                description: "reCAPTCHA anchor 请求使用的来源（scheme://host:port）",
            },
            FieldMeta {
                name: "recaptcha_version",
                description: "reCAPTCHA 前端版本号",
            },
        ];
        &FIELDS
    }

    fn validate(&self) -> Result<(), String> {
        if self.dl_sites.is_empty() {
            return Err("dl_sites must not be empty".to_string());
        }
        if self.categories.is_empty() {
            return Err("categories must not be empty".to_string());
        }
        for (i, c) in self.categories.iter().enumerate() {
            if self.categories[..i].iter().any(|p| p.category == c.category) {
                return Err(format!("category {} listed twice", c.category));
            }
        }
        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
        }
        if !matches!(self.prefer_filetype.as_str(), "NSP" | "XCI") {
            return Err(format!(
                "prefer_filetype must be one of NSP, XCI, got {}",
                self.prefer_filetype
            ));
        }
        Ok(())
    }
}

impl Config {
    pub fn scan_tables(&self) -> ScanTables<'_> {
        ScanTables {
            regions: &self.regions,
            languages: &self.languages,
            implied_languages: &self.implied_languages,
            regionless_titles: &self.regionless_titles,
            dl_sites: &self.dl_sites,
            categories: &self.categories,
        }
    }

    pub fn default_download_dir(&self) -> PathBuf {
        if self.download_dir.trim().is_empty() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else {
            PathBuf::from(&self.download_dir)
        }
    }

    pub fn game_index_url(&self) -> String {
        format!("{}/Index/game-index/games/", self.base_url.trim_end_matches('/'))
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://nxbrew.net/".to_string()
}

fn default_download_marker() -> String {
    "download links".to_string()
}

fn default_regions() -> Vec<String> {
    strings(&["USA", "Europe", "Japan", "Asia", "Korea", "China"])
}

fn default_languages() -> Vec<LanguageAlias> {
    let table: &[(&str, &[&str])] = &[
        ("English", &["EN", "ENG"]),
        ("French", &["FR", "FRA"]),
        ("German", &["DE", "GER"]),
        ("Italian", &["ITA"]),
        ("Spanish", &["ES", "SPA"]),
        ("Portuguese", &["PT", "POR"]),
        ("Dutch", &["NL"]),
        ("Russian", &["RU", "RUS"]),
        ("Japanese", &["JP", "JA", "JPN"]),
        ("Korean", &["KO", "KOR"]),
        ("Chinese", &["ZH", "CHN", "CHS", "CHT"]),
    ];
    table
        .iter()
        .map(|(name, aliases)| LanguageAlias {
            name: name.to_string(),
            aliases: strings(aliases),
        })
        .collect()
}

fn default_implied_languages() -> BTreeMap<String, String> {
    [
        ("USA", "English"),
        ("Japan", "Japanese"),
        ("Korea", "Korean"),
        ("China", "Chinese"),
    ]
    .into_iter()
    .map(|(r, l)| (r.to_string(), l.to_string()))
    .collect()
}

fn default_regionless_titles() -> Vec<String> {
    strings(&["Region Free", "Multi-Region"])
}

fn default_dl_sites() -> Vec<String> {
    strings(&[
        "1Fichier",
        "MegaUp",
        "Buzzheavier",
        "Mediafire",
        "Ddownload",
        "Google Drive",
    ])
}

fn default_categories() -> Vec<CategoryTags> {
    vec![
        CategoryTags {
            category: CategoryKind::BaseGame,
            tag_names: strings(&["Base Game"]),
        },
        CategoryTags {
            category: CategoryKind::Dlc,
            tag_names: strings(&["DLC"]),
        },
        CategoryTags {
            category: CategoryKind::Update,
            tag_names: strings(&["Update"]),
        },
    ]
}

fn default_allowed_regions() -> Vec<String> {
    strings(&["All", "USA"])
}

fn default_allowed_languages() -> Vec<String> {
    strings(&["English"])
}

fn default_prefer_filetype() -> String {
    "NSP".to_string()
}

fn default_shortener_hosts() -> Vec<String> {
    strings(&["ouo.io", "ouo.press"])
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay_secs() -> u64 {
    10
}

fn default_recaptcha_site_key() -> String {
    "6Lcr1ncUAAAAAH3cghg6cOTPGARa8adOf-y9zv2x".to_string()
}

fn default_recaptcha_origin() -> String {
    "https://ouo.press:443".to_string()
}

fn default_recaptcha_version() -> String {
    "pCoGBhjs9s8EhFOHJFe8cqis".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn duplicate_category_is_rejected() {
        let mut cfg = Config::default();
        cfg.categories.push(cfg.categories[0].clone());
        assert!(cfg.validate().unwrap_err().contains("twice"));
    }

    #[test]
    fn prefer_filetype_must_be_known() {
        let cfg = Config {
            prefer_filetype: "ZIP".into(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn index_url_joins_base() {
        let cfg = Config {
            base_url: "https://example.net".into(),
            ..Config::default()
        };
        assert_eq!(cfg.game_index_url(), "https://example.net/Index/game-index/games/");
    }
}
