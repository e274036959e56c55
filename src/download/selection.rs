//! 发行选择：按区域/语言偏好挑出唯一的发行，再按文件类型与 DLC/Update 开关裁剪条目。

use thiserror::Error;
use tracing::info;

use crate::base_system::context::Config;
use crate::release_parser::models::{Catalogue, EntryKind, Release};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no release matches allowed regions {0:?}")]
    NoMatchingRelease(Vec<String>),
    #[error("multiple suitable releases found: {0:?}")]
    AmbiguousRelease(Vec<String>),
    #[error("release {release} has languages {languages}, none of {allowed:?}")]
    LanguageNotAllowed {
        release: String,
        languages: String,
        allowed: Vec<String>,
    },
}

pub fn select_release(catalogue: &Catalogue, config: &Config) -> Result<Release, SelectionError> {
    for release in &catalogue.releases {
        info!(
            target: "download",
            "{}: 区域 {} / 语言 {} / NSP={} XCI={} DLC={} Update={}",
            release.key(),
            release.regions,
            release.languages,
            release.has(EntryKind::BaseGameNsp),
            release.has(EntryKind::BaseGameXci),
            release.has(EntryKind::Dlc),
            release.has(EntryKind::Update),
        );
    }

    let mut matching: Vec<&Release> = catalogue
        .releases
        .iter()
        .filter(|r| r.regions.intersects(&config.allowed_regions))
        .collect();

    let chosen = match matching.len() {
        0 => {
            return Err(SelectionError::NoMatchingRelease(
                config.allowed_regions.clone(),
            ));
        }
        1 => matching.remove(0),
        _ => {
            return Err(SelectionError::AmbiguousRelease(
                matching.iter().map(|r| r.key()).collect(),
            ));
        }
    };

    if !chosen.languages.is_all() && !chosen.languages.intersects(&config.allowed_languages) {
        return Err(SelectionError::LanguageNotAllowed {
            release: chosen.key(),
            languages: chosen.languages.to_string(),
            allowed: config.allowed_languages.clone(),
        });
    }

    let mut release = chosen.clone();
    trim_entries(&mut release, config);
    Ok(release)
}

fn trim_entries(release: &mut Release, config: &Config) {
    if release.has(EntryKind::BaseGameNsp) && release.has(EntryKind::BaseGameXci) {
        let drop = if config.prefer_filetype == "XCI" {
            EntryKind::BaseGameNsp
        } else {
            EntryKind::BaseGameXci
        };
        info!(target: "download", "同时存在 NSP 与 XCI，按偏好移除 {}", drop);
        release.entries.remove(&drop);
    }
    if !config.download_dlc && release.entries.remove(&EntryKind::Dlc).is_some() {
        info!(target: "download", "已移除 DLC");
    }
    if !config.download_update && release.entries.remove(&EntryKind::Update).is_some() {
        info!(target: "download", "已移除更新");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release_parser::models::{DownloadEntry, Scope};

    fn entry(name: &str) -> DownloadEntry {
        let mut e = DownloadEntry::new(name);
        e.push_link("MegaUp", "https://megaup.net/a");
        e
    }

    fn release(ordinal: usize, regions: &[&str], languages: &[&str]) -> Release {
        let names = |v: &[&str]| Scope::from_names(v.iter().map(|s| s.to_string()).collect());
        let mut r = Release::new(ordinal, names(regions), names(languages));
        r.merge(vec![
            (EntryKind::BaseGameNsp, entry("Game [NSP]")),
            (EntryKind::BaseGameXci, entry("Game [XCI]")),
            (EntryKind::Dlc, entry("Game DLC")),
            (EntryKind::Update, entry("Game Update")),
        ]);
        r
    }

    fn catalogue(releases: Vec<Release>) -> Catalogue {
        Catalogue { releases }
    }

    #[test]
    fn picks_the_single_allowed_region() {
        let cat = catalogue(vec![
            release(1, &["Japan"], &["Japanese"]),
            release(2, &["USA"], &["English"]),
        ]);
        let chosen = select_release(&cat, &Config::default()).unwrap();
        assert_eq!(chosen.ordinal, 2);
        assert!(chosen.has(EntryKind::BaseGameNsp));
        assert!(!chosen.has(EntryKind::BaseGameXci));
        assert!(chosen.has(EntryKind::Dlc));
    }

    #[test]
    fn all_scope_counts_as_region_name() {
        let cat = catalogue(vec![release(1, &[], &[])]);
        assert!(select_release(&cat, &Config::default()).is_ok());
    }

    #[test]
    fn zero_or_many_matches_are_errors() {
        let cfg = Config::default();
        let none = catalogue(vec![release(1, &["Japan"], &[])]);
        assert!(matches!(
            select_release(&none, &cfg),
            Err(SelectionError::NoMatchingRelease(_))
        ));

        let many = catalogue(vec![release(1, &["USA"], &[]), release(2, &[], &[])]);
        assert_eq!(
            select_release(&many, &cfg),
            Err(SelectionError::AmbiguousRelease(vec![
                "release_1".into(),
                "release_2".into()
            ]))
        );
    }

    #[test]
    fn empty_catalogue_has_no_matching_release() {
        assert!(matches!(
            select_release(&Catalogue::default(), &Config::default()),
            Err(SelectionError::NoMatchingRelease(_))
        ));
    }

    #[test]
    fn language_gate_rejects_foreign_release() {
        let cat = catalogue(vec![release(1, &["USA"], &["Spanish"])]);
        assert!(matches!(
            select_release(&cat, &Config::default()),
            Err(SelectionError::LanguageNotAllowed { .. })
        ));
    }

    #[test]
    fn preferences_trim_entries() {
        let cfg = Config {
            prefer_filetype: "XCI".into(),
            download_dlc: false,
            download_update: false,
            ..Config::default()
        };
        let cat = catalogue(vec![release(1, &["USA"], &["English"])]);
        let chosen = select_release(&cat, &cfg).unwrap();
        let kinds: Vec<EntryKind> = chosen.entries.keys().copied().collect();
        assert_eq!(kinds, vec![EntryKind::BaseGameXci]);
    }
}
