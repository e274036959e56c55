//! 交接清单：为选中的发行逐条挑选下载站点，展开短链，产出交给下载工具的条目。

use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::base_system::context::Config;
use crate::network_parser::error::ResolveError;
use crate::network_parser::redirect::ResolveLink;
use crate::release_parser::models::{DownloadEntry, EntryKind, Release};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandoffItem {
    pub kind: EntryKind,
    pub folder: String,
    pub full_name: String,
    pub site: String,
    pub links: Vec<String>,
}

pub fn plan_handoff(
    release: &Release,
    config: &Config,
    resolver: &impl ResolveLink,
) -> Result<Vec<HandoffItem>, ResolveError> {
    let mut items = Vec::new();
    for (kind, entries) in &release.entries {
        for entry in entries {
            let Some((site, raw_links)) = pick_site(entry, &config.dl_sites) else {
                warn!(target: "download", "{} 没有可用的下载站点，跳过", entry.full_name);
                continue;
            };
            if raw_links.len() > 1 {
                info!(target: "download", "{} 在 {} 上为多分卷", entry.full_name, site);
            }

            let mut links = Vec::with_capacity(raw_links.len());
            for link in raw_links {
                if is_shortened(link, &config.shortener_hosts) {
                    info!(target: "download", "展开短链 {}", link);
                    links.push(resolver.resolve(link)?);
                } else {
                    links.push(link.clone());
                }
            }

            items.push(HandoffItem {
                kind: *kind,
                folder: kind.folder().to_string(),
                full_name: entry.full_name.clone(),
                site: site.to_string(),
                links,
            });
        }
    }
    Ok(items)
}

/// 按站点优先级取第一个有链接的站点。
fn pick_site<'e>(entry: &'e DownloadEntry, dl_sites: &[String]) -> Option<(&'e str, &'e Vec<String>)> {
    dl_sites.iter().find_map(|site| {
        entry
            .links_by_site
            .get_key_value(site)
            .filter(|(_, links)| !links.is_empty())
            .map(|(k, v)| (k.as_str(), v))
    })
}

fn is_shortened(link: &str, hosts: &[String]) -> bool {
    let Ok(url) = Url::parse(link) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    hosts.iter().any(|h| {
        host.eq_ignore_ascii_case(h)
            || host
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", h.to_ascii_lowercase()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release_parser::models::Scope;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);

    impl ResolveLink for Recorder {
        fn resolve(&self, raw: &str) -> Result<String, ResolveError> {
            self.0.borrow_mut().push(raw.to_string());
            Ok(format!("{raw}#resolved"))
        }
    }

    struct Broken;

    impl ResolveLink for Broken {
        fn resolve(&self, raw: &str) -> Result<String, ResolveError> {
            Err(ResolveError::ResolutionExhausted { url: raw.into() })
        }
    }

    fn sample_release() -> Release {
        let mut base = DownloadEntry::new("Game [NSP]");
        base.push_link("MegaUp", "https://megaup.net/direct");
        base.push_link("1Fichier", "https://ouo.io/part1");
        base.push_link("1Fichier", "https://ouo.press/part2");

        let mut dlc = DownloadEntry::new("Game DLC");
        dlc.push_link("Unknown Host", "https://example.com/x");

        let mut release = Release::new(1, Scope::All, Scope::All);
        release.merge(vec![
            (EntryKind::BaseGameNsp, base),
            (EntryKind::Dlc, dlc),
        ]);
        release
    }

    #[test]
    fn first_priority_site_wins_and_short_links_resolve() {
        let resolver = Recorder::default();
        let items = plan_handoff(&sample_release(), &Config::default(), &resolver).unwrap();

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.folder, "Games");
        assert_eq!(item.site, "1Fichier");
        assert_eq!(
            item.links,
            vec![
                "https://ouo.io/part1#resolved".to_string(),
                "https://ouo.press/part2#resolved".to_string()
            ]
        );
        assert_eq!(resolver.0.borrow().len(), 2);
    }

    #[test]
    fn direct_links_pass_through() {
        let cfg = Config {
            dl_sites: vec!["MegaUp".into()],
            ..Config::default()
        };
        let resolver = Recorder::default();
        let items = plan_handoff(&sample_release(), &cfg, &resolver).unwrap();
        assert_eq!(items[0].links, vec!["https://megaup.net/direct".to_string()]);
        assert!(resolver.0.borrow().is_empty());
    }

    #[test]
    fn resolver_failure_aborts_the_plan() {
        let err = plan_handoff(&sample_release(), &Config::default(), &Broken).unwrap_err();
        assert!(matches!(err, ResolveError::ResolutionExhausted { .. }));
    }

    #[test]
    fn shortener_match_is_by_host() {
        let hosts = vec!["ouo.io".to_string()];
        assert!(is_shortened("https://ouo.io/abc", &hosts));
        assert!(is_shortened("https://www.OUO.io/abc", &hosts));
        assert!(!is_shortened("https://example.com/ouo.io", &hosts));
        assert!(!is_shortened("not a url", &hosts));
    }
}
