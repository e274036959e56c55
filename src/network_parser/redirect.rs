//! 短链跳转解析（ouo 类短链）。
//!
//! 单条链接的流程：GET 短链 → 有 Location 直接返回；否则取页面表单里以 `token` 结尾的字段，
//! 求解人机验证后 POST 到 `/go/<id>`，再重复一次到 `/xreallcygo/<id>`，最后一跳必须带 Location。
//! 状态码异常或找不到表单按瞬时错误处理，固定间隔后从头重试，总次数受 `max_retries` 限制。

use rand::seq::SliceRandom;
use reqwest::blocking::{Client, Response};
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderValue, LOCATION, REFERER,
    USER_AGENT,
};
use reqwest::redirect::Policy;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::challenge::ChallengeSolver;
use super::error::ResolveError;
use crate::base_system::cooldown_retry::{FixedDelay, RetryError, with_fixed_delay};

/// 两段 continue 端点，依次使用。
const CONTINUE_PATHS: [&str; 2] = ["go", "xreallcygo"];
const TOKEN_FIELD: &str = "x-token";

fn sel_form() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    S.get_or_init(|| Selector::parse("form").unwrap())
}

fn sel_token_input() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    S.get_or_init(|| Selector::parse(r#"input[name$="token"]"#).unwrap())
}

// ── 浏览器指纹 ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserProfile {
    Chrome,
    Safari,
    Edge,
}

impl BrowserProfile {
    const ALL: [BrowserProfile; 3] = [
        BrowserProfile::Chrome,
        BrowserProfile::Safari,
        BrowserProfile::Edge,
    ];

    /// 每次解析调用选一次，整个调用期间不变。
    pub fn random() -> Self {
        *Self::ALL
            .choose(&mut rand::thread_rng())
            .unwrap_or(&BrowserProfile::Chrome)
    }

    pub fn user_agent(self) -> &'static str {
        match self {
            BrowserProfile::Chrome => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
            }
            BrowserProfile::Safari => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15"
            }
            BrowserProfile::Edge => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0"
            }
        }
    }

    fn headers(self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-GB,en-US;q=0.9,en;q=0.8"),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        headers.insert(
            REFERER,
            HeaderValue::from_static("http://www.google.com/ig/adde?moduleurl="),
        );
        headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));
        headers.insert(USER_AGENT, HeaderValue::from_static(self.user_agent()));
        headers
    }
}

// ── 传输层接缝 ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HopResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

impl HopResponse {
    fn accepted(&self) -> bool {
        matches!(self.status, 200 | 302)
    }
}

/// 一次解析尝试内的会话（共享 Cookie），不自动跟随跳转。
pub trait LinkSession {
    fn get(&mut self, url: &str) -> Result<HopResponse, ResolveError>;
    fn post_form(&mut self, url: &str, form: &[(String, String)])
    -> Result<HopResponse, ResolveError>;
}

pub trait SessionFactory {
    fn open(&self, profile: BrowserProfile) -> Result<Box<dyn LinkSession>, ResolveError>;
}

pub struct ReqwestSessions {
    timeout: Duration,
}

impl ReqwestSessions {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl SessionFactory for ReqwestSessions {
    fn open(&self, profile: BrowserProfile) -> Result<Box<dyn LinkSession>, ResolveError> {
        let client = Client::builder()
            .default_headers(profile.headers())
            .cookie_store(true)
            .redirect(Policy::none())
            .timeout(self.timeout)
            .build()?;
        Ok(Box::new(ReqwestSession { client }))
    }
}

struct ReqwestSession {
    client: Client,
}

impl ReqwestSession {
    fn into_hop(resp: Response) -> Result<HopResponse, ResolveError> {
        let status = resp.status().as_u16();
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let body = resp.text()?;
        Ok(HopResponse {
            status,
            location,
            body,
        })
    }
}

impl LinkSession for ReqwestSession {
    fn get(&mut self, url: &str) -> Result<HopResponse, ResolveError> {
        Self::into_hop(self.client.get(url).send()?)
    }

    fn post_form(
        &mut self,
        url: &str,
        form: &[(String, String)],
    ) -> Result<HopResponse, ResolveError> {
        Self::into_hop(self.client.post(url).form(form).send()?)
    }
}

// ── 链接归一化 ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortLink {
    pub url: String,
    scheme: String,
    host: String,
    id: String,
}

impl ShortLink {
    /// `*.press` 与 `*.io` 是同一服务，统一用 `.io`。
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let mut url = Url::parse(raw.trim()).map_err(|_| ResolveError::InvalidUrl(raw.into()))?;
        let host = url
            .host_str()
            .ok_or_else(|| ResolveError::InvalidUrl(raw.into()))?
            .to_string();
        if let Some(stem) = host.strip_suffix(".press") {
            url.set_host(Some(&format!("{stem}.io")))
                .map_err(|_| ResolveError::InvalidUrl(raw.into()))?;
        }
        let id = url
            .path_segments()
            .and_then(|mut s| s.next_back())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ResolveError::InvalidUrl(raw.into()))?
            .to_string();
        Ok(Self {
            scheme: url.scheme().to_string(),
            host: url.host_str().unwrap_or_default().to_string(),
            url: url.to_string(),
            id,
        })
    }

    fn continue_url(&self, path: &str) -> String {
        format!("{}://{}/{}/{}", self.scheme, self.host, path, self.id)
    }
}

/// 页面第一个表单里名字以 `token` 结尾的输入框；找不到表单或字段时返回 None。
pub fn parse_token_form(html: &str) -> Option<Vec<(String, String)>> {
    let page = Html::parse_document(html);
    let form = page.select(sel_form()).next()?;
    let fields: Vec<(String, String)> = form
        .select(sel_token_input())
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect();
    if fields.is_empty() { None } else { Some(fields) }
}

// ── 解析器 ─────────────────────────────────────────────────────

pub trait ResolveLink {
    fn resolve(&self, raw: &str) -> Result<String, ResolveError>;
}

pub struct RedirectResolver<F, S> {
    sessions: F,
    solver: S,
    anchor_url: String,
    policy: FixedDelay,
}

impl<F: SessionFactory, S: ChallengeSolver> RedirectResolver<F, S> {
    pub fn new(sessions: F, solver: S, anchor_url: String, policy: FixedDelay) -> Self {
        Self {
            sessions,
            solver,
            anchor_url,
            policy,
        }
    }

    fn attempt(&self, link: &ShortLink, profile: BrowserProfile) -> Result<String, ResolveError> {
        let mut session = self.sessions.open(profile)?;
        let mut res = session.get(&link.url)?;
        check_status(&res)?;

        for path in CONTINUE_PATHS {
            if res.location.is_some() {
                break;
            }
            let mut form = parse_token_form(&res.body)
                .ok_or_else(|| ResolveError::transient("page load error: token form not found"))?;
            let token = self.solver.solve(&self.anchor_url).map_err(|e| match e {
                ResolveError::Challenge(_) => e,
                other => ResolveError::Challenge(other.to_string()),
            })?;
            form.push((TOKEN_FIELD.to_string(), token));

            let next = link.continue_url(path);
            debug!(target: "resolver", url = %next, "提交验证表单");
            res = session.post_form(&next, &form)?;
            check_status(&res)?;
        }

        res.location
            .ok_or_else(|| ResolveError::ResolutionExhausted {
                url: link.url.clone(),
            })
    }
}

impl<F: SessionFactory, S: ChallengeSolver> ResolveLink for RedirectResolver<F, S> {
    fn resolve(&self, raw: &str) -> Result<String, ResolveError> {
        let link = ShortLink::parse(raw)?;
        let profile = BrowserProfile::random();
        debug!(target: "resolver", url = %link.url, ?profile, "开始解析短链");

        let resolved = with_fixed_delay(self.policy, "短链解析失败", |_| {
            self.attempt(&link, profile)
        })
        .map_err(|e| match e {
            RetryError::Fatal(e) => e,
            RetryError::Exhausted { attempts, last } => ResolveError::RetriesExhausted {
                url: link.url.clone(),
                attempts,
                last: Box::new(last),
            },
        })?;

        info!(target: "resolver", from = %raw, to = %resolved, "短链解析完成");
        Ok(resolved)
    }
}

fn check_status(res: &HopResponse) -> Result<(), ResolveError> {
    if res.accepted() {
        Ok(())
    } else {
        Err(ResolveError::transient(format!(
            "received status code {}",
            res.status
        )))
    }
}
