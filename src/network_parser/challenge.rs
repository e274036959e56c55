//! 人机验证求解。
//!
//! 解析器只依赖 `ChallengeSolver`：给出 anchor 地址，拿回 token。默认实现走 reCAPTCHA v3
//! 的 anchor → reload 两步交换，不做任何重试（失败直接让本次解析失败）。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::error::ResolveError;

const RECAPTCHA_BASE: &str = "https://www.google.com/recaptcha/";
const ANCHOR_CB: &str = "ahgyd1gkfkhe";

fn re_anchor_token() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r#""recaptcha-token" value="(.*?)""#).unwrap())
}

fn re_reload_answer() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r#""rresp","(.*?)""#).unwrap())
}

pub trait ChallengeSolver {
    fn solve(&self, anchor_url: &str) -> Result<String, ResolveError>;
}

/// 由 site key、来源与前端版本拼出 invisible anchor 地址。
pub fn build_anchor_url(site_key: &str, origin: &str, version: &str) -> String {
    // reCAPTCHA 的 co 参数是来源的 base64，'=' 用 '.' 代替
    let co = STANDARD.encode(origin.as_bytes()).replace('=', ".");
    format!(
        "{RECAPTCHA_BASE}api2/anchor?ar=1&k={site_key}&co={co}&hl=en&v={version}&size=invisible&cb={ANCHOR_CB}"
    )
}

/// 拆出 `api2`/`enterprise` 前缀与原样的查询串。
fn split_anchor(anchor_url: &str) -> Result<(String, String), ResolveError> {
    let url = Url::parse(anchor_url)
        .map_err(|e| ResolveError::Challenge(format!("bad anchor url: {e}")))?;
    let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
    let kind = match segments.as_slice() {
        [.., kind, "anchor"] if matches!(*kind, "api2" | "enterprise") => kind.to_string(),
        _ => {
            return Err(ResolveError::Challenge(format!(
                "anchor url has unexpected path: {}",
                url.path()
            )));
        }
    };
    let query = url.query().unwrap_or_default().to_string();
    Ok((kind, query))
}

fn query_param<'q>(query: &'q str, key: &str) -> Option<&'q str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

pub(crate) fn extract_anchor_token(html: &str) -> Option<&str> {
    re_anchor_token()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub(crate) fn extract_reload_answer(body: &str) -> Option<&str> {
    re_reload_answer()
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub struct RecaptchaSolver {
    client: Client,
}

impl RecaptchaSolver {
    pub fn new(timeout: Duration) -> Result<Self, ResolveError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36",
            ),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl ChallengeSolver for RecaptchaSolver {
    fn solve(&self, anchor_url: &str) -> Result<String, ResolveError> {
        let (kind, query) = split_anchor(anchor_url)?;
        let base = format!("{RECAPTCHA_BASE}{kind}/");
        let param = |key: &str| {
            query_param(&query, key)
                .ok_or_else(|| ResolveError::Challenge(format!("anchor url is missing `{key}`")))
        };
        let (v, k, co) = (param("v")?, param("k")?, param("co")?);

        let anchor = self
            .client
            .get(format!("{base}anchor?{query}"))
            .send()?
            .error_for_status()?
            .text()?;
        let token = extract_anchor_token(&anchor)
            .ok_or_else(|| ResolveError::Challenge("anchor page has no recaptcha-token".into()))?;
        debug!(target: "challenge", kind = %kind, "已取得 anchor token");

        let body = format!("v={v}&reason=q&c={token}&k={k}&co={co}");
        let reload = self
            .client
            .post(format!("{base}reload?k={k}"))
            .body(body)
            .send()?
            .error_for_status()?
            .text()?;
        let answer = extract_reload_answer(&reload)
            .ok_or_else(|| ResolveError::Challenge("reload response has no rresp".into()))?;
        debug!(target: "challenge", "验证 token 已获取");
        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_url_encodes_origin() {
        let url = build_anchor_url("KEY", "https://ouo.press:443", "VER");
        assert!(url.contains("co=aHR0cHM6Ly9vdW8ucHJlc3M6NDQz"));
        assert!(url.starts_with("https://www.google.com/recaptcha/api2/anchor?ar=1&k=KEY"));
        let (kind, query) = split_anchor(&url).unwrap();
        assert_eq!(kind, "api2");
        assert_eq!(query_param(&query, "v"), Some("VER"));
    }

    #[test]
    fn rejects_non_anchor_paths() {
        let err = split_anchor("https://www.google.com/recaptcha/api2/bframe?k=1").unwrap_err();
        assert!(matches!(err, ResolveError::Challenge(_)));
    }

    #[test]
    fn extracts_tokens_from_responses() {
        let html = r#"<input type="hidden" id="recaptcha-token" value="03AGdBq">"#;
        assert_eq!(extract_anchor_token(html), Some("03AGdBq"));
        assert_eq!(extract_anchor_token("<html></html>"), None);
        assert_eq!(
            extract_reload_answer(r#")]}'["rresp","ANSWER",null,1]"#),
            Some("ANSWER")
        );
    }
}
