use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONNECTION, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::{debug, error};

use crate::base_system::context::Config;

const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";

/// 抓取目录页与游戏页 HTML。
pub struct PageClient {
    client: Client,
    user_agent: String,
}

impl PageClient {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        default_headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            user_agent: DEFAULT_UA.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(Duration::from_secs(config.request_timeout))
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .unwrap_or(HeaderValue::from_static("Mozilla/5.0")),
        );
        headers
    }

    pub fn fetch_html(&self, url: &str) -> Result<String> {
        debug!(target: "network", "请求页面: {}", url);
        let resp = self
            .client
            .get(url)
            .headers(self.get_headers())
            .send()
            .with_context(|| format!("请求失败: {url}"))?;

        if resp.status().as_u16() == 404 {
            error!(target: "network", "页面不存在: {}", url);
            bail!("page not found: {url}");
        }
        let text = resp
            .error_for_status()
            .with_context(|| format!("页面返回错误状态: {url}"))?
            .text()?;
        debug!(target: "network", bytes = text.len(), "页面已获取");
        Ok(text)
    }
}
