//! 网络层。
//!
//! 子模块：
//! - `network`   — 页面抓取客户端
//! - `redirect`  — 短链跳转解析（带重试）
//! - `challenge` — 人机验证 token 获取
//! - `error`     — 解析错误类型

pub mod challenge;
pub mod error;
pub mod network;
pub mod redirect;

use std::time::Duration;

use crate::base_system::context::Config;
use crate::base_system::cooldown_retry::FixedDelay;
use challenge::{RecaptchaSolver, build_anchor_url};
use error::ResolveError;
use redirect::{RedirectResolver, ReqwestSessions};

pub type DefaultResolver = RedirectResolver<ReqwestSessions, RecaptchaSolver>;

/// 按配置组装默认的短链解析器。
pub fn resolver_from_config(config: &Config) -> Result<DefaultResolver, ResolveError> {
    let timeout = Duration::from_secs(config.request_timeout);
    let anchor_url = build_anchor_url(
        &config.recaptcha_site_key,
        &config.recaptcha_origin,
        &config.recaptcha_version,
    );
    Ok(RedirectResolver::new(
        ReqwestSessions::new(timeout),
        RecaptchaSolver::new(timeout)?,
        anchor_url,
        FixedDelay::new(
            config.max_retries,
            Duration::from_secs(config.retry_delay_secs),
        ),
    ))
}
