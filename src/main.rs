//! NXBrew 发行目录抓取与短链解析工具。
//!
//! 本 crate 负责：配置加载、游戏页下载区块解析、按偏好选择发行、短链展开并输出交接清单。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志/重试等基础设施
//! - `release_parser`：HTML → 区块序列 → 发行目录（扫描状态机与子解析器）
//! - `network_parser`：页面抓取、短链跳转解析、人机验证
//! - `download`：发行选择与交接清单

use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

mod base_system;
mod download;
mod network_parser;
mod release_parser;

use base_system::config::{load_or_create, load_or_create_with_base};
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use download::handoff::plan_handoff;
use download::selection::select_release;
use network_parser::network::PageClient;
use network_parser::redirect::ResolveLink;
use network_parser::resolver_from_config;
use release_parser::index::parse_game_index;
use release_parser::parse_page;
use tracing::{info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "nxbrew-dl")]
#[command(about = "NXBrew release catalogue scanner and link resolver")]
struct Cli {
    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 显示版本信息后退出
    #[arg(long, default_value_t = false)]
    version: bool,

    /// 数据目录路径（用于存放 config.yml 和 logs 等文件）
    #[arg(long)]
    data_dir: Option<String>,

    /// 抓取并输出游戏索引
    #[arg(long, default_value_t = false)]
    index: bool,

    /// 游戏页地址
    #[arg(long, conflicts_with = "file")]
    page: Option<String>,

    /// 本地保存的游戏页 HTML
    #[arg(long)]
    file: Option<PathBuf>,

    /// 选出发行并展开短链，输出交接清单
    #[arg(long, default_value_t = false)]
    handoff: bool,

    /// 只解析一条短链
    #[arg(long)]
    link: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("NXBrew-dl v{}", VERSION);
        return Ok(());
    }

    let data_dir = cli.data_dir.as_ref().map(Path::new);
    let _log = init_logging(cli.debug, data_dir)?;

    let config = if let Some(dir) = data_dir {
        load_or_create_with_base::<Config>(None, Some(dir)).map_err(|e| anyhow!(e.to_string()))?
    } else {
        load_or_create::<Config>(None).map_err(|e| anyhow!(e.to_string()))?
    };
    info!(target: "startup", "当前版本: v{}", VERSION);

    if let Some(link) = cli.link.as_deref() {
        let resolver = resolver_from_config(&config)?;
        println!("{}", resolver.resolve(link)?);
        return Ok(());
    }

    if cli.index {
        let client = PageClient::from_config(&config)?;
        let html = client.fetch_html(&config.game_index_url())?;
        let games = parse_game_index(&html, &config)?;
        info!(target: "startup", "索引中共 {} 个游戏", games.len());
        println!("{}", serde_json::to_string_pretty(&games)?);
        return Ok(());
    }

    let (source, html) = match (cli.page.as_deref(), cli.file.as_deref()) {
        (Some(url), _) => (url.to_string(), PageClient::from_config(&config)?.fetch_html(url)?),
        (None, Some(path)) => (
            path.display().to_string(),
            fs::read_to_string(path).with_context(|| format!("读取失败: {}", path.display()))?,
        ),
        (None, None) => {
            if cli.handoff {
                bail!("--handoff 需要配合 --page 或 --file 使用");
            }
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    let catalogue = parse_page(&html, &config)?;
    if catalogue.is_empty() {
        warn!(target: "startup", "{} 中没有可识别的发行", source);
    } else {
        info!(target: "startup", "{} 中找到 {} 个发行", source, catalogue.len());
    }

    if !cli.handoff {
        println!("{}", serde_json::to_string_pretty(&catalogue)?);
        return Ok(());
    }

    let release = select_release(&catalogue, &config)?;
    let resolver = resolver_from_config(&config)?;
    let items = plan_handoff(&release, &config, &resolver)?;
    let out = json!({
        "source": source,
        "release": release.key(),
        "download_dir": config.default_download_dir(),
        "items": items,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn init_logging(debug: bool, base_dir: Option<&Path>) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        use_color: true,
        archive_on_exit: true,
        console: true,
    };
    match base_dir {
        Some(dir) => LogSystem::init_with_base(opts, Some(dir)),
        None => LogSystem::init(opts),
    }
    .map_err(|e| anyhow!(e))
}
