//! 下载交接模块入口。
//!
//! 子模块：
//! - `selection` — 按偏好选出唯一发行并裁剪条目
//! - `handoff`   — 挑站点、展开短链，生成交接清单

pub mod handoff;
pub mod selection;
