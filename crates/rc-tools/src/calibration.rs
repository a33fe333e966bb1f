//! 标定数据文件
//!
//! 油门反馈阈值表以 JSON 保存：
//!
//! ```json
//! {
//!   "threshold_steps": [0.07, 0.08, 0.09, 0.1, 0.125],
//!   "min_valid": 500,
//!   "data": [8700, 4800, 3500, 2550, 1850]
//! }
//! ```

use anyhow::{Context, Result};
use rc_protocol::ThresholdTable;
use std::fs;
use std::path::Path;

/// 从 JSON 文件加载并校验阈值表
pub fn load_threshold_table<P: AsRef<Path>>(path: P) -> Result<ThresholdTable> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read threshold table {}", path.display()))?;
    parse_threshold_table(&content)
        .with_context(|| format!("invalid threshold table {}", path.display()))
}

/// 解析并校验 JSON 阈值表
pub fn parse_threshold_table(content: &str) -> Result<ThresholdTable> {
    let table: ThresholdTable = serde_json::from_str(content)?;
    table.validate()?;
    Ok(table)
}

/// 将阈值表写为 JSON 文件
pub fn save_threshold_table<P: AsRef<Path>>(table: &ThresholdTable, path: P) -> Result<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(table)?;
    fs::write(path, content)
        .with_context(|| format!("unable to write threshold table {}", path.display()))?;
    Ok(())
}
