//! 配置文件读写与带注释生成。
//!
//! 文件不存在时写出带注释的默认配置；存在时把用户值深度合并到默认值上，
//! 校验通过后若缺少字段则补全写回。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid yaml at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMeta {
    pub name: &'static str,
    pub description: &'static str,
}

pub trait ConfigSpec: Serialize + DeserializeOwned + Default {
    const FILE_NAME: &'static str;
    fn fields() -> &'static [FieldMeta];

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

pub fn load_or_create<T: ConfigSpec>(config_path: Option<&Path>) -> Result<T, ConfigError> {
    load_or_create_with_base::<T>(config_path, None)
}

/// `config_path` 优先；否则使用 `base_dir/FILE_NAME`；都没有时用当前目录。
pub fn load_or_create_with_base<T: ConfigSpec>(
    config_path: Option<&Path>,
    base_dir: Option<&Path>,
) -> Result<T, ConfigError> {
    let path = resolve_path::<T>(config_path, base_dir);
    ensure_parent(&path)?;

    if !path.exists() {
        let default_config = T::default();
        write_with_comments(&default_config, &path)?;
        info!("已生成默认配置: {}", path.display());
        return Ok(default_config);
    }

    let user_yaml = read_yaml(&path)?;
    let missing = missing_fields::<T>(&user_yaml);

    let mut merged = serde_yaml::to_value(T::default())
        .map_err(|err| ConfigError::Validation(err.to_string()))?;
    merge_values(&mut merged, user_yaml);

    let config: T =
        serde_yaml::from_value(merged).map_err(|err| ConfigError::Validation(err.to_string()))?;
    config.validate().map_err(ConfigError::Validation)?;

    if !missing.is_empty() {
        debug!("配置缺少字段 {:?}，补全后写回", missing);
        write_with_comments(&config, &path)?;
    }

    Ok(config)
}

pub fn write_with_comments<T: ConfigSpec>(config: &T, path: &Path) -> Result<(), ConfigError> {
    ensure_parent(path)?;
    let yaml = generate_yaml_with_comments(config)?;
    fs::write(path, yaml).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn generate_yaml_with_comments<T: ConfigSpec>(config: &T) -> Result<String, ConfigError> {
    let value =
        serde_yaml::to_value(config).map_err(|err| ConfigError::Validation(err.to_string()))?;
    let Value::Mapping(mapping) = value else {
        return Err(ConfigError::Validation(
            "config must serialize to a mapping".to_string(),
        ));
    };

    let mut sections = Vec::new();
    for field in T::fields() {
        let mut section = String::new();
        if !field.description.is_empty() {
            section.push_str(&format!("# {}\n", field.description.replace('\n', "\n# ")));
        }
        let key = Value::String(field.name.to_string());
        let val = mapping.get(&key).cloned().unwrap_or(Value::Null);
        let yaml = serde_yaml::to_string(&serde_yaml::Mapping::from_iter([(key, val)]))
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        section.push_str(yaml.trim_end());
        sections.push(section);
    }

    // 顶层字段之间空一行，便于手工编辑
    Ok(sections.join("\n\n") + "\n")
}

fn read_yaml(path: &Path) -> Result<Value, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn missing_fields<T: ConfigSpec>(user_yaml: &Value) -> Vec<&'static str> {
    let Value::Mapping(map) = user_yaml else {
        return T::fields().iter().map(|f| f.name).collect();
    };
    T::fields()
        .iter()
        .filter(|f| !map.contains_key(Value::String(f.name.to_string())))
        .map(|f| f.name)
        .collect()
}

fn merge_values(default: &mut Value, user: Value) {
    match (default, user) {
        (Value::Mapping(dest), Value::Mapping(src)) => {
            for (key, user_val) in src {
                if let Some(dest_val) = dest.get_mut(&key) {
                    merge_values(dest_val, user_val);
                } else {
                    dest.insert(key, user_val);
                }
            }
        }
        // 空文件解析为 Null，保留默认值
        (_, Value::Null) => {}
        // 列表整体替换：站点/区域顺序即优先级，不能逐项合并
        (dest, other) => {
            *dest = other;
        }
    }
}

fn resolve_path<T: ConfigSpec>(path: Option<&Path>, base_dir: Option<&Path>) -> PathBuf {
    match (path, base_dir) {
        (Some(p), _) => p.to_path_buf(),
        (None, Some(base)) => base.join(T::FILE_NAME),
        (None, None) => PathBuf::from(T::FILE_NAME),
    }
}

fn ensure_parent(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_system::context::Config;

    #[test]
    fn creates_commented_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg: Config = load_or_create_with_base(None, Some(dir.path())).unwrap();
        assert_eq!(cfg.max_retries, 5);

        let written = fs::read_to_string(dir.path().join("config.yml")).unwrap();
        assert!(written.contains("# 下载站点，按优先级排列"));
        assert!(written.contains("dl_sites:"));
    }

    #[test]
    fn user_values_override_and_missing_fields_are_filled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "dl_sites:\n- MegaUp\nmax_retries: 2\n").unwrap();

        let cfg: Config = load_or_create(Some(&path)).unwrap();
        assert_eq!(cfg.dl_sites, vec!["MegaUp".to_string()]);
        assert_eq!(cfg.max_retries, 2);
        assert_eq!(cfg.prefer_filetype, "NSP");

        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("prefer_filetype"));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "max_retries: 0\n").unwrap();
        let err = load_or_create::<Config>(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn broken_yaml_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "dl_sites: [unclosed\n").unwrap();
        let err = load_or_create::<Config>(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
