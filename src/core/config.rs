// 配置读取：YAML 文件 + 环境变量占位符展开，文件缺失时使用默认值。
use crate::services::susar::SusarSettings;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::env;
use std::fmt;
use std::fs;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/susar.yaml";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub i18n: I18nConfig,
    #[serde(default)]
    pub susar: SusarSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    #[serde(deserialize_with = "deserialize_u16_from_any")]
    pub port: u16,
    #[serde(deserialize_with = "deserialize_usize_from_any")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    pub allow_origins: Option<Vec<String>>,
    pub allow_methods: Option<Vec<String>>,
    pub allow_headers: Option<Vec<String>>,
    pub allow_credentials: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct I18nConfig {
    pub default_language: String,
    pub supported_languages: Vec<String>,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_language: "zh-CN".to_string(),
            supported_languages: vec!["zh-CN".to_string(), "en-US".to_string()],
        }
    }
}

fn deserialize_u16_from_any<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_u64_from_any(deserializer)?;
    u16::try_from(value).map_err(|_| de::Error::custom("u16 out of range"))
}

fn deserialize_usize_from_any<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_u64_from_any(deserializer)?;
    usize::try_from(value).map_err(|_| de::Error::custom("usize out of range"))
}

/// 占位符展开后端口等数值可能是字符串，两种写法都接受。
fn deserialize_u64_from_any<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct U64Visitor;

    impl<'de> Visitor<'de> for U64Visitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("unsigned integer or numeric string")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(value).map_err(|_| E::custom("value must be non-negative"))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(E::custom("numeric string is empty"));
            }
            trimmed
                .parse::<u64>()
                .map_err(|_| E::custom("invalid numeric string"))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            self.visit_str(&value)
        }
    }

    deserializer.deserialize_any(U64Visitor)
}

pub fn config_path() -> String {
    env::var("SUSAR_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

pub fn load_config() -> Config {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &str) -> Config {
    let mut value = read_yaml(path);
    if value.is_null() {
        return Config::default();
    }
    expand_yaml_env(&mut value);
    serde_yaml::from_value::<Config>(value).unwrap_or_else(|err| {
        warn!("配置解析失败，使用默认配置: {err}");
        Config::default()
    })
}

fn read_yaml(path: &str) -> Value {
    // 配置文件允许不存在，直接使用内置默认值。
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!("读取配置失败: {path}, {err}");
            return Value::Null;
        }
    };
    serde_yaml::from_str(&content).unwrap_or_else(|err| {
        warn!("解析 YAML 失败: {path}, {err}");
        Value::Null
    })
}

fn expand_yaml_env(value: &mut Value) {
    match value {
        Value::String(text) => {
            *text = expand_env_placeholders(text);
        }
        Value::Sequence(items) => {
            for item in items {
                expand_yaml_env(item);
            }
        }
        Value::Mapping(map) => {
            for (_, value) in map.iter_mut() {
                expand_yaml_env(value);
            }
        }
        _ => {}
    }
}

fn expand_env_placeholders(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        rest = &rest[start + 2..];
        let Some(end) = rest.find('}') else {
            output.push_str("${");
            output.push_str(rest);
            return output;
        };
        let inner = &rest[..end];
        rest = &rest[end + 1..];
        let (name, default_value) = match inner.split_once(":-") {
            Some((name, default_value)) => (name.trim(), Some(default_value)),
            None => (inner.trim(), None),
        };
        if name.is_empty() {
            output.push_str("${");
            output.push_str(inner);
            output.push('}');
            continue;
        }
        let resolved = env::var(name).ok().filter(|value| !value.is_empty());
        match (resolved, default_value) {
            (Some(value), _) => output.push_str(&value),
            (None, Some(default_value)) => output.push_str(default_value),
            (None, None) => {}
        }
    }
    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn placeholders_fall_back_to_defaults() {
        std::env::remove_var("SUSAR_TEST_PLACEHOLDER");
        assert_eq!(
            expand_env_placeholders("${SUSAR_TEST_PLACEHOLDER:-default}"),
            "default"
        );
        std::env::set_var("SUSAR_TEST_PLACEHOLDER", "value");
        assert_eq!(
            expand_env_placeholders("prefix-${SUSAR_TEST_PLACEHOLDER}-suffix"),
            "prefix-value-suffix"
        );
        std::env::remove_var("SUSAR_TEST_PLACEHOLDER");
        assert_eq!(expand_env_placeholders("${SUSAR_TEST_PLACEHOLDER}"), "");
        assert_eq!(expand_env_placeholders("${unterminated"), "${unterminated");
    }

    #[test]
    fn yaml_file_overrides_selected_fields() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "server:\n  port: \"${{SUSAR_TEST_UNSET_PORT:-6001}}\"\n  max_upload_bytes: 1024\nsusar:\n  limits:\n    row_cap: 500\n"
        )
        .expect("write config");
        let config = load_config_from(&file.path().to_string_lossy());
        assert_eq!(config.server.port, 6001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.max_upload_bytes, 1024);
        assert_eq!(config.susar.limits.row_cap, 500);
        assert_eq!(config.susar.limits.report_batch_rows, 50);
        assert_eq!(config.i18n.default_language, "zh-CN");
    }

    #[test]
    fn missing_or_broken_file_uses_defaults() {
        let config = load_config_from("/nonexistent/susar.yaml");
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "server: [unterminated").expect("write config");
        let config = load_config_from(&file.path().to_string_lossy());
        assert_eq!(config.server.port, DEFAULT_PORT);
    }
}
