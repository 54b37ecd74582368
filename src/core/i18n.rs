// i18n 支持：请求语言解析、任务上下文语言与提示文本读取。
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::OnceLock;
use tokio::task_local;
use tracing::{error, warn};

/// 内置文案，随二进制发布；外部文件存在时逐条覆盖。
const BUILTIN_MESSAGES: &str = include_str!("../../config/i18n.messages.json");
const DEFAULT_I18N_MESSAGES_PATH: &str = "config/i18n.messages.json";

#[derive(Clone, Debug)]
struct I18nState {
    default_language: String,
    supported_languages: Vec<String>,
    aliases: HashMap<String, String>,
    messages: HashMap<String, HashMap<String, String>>,
}

impl I18nState {
    fn new() -> Self {
        let aliases = [
            ("zh", "zh-CN"),
            ("zh-cn", "zh-CN"),
            ("zh-hans", "zh-CN"),
            ("zh-hans-cn", "zh-CN"),
            ("en", "en-US"),
            ("en-us", "en-US"),
            ("en-gb", "en-US"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
        Self {
            default_language: "zh-CN".to_string(),
            supported_languages: vec!["zh-CN".to_string(), "en-US".to_string()],
            aliases,
            messages: parse_json_messages(BUILTIN_MESSAGES).unwrap_or_default(),
        }
    }
}

static I18N_STATE: OnceLock<RwLock<I18nState>> = OnceLock::new();

task_local! {
    static CURRENT_LANGUAGE: String;
}

fn state() -> &'static RwLock<I18nState> {
    I18N_STATE.get_or_init(|| {
        let mut state = I18nState::new();
        if let Some(overrides) = load_messages_from_json() {
            for (key, translations) in overrides {
                state.messages.entry(key).or_default().extend(translations);
            }
        }
        RwLock::new(state)
    })
}

/// 按配置文件设置默认语言与支持语言。
pub fn configure_i18n(default_language: Option<String>, supported_languages: Option<Vec<String>>) {
    let mut guard = state().write();
    if let Some(value) = default_language {
        let cleaned = value.trim().to_string();
        if !cleaned.is_empty() {
            guard.default_language = cleaned;
        }
    }
    if let Some(values) = supported_languages {
        let cleaned: Vec<String> = values
            .into_iter()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect();
        if !cleaned.is_empty() {
            guard.supported_languages = cleaned;
        }
    }
}

/// 在当前任务上下文中设置语言，返回可等待的执行结果。
pub async fn with_language<F, R>(language: String, fut: F) -> R
where
    F: Future<Output = R>,
{
    CURRENT_LANGUAGE.scope(language, fut).await
}

/// 同步版本，供 spawn_blocking 中的处理流程使用。
pub fn sync_with_language<F, R>(language: String, f: F) -> R
where
    F: FnOnce() -> R,
{
    CURRENT_LANGUAGE.sync_scope(language, f)
}

/// 获取当前上下文语言，未设置时回退默认值。
pub fn get_language() -> String {
    if let Ok(value) = CURRENT_LANGUAGE.try_with(|lang| lang.clone()) {
        return value;
    }
    get_default_language()
}

pub fn get_default_language() -> String {
    state().read().default_language.clone()
}

pub fn t(key: &str) -> String {
    t_with_params(key, &HashMap::new())
}

/// 翻译指定 key，并按 `{name}` 占位符替换参数。
pub fn t_with_params(key: &str, params: &HashMap<String, String>) -> String {
    if key.trim().is_empty() {
        return String::new();
    }
    let language = get_language();
    let state = state().read();
    let entry = state.messages.get(key);
    let template = entry
        .and_then(|map| map.get(&language))
        .or_else(|| entry.and_then(|map| map.get(&state.default_language)))
        .map(|value| value.as_str())
        .unwrap_or(key);
    if params.is_empty() {
        return template.to_string();
    }
    format_template(template, params)
}

/// 解析语言码并按别名规范化，支持 Accept-Language 形式的列表。
pub fn normalize_language(raw: Option<&str>, fallback: bool) -> String {
    let raw = raw.unwrap_or("").trim();
    for part in raw.split(',') {
        let code = part.split(';').next().unwrap_or("").trim();
        if let Some(normalized) = normalize_language_code(code) {
            return normalized;
        }
    }
    if fallback {
        get_default_language()
    } else {
        String::new()
    }
}

/// 按候选列表解析语言，全部无效时使用默认语言。
pub fn resolve_language<I>(candidates: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    for candidate in candidates {
        let text = candidate.as_ref().trim();
        if text.is_empty() {
            continue;
        }
        let normalized = normalize_language(Some(text), false);
        if !normalized.is_empty() {
            return normalized;
        }
    }
    get_default_language()
}

fn normalize_language_code(value: &str) -> Option<String> {
    let cleaned = value.trim();
    if cleaned.is_empty() {
        return None;
    }
    let lower = cleaned.to_lowercase();
    let state = state().read();
    if let Some(mapped) = state.aliases.get(&lower) {
        return Some(mapped.clone());
    }
    state
        .supported_languages
        .iter()
        .find(|lang| lang.eq_ignore_ascii_case(cleaned))
        .cloned()
}

fn format_template(template: &str, params: &HashMap<String, String>) -> String {
    static FORMAT_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(regex) = FORMAT_RE
        .get_or_init(|| match Regex::new(r"\{([a-zA-Z0-9_]+)\}") {
            Ok(regex) => Some(regex),
            Err(err) => {
                error!("invalid i18n placeholder regex: {err}");
                None
            }
        })
        .as_ref()
    else {
        return template.to_string();
    };
    regex
        .replace_all(template, |caps: &regex::Captures| {
            let key = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            match params.get(key) {
                Some(value) => value.clone(),
                None => caps.get(0).map(|m| m.as_str()).unwrap_or("").to_string(),
            }
        })
        .to_string()
}

fn resolve_messages_path() -> PathBuf {
    let env_path = std::env::var("SUSAR_I18N_MESSAGES_PATH").unwrap_or_default();
    let env_path = env_path.trim();
    if env_path.is_empty() {
        PathBuf::from(DEFAULT_I18N_MESSAGES_PATH)
    } else {
        PathBuf::from(env_path)
    }
}

fn load_messages_from_json() -> Option<HashMap<String, HashMap<String, String>>> {
    let path = resolve_messages_path();
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) => {
            warn!("读取文案文件失败: {}, {err}", path.display());
            return None;
        }
    };
    parse_json_messages(content.trim_start_matches('\u{FEFF}'))
}

fn parse_json_messages(text: &str) -> Option<HashMap<String, HashMap<String, String>>> {
    let value: Value = serde_json::from_str(text).ok()?;
    let Value::Object(map) = value else {
        return None;
    };
    let mut output: HashMap<String, HashMap<String, String>> = HashMap::new();
    for (key, item) in map {
        let Value::Object(lang_map) = item else {
            continue;
        };
        let translations = lang_map
            .into_iter()
            .filter_map(|(lang, value)| match value {
                Value::String(text) if !text.trim().is_empty() => Some((lang, text)),
                _ => None,
            })
            .collect::<HashMap<_, _>>();
        if !translations.is_empty() {
            output.insert(key, translations);
        }
    }
    if output.is_empty() {
        None
    } else {
        Some(output)
    }
}
