// 全局状态：只读配置，请求之间不共享任何可变数据。
use crate::config::Config;
use crate::services::susar::SusarSettings;

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn settings(&self) -> &SusarSettings {
        &self.config.susar
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.config.server.max_upload_bytes
    }
}
