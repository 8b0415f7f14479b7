use serde::Deserialize;
use std::time::Duration;

/// 패널 설정 — `config/panel.toml`에서 읽으며, 파일이 없거나 깨져 있으면
/// 전부 기본값으로 동작합니다.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PanelConfig {
    pub api_base_url: Option<String>,
    pub console_poll_secs: Option<u64>,
    pub metrics_poll_secs: Option<u64>,
    pub player_stagger_ms: Option<u64>,
    pub near_bottom_px: Option<f64>,
    pub request_timeout_secs: Option<u64>,
}

impl PanelConfig {
    pub fn load() -> anyhow::Result<Self> {
        let s = std::fs::read_to_string("config/panel.toml").unwrap_or_default();
        let cfg: Self = toml::from_str(&s).unwrap_or_default();
        Ok(cfg)
    }

    pub fn api_base_url(&self) -> String {
        self.api_base_url
            .clone()
            .unwrap_or_else(|| "http://127.0.0.1/plugins/mcmm/api.php".to_string())
    }

    /// 콘솔 로그 폴링 간격 (기본 2초)
    pub fn console_poll_interval(&self) -> Duration {
        Duration::from_secs(self.console_poll_secs.unwrap_or(2))
    }

    /// 메트릭 폴링 간격 (기본 5초)
    pub fn metrics_poll_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_poll_secs.unwrap_or(5))
    }

    /// 플레이어 수 조회 시차 (기본 150ms × 행 인덱스)
    pub fn player_stagger(&self) -> Duration {
        Duration::from_millis(self.player_stagger_ms.unwrap_or(150))
    }

    /// 자동 팔로우 판정 임계값 (기본 50px)
    pub fn near_bottom_threshold(&self) -> f64 {
        self.near_bottom_px.unwrap_or(50.0)
    }

    /// HTTP 요청 타임아웃 (기본 10초)
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(10))
    }
}
