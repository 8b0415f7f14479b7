//! mcmm 패널 API 클라이언트 — 단일 JSON 엔드포인트(`api.php`)에
//! `action` 쿼리 파라미터를 붙여 GET 요청을 보냅니다.
//!
//! 모든 응답은 `{success, data?/logs?/message?, error?}` 봉투 형태이며,
//! JSON이 아니거나 `success:false`인 응답은 예외가 아니라 타입화된
//! `ApiError`로 반환됩니다. 폴링 경로에서 이를 삼킬지, 사용자에게
//! 표시할지는 호출자가 결정합니다.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// API 통신 오류 타입
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response body: {0}")]
    MalformedBody(String),

    /// 서버가 `success:false`로 응답한 경우 (애플리케이션 레벨 실패)
    #[error("{0}")]
    Api(String),
}

/// 서버 제어 명령 (`server_control`의 `cmd`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlCommand {
    #[serde(rename = "start")]
    Start,
    #[serde(rename = "stop")]
    Stop,
    #[serde(rename = "restart")]
    Restart,
}

impl ControlCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

/// 플레이어 관리 명령 (`server_player_action`의 `player_action`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAction {
    #[serde(rename = "kick")]
    Kick,
    #[serde(rename = "ban")]
    Ban,
    #[serde(rename = "op")]
    Op,
    #[serde(rename = "deop")]
    Deop,
}

impl PlayerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kick => "kick",
            Self::Ban => "ban",
            Self::Op => "op",
            Self::Deop => "deop",
        }
    }
}

/// `servers` 스냅샷의 서버 한 대 분량.
///
/// 백엔드 데이터 품질을 신뢰하지 않으므로 숫자 필드는 전부
/// `#[serde(default)]`로 누락을 0으로 취급합니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerMetrics {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "isRunning")]
    pub is_running: bool,
    #[serde(default)]
    pub ports: String,
    #[serde(default, rename = "ramUsedMb")]
    pub ram_used_mb: f64,
    #[serde(default, rename = "ramLimitMb")]
    pub ram_limit_mb: f64,
    /// limit을 알 수 없을 때 쓰는 백엔드 계산 퍼센트 (fallback)
    #[serde(default)]
    pub ram: f64,
    #[serde(default)]
    pub cpu: f64,
    #[serde(default, rename = "ramDetails")]
    pub ram_details: Option<RamDetails>,
}

/// RAM 측정 경로 진단 정보 (`logRamDebug` 용)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RamDetails {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub agent: Option<AgentDetails>,
    #[serde(default)]
    pub cgroup: Option<CgroupDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentDetails {
    #[serde(default)]
    pub exists: bool,
    #[serde(default, rename = "ageSec")]
    pub age_sec: Option<f64>,
    #[serde(default)]
    pub ts: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CgroupDetails {
    #[serde(default, rename = "memUsedMb")]
    pub mem_used_mb: Option<f64>,
    #[serde(default, rename = "memCapMb")]
    pub mem_cap_mb: Option<f64>,
    #[serde(default, rename = "cpuPercent")]
    pub cpu_percent: Option<f64>,
}

/// `server_players` 응답 (`data` 필드)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerCount {
    #[serde(default)]
    pub online: u32,
    /// 쿼리 백엔드가 최대 인원을 못 알아낸 경우 None
    #[serde(default)]
    pub max: Option<u32>,
    #[serde(default)]
    pub players: Vec<PlayerEntry>,
}

/// 플레이어 목록 항목 — 백엔드에 따라 이름 문자열이거나
/// `{name, isOp}` 오브젝트일 수 있습니다.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PlayerEntry {
    Info {
        #[serde(default)]
        name: String,
        #[serde(default, rename = "isOp")]
        is_op: bool,
    },
    Name(String),
}

impl PlayerEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Info { name, .. } => name,
            Self::Name(name) => name,
        }
    }

    pub fn is_op(&self) -> bool {
        matches!(self, Self::Info { is_op: true, .. })
    }
}

/// 공통 응답 봉투. 액션마다 쓰는 필드만 다릅니다.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    logs: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// 응답 본문을 봉투로 파싱. JSON이 아니면 `MalformedBody`.
fn parse_envelope(body: &str) -> Result<Envelope, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::MalformedBody(e.to_string()))
}

impl Envelope {
    /// `success:false`를 `ApiError::Api`로 승격. `fallback`은 서버가
    /// 에러 메시지조차 주지 않았을 때 쓰는 문구입니다.
    fn into_ok(self, fallback: &str) -> Result<Envelope, ApiError> {
        if self.success {
            Ok(self)
        } else {
            Err(ApiError::Api(
                self.error.unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }

    /// `data` 필드를 원하는 타입으로 디코딩
    fn data_as<T: serde::de::DeserializeOwned>(self, what: &str) -> Result<T, ApiError> {
        let data = self
            .data
            .ok_or_else(|| ApiError::MalformedBody(format!("{} response missing data", what)))?;
        serde_json::from_value(data).map_err(|e| ApiError::MalformedBody(e.to_string()))
    }
}

/// 패널 API 클라이언트
#[derive(Debug, Clone)]
pub struct PanelApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl PanelApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET 요청 후 봉투 파싱까지만 수행 (success 검사는 호출자 몫)
    async fn raw(&self, action: &str, params: &[(&str, &str)]) -> Result<Envelope, ApiError> {
        let mut query: Vec<(&str, &str)> = vec![("action", action)];
        query.extend_from_slice(params);
        tracing::debug!("GET {} action={}", self.base_url, action);

        let resp = self.http.get(&self.base_url).query(&query).send().await?;
        let text = resp.text().await?;
        parse_envelope(&text)
    }

    /// GET 요청 + `success:false`를 에러로 변환
    async fn call(&self, action: &str, params: &[(&str, &str)]) -> Result<Envelope, ApiError> {
        self.raw(action, params).await?.into_ok("Unknown error")
    }

    /// `console_logs` — 현재 세션 서버의 로그 전문
    pub async fn console_logs(&self, id: &str) -> Result<String, ApiError> {
        let env = self.call("console_logs", &[("id", id)]).await?;
        Ok(env.logs.unwrap_or_default())
    }

    /// `console_command` — 콘솔 명령 실행, 서버가 돌려준 메시지 반환
    pub async fn console_command(&self, id: &str, cmd: &str) -> Result<Option<String>, ApiError> {
        let env = self
            .raw("console_command", &[("id", id), ("cmd", cmd)])
            .await?
            .into_ok("Command failed")?;
        Ok(env.message)
    }

    /// `servers` — 전체 서버 메트릭 스냅샷. 중간 캐시를 우회하도록
    /// 타임스탬프 캐시버스터(`_`)를 붙입니다.
    pub async fn servers(&self) -> Result<Vec<ServerMetrics>, ApiError> {
        let buster = cache_buster();
        let env = self.call("servers", &[("_", buster.as_str())]).await?;
        env.data_as("servers")
    }

    /// `server_players` — 실행 중인 서버의 접속 인원/목록
    pub async fn server_players(&self, id: &str, port: &str) -> Result<PlayerCount, ApiError> {
        let env = self
            .call("server_players", &[("id", id), ("port", port)])
            .await?;
        env.data_as("server_players")
    }

    /// `server_player_action` — kick/ban/op/deop
    pub async fn player_action(
        &self,
        id: &str,
        player: &str,
        action: PlayerAction,
    ) -> Result<(), ApiError> {
        self.call(
            "server_player_action",
            &[("id", id), ("player", player), ("player_action", action.as_str())],
        )
        .await?;
        Ok(())
    }

    /// `server_control` — start/stop/restart
    pub async fn server_control(&self, id: &str, cmd: ControlCommand) -> Result<(), ApiError> {
        self.call("server_control", &[("id", id), ("cmd", cmd.as_str())])
            .await?;
        Ok(())
    }

    /// `server_delete` — 컨테이너와 데이터 삭제
    pub async fn server_delete(&self, id: &str) -> Result<(), ApiError> {
        self.call("server_delete", &[("id", id)]).await?;
        Ok(())
    }
}

/// 밀리초 단위 타임스탬프 문자열 (원본 프론트엔드의 `Date.now()` 상당)
fn cache_buster() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_envelope_success_logs() {
        let env = parse_envelope(r#"{"success":true,"logs":"line1\nline2"}"#).unwrap();
        assert!(env.success);
        assert_eq!(env.logs.as_deref(), Some("line1\nline2"));
    }

    #[test]
    fn test_parse_envelope_rejects_non_json() {
        let err = parse_envelope("<html>Fatal error</html>").unwrap_err();
        assert!(matches!(err, ApiError::MalformedBody(_)));
    }

    #[test]
    fn test_into_ok_surfaces_server_error() {
        let env = parse_envelope(r#"{"success":false,"error":"Container not found"}"#).unwrap();
        let err = env.into_ok("Unknown error").unwrap_err();
        assert_eq!(err.to_string(), "Container not found");
    }

    #[test]
    fn test_into_ok_fallback_message() {
        let env = parse_envelope(r#"{"success":false}"#).unwrap();
        let err = env.into_ok("Command failed").unwrap_err();
        assert_eq!(err.to_string(), "Command failed");
    }

    #[test]
    fn test_server_metrics_tolerates_missing_fields() {
        let env = parse_envelope(r#"{"success":true,"data":[{"id":"abc"}]}"#).unwrap();
        let servers: Vec<ServerMetrics> = env.data_as("servers").unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].id, "abc");
        assert_eq!(servers[0].ram_used_mb, 0.0);
        assert_eq!(servers[0].cpu, 0.0);
        assert!(!servers[0].is_running);
    }

    #[test]
    fn test_player_count_decoding() {
        let env = parse_envelope(
            r#"{"success":true,"data":{"online":3,"max":20,"players":["Steve",{"name":"Alex","isOp":true}]}}"#,
        )
        .unwrap();
        let count: PlayerCount = env.data_as("server_players").unwrap();
        assert_eq!(count.online, 3);
        assert_eq!(count.max, Some(20));
        assert_eq!(count.players[0].name(), "Steve");
        assert!(!count.players[0].is_op());
        assert_eq!(count.players[1].name(), "Alex");
        assert!(count.players[1].is_op());
    }

    #[test]
    fn test_player_count_unknown_max() {
        let env = parse_envelope(r#"{"success":true,"data":{"online":1}}"#).unwrap();
        let count: PlayerCount = env.data_as("server_players").unwrap();
        assert_eq!(count.online, 1);
        assert_eq!(count.max, None);
        assert!(count.players.is_empty());
    }

    #[test]
    fn test_action_strings() {
        assert_eq!(ControlCommand::Start.as_str(), "start");
        assert_eq!(ControlCommand::Stop.as_str(), "stop");
        assert_eq!(PlayerAction::Deop.as_str(), "deop");
    }
}
