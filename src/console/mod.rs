//! 콘솔 폴러 — 한 번에 한 서버의 콘솔 세션을 소유하고, 2초 간격으로
//! 로그 전문을 받아 뷰를 통째로 교체합니다.
//!
//! 원본 프론트엔드의 모듈 전역 `currentConsoleId`/`consoleInterval` 쌍을
//! 명시적인 `ConsoleSession` 오브젝트로 대체했고, 세션마다 단조 증가
//! 토큰을 부여해 close 이후 늦게 도착한 응답을 **전달 시점에** 걸러냅니다.
//! 폴링 실패는 삼키고 마지막 정상 출력을 유지합니다. 일시 장애가 콘솔
//! 화면을 지우거나 깨뜨려서는 안 됩니다.

pub mod ansi;

use crate::api::PanelApiClient;
use crate::view::ConsoleView;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// 활성 콘솔 세션. 타이머(취소 토큰)는 세션이 단독 소유합니다.
struct ConsoleSession {
    server_id: String,
    /// 세션 식별 토큰 — 응답 전달 시점 재검사에 사용
    token: u64,
    cancel: CancellationToken,
}

/// 콘솔 폴러. 프로세스 전체에 활성 폴링 타이머는 많아야 하나이며,
/// 새 세션을 열면 이전 타이머가 먼저 취소됩니다.
pub struct ConsolePoller {
    api: Arc<PanelApiClient>,
    view: Arc<dyn ConsoleView>,
    session: Mutex<Option<ConsoleSession>>,
    epoch: AtomicU64,
    poll_interval: Duration,
    near_bottom_px: f64,
}

impl ConsolePoller {
    pub fn new(
        api: Arc<PanelApiClient>,
        view: Arc<dyn ConsoleView>,
        poll_interval: Duration,
        near_bottom_px: f64,
    ) -> Arc<Self> {
        Arc::new(Self {
            api,
            view,
            session: Mutex::new(None),
            epoch: AtomicU64::new(0),
            poll_interval,
            near_bottom_px,
        })
    }

    /// 콘솔 세션 열기. 이미 열린 세션이 있으면 그 타이머를 먼저 취소하고
    /// (타이머 누수 방지) 새 세션으로 교체합니다. 첫 틱을 기다리지 않고
    /// 즉시 한 번 가져온 뒤 반복 폴링을 시작합니다.
    pub async fn open_session(self: &Arc<Self>, server_id: &str, display_name: &str) {
        let token = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        {
            let mut slot = self.session.lock().await;
            if let Some(prev) = slot.take() {
                prev.cancel.cancel();
            }
            *slot = Some(ConsoleSession {
                server_id: server_id.to_string(),
                token,
                cancel: cancel.clone(),
            });
        }

        self.view.show(&format!("{} - Console", display_name));
        self.view.set_placeholder("Loading logs...");

        let poller = Arc::clone(self);
        tokio::spawn(async move {
            // 즉시 1회 + 이후 고정 간격 반복
            poller.poll_once(token).await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poller.poll_interval) => {}
                }
                poller.poll_once(token).await;
            }
        });

        self.view.focus_input();
    }

    /// 로그 1회 폴링. 세션이 없거나 `token`이 현재 세션과 다르면 무시합니다.
    /// 취소가 비동기이므로 close 직후 떠돌이 틱이 올 수 있고, 응답이 도착한
    /// 뒤에도 같은 검사를 반복해 늦은 응답의 뷰 쓰기를 차단합니다.
    pub async fn poll_once(&self, token: u64) {
        let Some(server_id) = self.session_id_for(token).await else {
            return;
        };

        let logs = match self.api.console_logs(&server_id).await {
            Ok(logs) => logs,
            Err(e) => {
                // 일시 장애: 마지막 정상 출력 유지
                tracing::debug!("Console fetch error for {}: {}", server_id, e);
                return;
            }
        };

        // 전달 시점 재검사 — close 이후 도착한 응답은 폐기
        if self.session_id_for(token).await.is_none() {
            return;
        }

        let clean = ansi::strip_ansi(&logs);
        // 교체 *전*의 스크롤 위치로 자동 팔로우 여부를 결정한다
        let was_at_bottom = self.view.near_bottom(self.near_bottom_px);
        self.view.replace_content(&clean);
        if was_at_bottom {
            self.view.scroll_to_bottom();
        }
    }

    /// 콘솔 닫기. 뷰를 숨기고 타이머를 취소하며 세션 id를 지웁니다.
    /// 활성 세션이 없어도 안전합니다 (멱등).
    pub async fn close_session(&self) {
        self.view.hide();
        let mut slot = self.session.lock().await;
        if let Some(prev) = slot.take() {
            prev.cancel.cancel();
        }
    }

    /// 콘솔 명령 전송. 빈 입력이거나 세션이 없으면 아무것도 하지 않습니다.
    /// 에코 줄(`> cmd`)을 즉시 추가한 뒤 요청을 보내고, 성공이든 실패든
    /// 입력 필드 복구(활성화/비우기/포커스)는 항상 수행합니다.
    pub async fn submit_command(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let Some(server_id) = self.active_server_id().await else {
            return;
        };

        // 요청 중 중복 전송 방지
        self.view.set_input_enabled(false);
        self.view.append_line(&format!("> {}", text));
        self.view.scroll_to_bottom();

        match self.api.console_command(&server_id, text).await {
            Ok(message) => {
                if let Some(message) = message {
                    self.view.append_line(&message);
                }
                self.view.scroll_to_bottom();
            }
            Err(e) => {
                // 대화형 실패는 트랜스크립트에 그대로 표시 (자동 재시도 없음)
                self.view.append_line(&format!("Error: {}", e));
            }
        }

        // 모든 경로에서 실행되는 복구 단계
        self.view.set_input_enabled(true);
        self.view.clear_input();
        self.view.focus_input();
    }

    /// 현재 활성 세션의 서버 id
    pub async fn active_server_id(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.server_id.clone())
    }

    pub async fn has_active_session(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// `token`이 현재 세션의 것일 때만 서버 id 반환
    async fn session_id_for(&self, token: u64) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .filter(|s| s.token == token)
            .map(|s| s.server_id.clone())
    }
}
