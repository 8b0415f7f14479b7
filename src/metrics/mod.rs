//! 메트릭 폴러 — 5초 간격으로 전체 서버 스냅샷을 받아 각 행의
//! RAM/CPU 표시를 제자리 갱신하고, 실행 중인 서버의 플레이어 수를
//! 행 인덱스만큼 지연시켜 한 번씩 조회합니다.
//!
//! 폴링 실패는 어떤 경우에도 행을 부분적으로 덮어쓰지 않습니다.
//! 실패한 틱은 조용히 버려지고 화면은 마지막 정상 값에 머뭅니다.

use crate::api::{PanelApiClient, ServerMetrics};
use crate::utils::{format_gb_from_mb, format_player_label};
use crate::view::ServerListView;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// used/limit에서 퍼센트를 계산하되, limit을 모르면(≤ 0) 백엔드가
/// 계산해 준 `ram` 필드를 그대로 씁니다.
pub fn ram_percent(used_mb: f64, limit_mb: f64, fallback_pct: f64) -> f64 {
    if limit_mb > 0.0 {
        used_mb / limit_mb * 100.0
    } else {
        fallback_pct
    }
}

/// [0, 100] 구간으로 클램프. 백엔드 데이터 품질과 무관하게 게이지 바가
/// 넘치지 않아야 하므로, 범위 밖 값은 거부하지 않고 자릅니다.
pub fn clamp_percent(pct: f64) -> f64 {
    pct.clamp(0.0, 100.0)
}

/// `"X GB / Y GB"` 형태의 RAM 표시 문자열. limit을 모르면 `"X GB / N/A"`.
pub fn ram_text(used_mb: f64, limit_mb: f64) -> String {
    if limit_mb > 0.0 {
        format!("{} / {}", format_gb_from_mb(used_mb), format_gb_from_mb(limit_mb))
    } else {
        format!("{} / N/A", format_gb_from_mb(used_mb))
    }
}

/// 메트릭 폴러. 타이머(취소 토큰)를 단독 소유하며 콘솔 폴러와
/// 독립적으로 동시에 돌 수 있습니다.
pub struct MetricsPoller {
    api: Arc<PanelApiClient>,
    view: Arc<dyn ServerListView>,
    poll: Mutex<Option<CancellationToken>>,
    poll_interval: Duration,
    player_stagger: Duration,
}

impl MetricsPoller {
    pub fn new(
        api: Arc<PanelApiClient>,
        view: Arc<dyn ServerListView>,
        poll_interval: Duration,
        player_stagger: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            api,
            view,
            poll: Mutex::new(None),
            poll_interval,
            player_stagger,
        })
    }

    /// 반복 폴링 시작. 메트릭 대상 행이 없는 화면에서는 유휴 타이머를
    /// 만들지 않습니다. 즉시 1회 갱신한 뒤, 기존 타이머가 있으면 취소하고
    /// (double-start 방지) 고정 간격 루프를 시작합니다.
    pub async fn start_polling(self: &Arc<Self>) {
        if !self.view.has_metric_rows() {
            return;
        }

        self.refresh_once().await;

        let cancel = CancellationToken::new();
        {
            let mut slot = self.poll.lock().await;
            if let Some(prev) = slot.take() {
                prev.cancel();
            }
            *slot = Some(cancel.clone());
        }

        let poller = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poller.poll_interval) => {}
                }
                poller.refresh_once().await;
            }
        });
    }

    /// 반복 폴링 중지 (멱등)
    pub async fn stop_polling(&self) {
        if let Some(prev) = self.poll.lock().await.take() {
            prev.cancel();
        }
    }

    /// 스냅샷 1회 갱신. 네트워크/파싱/애플리케이션 실패 시 행을 전혀
    /// 건드리지 않고 중단합니다 — 절대 undefined 값으로 부분 갱신하지
    /// 않습니다. 스냅샷에는 있지만 렌더링되지 않은 행은 건너뜁니다.
    pub async fn refresh_once(&self) {
        let servers = match self.api.servers().await {
            Ok(servers) => servers,
            Err(e) => {
                tracing::debug!("Metrics refresh error: {}", e);
                return;
            }
        };

        for server in &servers {
            if server.id.is_empty() {
                continue;
            }
            self.patch_row(server);
        }
    }

    /// 서버 한 대 분량을 해당 행에 반영
    fn patch_row(&self, server: &ServerMetrics) {
        let text = ram_text(server.ram_used_mb, server.ram_limit_mb);
        if !self.view.set_ram_text(&server.id, &text) {
            // 행이 없으면 이 서버는 현재 화면에 없는 것
            return;
        }

        let ram_pct = clamp_percent(ram_percent(
            server.ram_used_mb,
            server.ram_limit_mb,
            server.ram,
        ));
        self.view.set_ram_width(&server.id, ram_pct);

        let cpu_pct = clamp_percent(server.cpu);
        self.view.set_cpu_text(&server.id, &format!("{}%", cpu_pct.round() as i64));
        self.view.set_cpu_width(&server.id, cpu_pct);
    }

    /// 실행 중 플래그가 붙은 각 행에 대해 플레이어 수 조회를 한 번씩
    /// 예약합니다. 요청은 행 인덱스 × 고정 지연만큼 시차를 두어 쿼리
    /// 백엔드에 N개의 동시 요청이 몰리지 않게 합니다.
    pub fn init_player_counts(self: &Arc<Self>) {
        for (idx, row) in self.view.running_rows().into_iter().enumerate() {
            let poller = Arc::clone(self);
            let delay = self.player_stagger * idx as u32;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let port = if row.port.is_empty() { "25565" } else { row.port.as_str() };
                poller.refresh_player_count(&row.id, port).await;
            });
        }
    }

    /// 플레이어 수 1회 조회. 실패는 무시하고 기존 라벨을 유지합니다.
    async fn refresh_player_count(&self, id: &str, port: &str) {
        match self.api.server_players(id, port).await {
            Ok(count) => {
                self.view
                    .set_player_label(id, &format_player_label(count.online, count.max));
            }
            Err(e) => {
                tracing::debug!("Player count fetch failed for {}: {}", id, e);
            }
        }
    }

    /// 서버별 RAM 측정 경로 진단을 로그로 덤프합니다.
    /// 에이전트/cgroup 어느 쪽 값이 쓰였는지 추적할 때 사용합니다.
    pub async fn log_ram_debug(&self) {
        let servers = match self.api.servers().await {
            Ok(servers) => servers,
            Err(e) => {
                tracing::debug!("Failed to fetch servers for RAM debug: {}", e);
                return;
            }
        };

        for s in &servers {
            let details = s.ram_details.clone().unwrap_or_default();
            let agent = details.agent.unwrap_or_default();
            let cgroup = details.cgroup.unwrap_or_default();
            tracing::debug!(
                "[RAM DEBUG] {}: used={} MB limit={} MB pct={}% source={} | agent exists={} ageSec={:?} | cgroup used={:?} cap={:?} cpu={:?}",
                s.name,
                s.ram_used_mb,
                s.ram_limit_mb,
                s.ram,
                details.source.as_deref().unwrap_or("n/a"),
                agent.exists,
                agent.age_sec,
                cgroup.mem_used_mb,
                cgroup.mem_cap_mb,
                cgroup.cpu_percent,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_percent_prefers_used_over_limit() {
        assert_eq!(ram_percent(2048.0, 4096.0, 99.0), 50.0);
        assert_eq!(ram_percent(3000.0, 4000.0, 0.0), 75.0);
    }

    #[test]
    fn test_ram_percent_falls_back_when_limit_unknown() {
        assert_eq!(ram_percent(2048.0, 0.0, 150.0), 150.0);
        assert_eq!(ram_percent(2048.0, -1.0, 42.0), 42.0);
    }

    #[test]
    fn test_clamp_percent_bounds() {
        assert_eq!(clamp_percent(150.0), 100.0);
        assert_eq!(clamp_percent(-5.0), 0.0);
        assert_eq!(clamp_percent(50.0), 50.0);
        // 스펙의 엣지 케이스: limit 미상 + 범위 밖 fallback
        assert_eq!(clamp_percent(ram_percent(0.0, 0.0, 150.0)), 100.0);
    }

    #[test]
    fn test_ram_text_formats() {
        assert_eq!(ram_text(3000.0, 4000.0), "2.9 GB / 3.9 GB");
        assert_eq!(ram_text(3000.0, 0.0), "2.9 GB / N/A");
        assert_eq!(ram_text(0.0, 4096.0), "0 GB / 4 GB");
    }
}
