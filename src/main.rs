mod api;
mod config;
mod console;
mod metrics;
mod utils;
mod view;

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("mcmm panel core starting");

    let cfg = config::PanelConfig::load()?;
    let api = Arc::new(api::PanelApiClient::new(
        cfg.api_base_url(),
        cfg.request_timeout(),
    )?);
    tracing::info!("Panel API endpoint: {}", api.base_url());

    let panel = Arc::new(view::TextPanel::new());

    // 최초 1회 서버 목록을 받아 패널 행을 등록
    match api.servers().await {
        Ok(servers) => {
            for s in &servers {
                panel.register_row(view::ServerRow::new(
                    s.id.as_str(),
                    s.name.as_str(),
                    s.is_running,
                    utils::primary_port(&s.ports),
                ));
            }
            tracing::info!("Registered {} server rows", servers.len());
        }
        Err(e) => tracing::warn!("Initial server fetch failed: {}", e),
    }

    // 메트릭 폴링 + 플레이어 수 조회 시작
    let metrics = metrics::MetricsPoller::new(
        api.clone(),
        panel.clone(),
        cfg.metrics_poll_interval(),
        cfg.player_stagger(),
    );
    metrics.start_polling().await;
    metrics.init_player_counts();
    // RAM 측정 경로 진단 (RUST_LOG=debug에서만 보임)
    metrics.log_ram_debug().await;

    // MCMM_CONSOLE_ID가 지정되면 해당 서버의 콘솔 세션을 열고
    // stdin 입력을 콘솔 명령으로 전달
    let console = match std::env::var("MCMM_CONSOLE_ID") {
        Ok(id) if !id.is_empty() => {
            let poller = console::ConsolePoller::new(
                api.clone(),
                panel.clone(),
                cfg.console_poll_interval(),
                cfg.near_bottom_threshold(),
            );
            poller.open_session(&id, &id).await;

            let stdin_poller = poller.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    stdin_poller.submit_command(&line).await;
                }
            });
            Some(poller)
        }
        _ => None,
    };

    // Graceful shutdown: Ctrl+C 시 폴러 정리
    tokio::signal::ctrl_c().await.ok();
    tracing::info!("Shutdown signal received, stopping pollers");
    if let Some(console) = console {
        console.close_session().await;
    }
    metrics.stop_polling().await;

    tracing::info!("mcmm panel core shutting down");
    Ok(())
}
