//! 패널 뷰 추상화 — 원본 페이지의 DOM 표면을 대신하는 좁은 인터페이스.
//!
//! 폴러는 DOM id/클래스 대신 이 트레이트만 바라보므로, 폴링/정제 로직을
//! 실제 렌더러 없이 단위 테스트할 수 있습니다. 두 폴러는 서로 다른
//! 메서드 집합만 호출하므로 (콘솔 vs 서버 행) 쓰기 충돌이 없습니다.

use std::sync::Mutex;

/// 콘솔 모달 표면. 원본의 `consoleModal`/`consoleOutput`/`consoleInput`
/// 3요소에 대응합니다.
pub trait ConsoleView: Send + Sync {
    fn show(&self, title: &str);
    fn hide(&self);
    /// 로딩 중 플레이스홀더 표시 (출력 내용을 대체)
    fn set_placeholder(&self, text: &str);
    /// 출력 전체를 새 내용으로 교체 (diff 없음)
    fn replace_content(&self, text: &str);
    /// 뷰포트가 하단에서 `threshold_px` 이내인지 — 교체 *직전*에 물어야
    /// 자동 팔로우 여부를 올바르게 판단할 수 있습니다.
    fn near_bottom(&self, threshold_px: f64) -> bool;
    fn scroll_to_bottom(&self);
    /// 트랜스크립트에 한 줄 추가 (명령 에코/응답/에러)
    fn append_line(&self, line: &str);
    fn set_input_enabled(&self, enabled: bool);
    fn clear_input(&self);
    fn focus_input(&self);
}

/// 실행 중 플래그가 붙은 서버 행 (플레이어 수 갱신 대상)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningRow {
    pub id: String,
    pub port: String,
}

/// 서버 목록 표면. 행 갱신 메서드는 해당 행이 현재 렌더링되어 있으면
/// true, 없으면 false를 돌려줍니다 (없는 행은 건너뜀).
pub trait ServerListView: Send + Sync {
    /// 메트릭 대상 행이 하나라도 있는지 (없으면 폴링 자체를 시작하지 않음)
    fn has_metric_rows(&self) -> bool;
    fn running_rows(&self) -> Vec<RunningRow>;
    fn set_ram_text(&self, id: &str, text: &str) -> bool;
    fn set_ram_width(&self, id: &str, pct: f64) -> bool;
    fn set_cpu_text(&self, id: &str, text: &str) -> bool;
    fn set_cpu_width(&self, id: &str, pct: f64) -> bool;
    fn set_player_label(&self, id: &str, text: &str) -> bool;
}

/// 콘솔 페인 상태
#[derive(Debug, Clone)]
pub struct ConsolePane {
    pub visible: bool,
    pub title: String,
    pub content: String,
    /// 뷰포트 하단까지 남은 스크롤 거리(px). 0이면 맨 아래.
    pub scroll_gap_px: f64,
    pub input_enabled: bool,
    pub input_focused: bool,
    pub input_text: String,
}

impl Default for ConsolePane {
    fn default() -> Self {
        Self {
            visible: false,
            title: String::new(),
            content: String::new(),
            scroll_gap_px: 0.0,
            input_enabled: true,
            input_focused: false,
            input_text: String::new(),
        }
    }
}

/// 서버 행 상태
#[derive(Debug, Clone)]
pub struct ServerRow {
    pub id: String,
    pub name: String,
    pub running: bool,
    pub port: String,
    pub ram_text: String,
    pub ram_width_pct: f64,
    pub cpu_text: String,
    pub cpu_width_pct: f64,
    pub player_label: String,
}

impl ServerRow {
    pub fn new(id: impl Into<String>, name: impl Into<String>, running: bool, port: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            running,
            port: port.into(),
            ram_text: String::new(),
            ram_width_pct: 0.0,
            cpu_text: String::new(),
            cpu_width_pct: 0.0,
            // 플레이어 수를 아직 조회하지 못한 행의 기본 라벨
            player_label: "offline".to_string(),
        }
    }
}

/// 인메모리 패널 — 헤드리스 실행과 테스트에서 쓰는 기본 뷰 구현.
/// 갱신 내용은 `tracing`으로 흘려보냅니다.
#[derive(Default)]
pub struct TextPanel {
    console: Mutex<ConsolePane>,
    rows: Mutex<Vec<ServerRow>>,
}

impl TextPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 서버 행 등록. 같은 id가 이미 있으면 교체합니다.
    pub fn register_row(&self, row: ServerRow) {
        let mut rows = self.rows.lock().expect("rows lock");
        if let Some(existing) = rows.iter_mut().find(|r| r.id == row.id) {
            *existing = row;
        } else {
            rows.push(row);
        }
    }

    /// 현재 콘솔 페인 상태 스냅샷
    pub fn console_state(&self) -> ConsolePane {
        self.console.lock().expect("console lock").clone()
    }

    /// id로 행 상태 스냅샷
    pub fn row(&self, id: &str) -> Option<ServerRow> {
        self.rows
            .lock()
            .expect("rows lock")
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// 사용자가 스크롤을 올린 상황 재현용 (테스트)
    pub fn set_scroll_gap(&self, px: f64) {
        self.console.lock().expect("console lock").scroll_gap_px = px;
    }

    fn with_row<F: FnOnce(&mut ServerRow)>(&self, id: &str, f: F) -> bool {
        let mut rows = self.rows.lock().expect("rows lock");
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                f(row);
                true
            }
            None => false,
        }
    }
}

impl ConsoleView for TextPanel {
    fn show(&self, title: &str) {
        let mut pane = self.console.lock().expect("console lock");
        pane.visible = true;
        pane.title = title.to_string();
        tracing::info!("Console opened: {}", title);
    }

    fn hide(&self) {
        self.console.lock().expect("console lock").visible = false;
        tracing::info!("Console closed");
    }

    fn set_placeholder(&self, text: &str) {
        self.console.lock().expect("console lock").content = text.to_string();
    }

    fn replace_content(&self, text: &str) {
        let mut pane = self.console.lock().expect("console lock");
        pane.content = text.to_string();
        tracing::debug!("Console content replaced ({} bytes)", text.len());
    }

    fn near_bottom(&self, threshold_px: f64) -> bool {
        self.console.lock().expect("console lock").scroll_gap_px <= threshold_px
    }

    fn scroll_to_bottom(&self) {
        self.console.lock().expect("console lock").scroll_gap_px = 0.0;
    }

    fn append_line(&self, line: &str) {
        let mut pane = self.console.lock().expect("console lock");
        if !pane.content.is_empty() && !pane.content.ends_with('\n') {
            pane.content.push('\n');
        }
        pane.content.push_str(line);
        pane.content.push('\n');
        tracing::info!("console> {}", line);
    }

    fn set_input_enabled(&self, enabled: bool) {
        self.console.lock().expect("console lock").input_enabled = enabled;
    }

    fn clear_input(&self) {
        self.console.lock().expect("console lock").input_text.clear();
    }

    fn focus_input(&self) {
        self.console.lock().expect("console lock").input_focused = true;
    }
}

impl ServerListView for TextPanel {
    fn has_metric_rows(&self) -> bool {
        !self.rows.lock().expect("rows lock").is_empty()
    }

    fn running_rows(&self) -> Vec<RunningRow> {
        self.rows
            .lock()
            .expect("rows lock")
            .iter()
            .filter(|r| r.running)
            .map(|r| RunningRow {
                id: r.id.clone(),
                port: r.port.clone(),
            })
            .collect()
    }

    fn set_ram_text(&self, id: &str, text: &str) -> bool {
        let text = text.to_string();
        self.with_row(id, |row| {
            tracing::debug!("{}: RAM {}", row.name, text);
            row.ram_text = text;
        })
    }

    fn set_ram_width(&self, id: &str, pct: f64) -> bool {
        self.with_row(id, |row| row.ram_width_pct = pct)
    }

    fn set_cpu_text(&self, id: &str, text: &str) -> bool {
        let text = text.to_string();
        self.with_row(id, |row| {
            tracing::debug!("{}: CPU {}", row.name, text);
            row.cpu_text = text;
        })
    }

    fn set_cpu_width(&self, id: &str, pct: f64) -> bool {
        self.with_row(id, |row| row.cpu_width_pct = pct)
    }

    fn set_player_label(&self, id: &str, text: &str) -> bool {
        let text = text.to_string();
        self.with_row(id, |row| {
            tracing::info!("{}: {}", row.name, text);
            row.player_label = text;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_row_replaces_duplicate() {
        let panel = TextPanel::new();
        panel.register_row(ServerRow::new("s1", "alpha", true, "25565"));
        panel.register_row(ServerRow::new("s1", "alpha-renamed", false, "25566"));
        let row = panel.row("s1").unwrap();
        assert_eq!(row.name, "alpha-renamed");
        assert!(!row.running);
    }

    #[test]
    fn test_missing_row_updates_return_false() {
        let panel = TextPanel::new();
        assert!(!panel.set_ram_text("ghost", "1 GB / 2 GB"));
        assert!(!panel.set_cpu_width("ghost", 50.0));
        assert!(!panel.set_player_label("ghost", "1 / 1 players"));
    }

    #[test]
    fn test_running_rows_filters_stopped() {
        let panel = TextPanel::new();
        panel.register_row(ServerRow::new("s1", "alpha", true, "25565"));
        panel.register_row(ServerRow::new("s2", "beta", false, "25566"));
        panel.register_row(ServerRow::new("s3", "gamma", true, "25567"));
        let running = panel.running_rows();
        assert_eq!(running.len(), 2);
        assert_eq!(running[0].id, "s1");
        assert_eq!(running[1].id, "s3");
    }

    #[test]
    fn test_row_ids_are_opaque_strings() {
        // CSS 이스케이프가 필요했던 id도 맵 조회에서는 그냥 문자열
        let panel = TextPanel::new();
        panel.register_row(ServerRow::new("srv:1/a\"b", "odd", true, "25565"));
        assert!(panel.set_ram_text("srv:1/a\"b", "1 GB / 2 GB"));
        assert_eq!(panel.row("srv:1/a\"b").unwrap().ram_text, "1 GB / 2 GB");
    }

    #[test]
    fn test_near_bottom_threshold() {
        let panel = TextPanel::new();
        panel.set_scroll_gap(0.0);
        assert!(ConsoleView::near_bottom(&panel, 50.0));
        panel.set_scroll_gap(50.0);
        assert!(ConsoleView::near_bottom(&panel, 50.0));
        panel.set_scroll_gap(51.0);
        assert!(!ConsoleView::near_bottom(&panel, 50.0));
    }

    #[test]
    fn test_append_line_keeps_line_structure() {
        let panel = TextPanel::new();
        panel.replace_content("log line");
        panel.append_line("> say hi");
        panel.append_line("Ran say hi");
        assert_eq!(panel.console_state().content, "log line\n> say hi\nRan say hi\n");
    }
}
