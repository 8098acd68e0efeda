use crate::domain::model::ItemStatus;
use crate::utils::report;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const TICK_INTERVAL: Duration = Duration::from_millis(125);
/// 最後一格是結束時顯示的內容
const TICK_STRINGS: [&str; 5] = ["|", "/", "–", "\\", ""];

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{msg} {spinner}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&TICK_STRINGS)
}

struct Ticker {
    handle: JoinHandle<()>,
    bar: ProgressBar,
}

/// 目前步驟的進度動畫，同時間只有一個 ticker
pub struct ProgressReporter {
    enabled: bool,
    ticker: Mutex<Option<Ticker>>,
    ticks: Arc<AtomicUsize>,
}

impl ProgressReporter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ticker: Mutex::new(None),
            ticks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn quiet() -> Self {
        Self::new(false)
    }

    /// 總共畫過的影格數
    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::Relaxed)
    }

    /// 開始 `title` 的動畫，先取消正在執行的 ticker
    pub fn start(&self, title: &str) {
        self.stop();
        if !self.enabled {
            return;
        }
        // 沒有 runtime 時就不顯示動畫
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.set_message(title.to_string());

        let spinner = bar.clone();
        let ticks = Arc::clone(&self.ticks);
        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            loop {
                interval.tick().await;
                spinner.tick();
                ticks.fetch_add(1, Ordering::Relaxed);
            }
        });

        if let Ok(mut slot) = self.ticker.lock() {
            *slot = Some(Ticker { handle, bar });
        }
    }

    pub fn stop(&self) {
        let previous = self.ticker.lock().ok().and_then(|mut slot| slot.take());
        if let Some(ticker) = previous {
            ticker.handle.abort();
            ticker.bar.finish_and_clear();
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .map(|slot| {
                slot.as_ref()
                    .is_some_and(|ticker| !ticker.handle.is_finished())
            })
            .unwrap_or(false)
    }

    /// 結束目前步驟並輸出狀態列
    pub fn finish(&self, status: &ItemStatus) {
        self.stop();
        if self.enabled {
            report::print_row(status);
        }
    }

    pub fn title(&self, text: &str) {
        if self.enabled {
            report::print_title(text);
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.ticker.lock() {
            if let Some(ticker) = slot.take() {
                ticker.handle.abort();
                ticker.bar.finish_and_clear();
            }
        }
    }
}
