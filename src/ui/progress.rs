use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct ProgressManager {
    mp: MultiProgress,
    bars: Arc<Mutex<HashMap<String, ProgressBar>>>,
}

impl ProgressManager {
    pub fn new() -> Self {
        Self {
            mp: MultiProgress::new(),
            bars: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 创建新的进度条
    /// - `id`: 进度条唯一标识
    /// - `total`: 总进度值，0 表示无上限（spinner）
    /// - `template`: 进度条模板
    pub fn create_bar(
        &self,
        id: &str,
        total: u64,
        template: &str,
        message: &str,
    ) -> Result<(), String> {
        let mut bars = self
            .bars
            .lock()
            .map_err(|e| format!("Lock error: {}", e))?;

        if bars.contains_key(id) {
            return Err(format!("Progress bar '{}' already exists", id));
        }

        let pb = if total == 0 {
            self.mp.add(ProgressBar::no_length())
        } else {
            self.mp.add(ProgressBar::new(total))
        };
        let style = ProgressStyle::default_bar()
            .template(template)
            .map_err(|e| format!("Bad template: {}", e))?
            .progress_chars("█▉▊▋▌▍▎▏ ");
        pb.set_style(style);
        pb.set_message(message.to_string());

        bars.insert(id.to_string(), pb);
        Ok(())
    }

    fn with_bar(&self, id: &str, f: impl FnOnce(&ProgressBar)) -> Result<(), String> {
        let bars = self
            .bars
            .lock()
            .map_err(|e| format!("Lock error: {}", e))?;
        let pb = bars
            .get(id)
            .ok_or_else(|| format!("Progress bar '{}' not found", id))?;
        f(pb);
        Ok(())
    }

    /// 更新进度条位置
    pub fn set_position(&self, id: &str, pos: u64) -> Result<(), String> {
        self.with_bar(id, |pb| pb.set_position(pos))
    }

    pub fn inc(&self, id: &str, value: u64) -> Result<(), String> {
        self.with_bar(id, |pb| pb.inc(value))
    }

    pub fn set_message(&self, id: &str, message: &str) -> Result<(), String> {
        self.with_bar(id, |pb| pb.set_message(message.to_string()))
    }

    pub fn position(&self, id: &str) -> Option<u64> {
        self.bars.lock().ok()?.get(id).map(|pb| pb.position())
    }

    /// 完成所有进度条（保留显示）
    pub fn finish_all(&self) {
        if let Ok(mut bars) = self.bars.lock() {
            for (_, pb) in bars.drain() {
                pb.finish();
            }
        }
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

pub mod templates {
    pub const SENDER: &str =
        "\u{f048a} SEND [{bar:30.cyan}] {pos}/{len} frames {msg}";
    pub const RECEIVER: &str =
        "\u{f04e6} RECV [{bar:30.blue}] {pos}/{len} frames {msg}";
    pub const OPEN_ENDED: &str = "{spinner} {prefix}{pos} frames {msg}";
}
