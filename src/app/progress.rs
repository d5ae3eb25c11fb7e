//! Progress UI (per-object bars) for download runs.

use std::collections::HashMap;
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use objdl_core::{RemoteObject, TransferObserver};

const OBJECT_TEMPLATE: &str =
    "{spinner} {msg:<32!} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec})";
const OVERALL_TEMPLATE: &str = "{prefix} [{pos}/{len}] {msg}";

/// Renders one bar per in-flight object plus an overall object counter.
pub(crate) struct ProgressObserver {
    multi: MultiProgress,
    overall: ProgressBar,
    object_style: ProgressStyle,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl ProgressObserver {
    pub(crate) fn new(total_objects: usize) -> Self {
        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_objects as u64));
        overall.set_style(
            ProgressStyle::with_template(OVERALL_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        overall.set_prefix("objects");

        let object_style = ProgressStyle::with_template(OBJECT_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        Self {
            multi,
            overall,
            object_style,
            bars: Mutex::new(HashMap::new()),
        }
    }

    /// Clears every bar once the run has ended.
    pub(crate) fn finish(&self) {
        if let Ok(mut bars) = self.bars.lock() {
            for (_, bar) in bars.drain() {
                bar.finish_and_clear();
            }
        }
        self.overall.finish_and_clear();
    }
}

impl TransferObserver for ProgressObserver {
    fn wave_started(&self, wave: usize, total: usize, _objects: &[RemoteObject]) {
        self.overall.set_message(format!("wave {wave}/{total}"));
    }

    fn task_started(&self, object: &RemoteObject) {
        let bar = self
            .multi
            .insert_before(&self.overall, ProgressBar::new(object.size));
        bar.set_style(self.object_style.clone());
        bar.set_message(object.file_name().to_string());
        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(object.key.clone(), bar);
        }
    }

    fn bytes_written(&self, key: &str, len: u64) {
        if let Ok(bars) = self.bars.lock()
            && let Some(bar) = bars.get(key)
        {
            bar.inc(len);
        }
    }

    fn task_finished(&self, key: &str, _succeeded: bool) {
        if let Ok(mut bars) = self.bars.lock()
            && let Some(bar) = bars.remove(key)
        {
            bar.finish_and_clear();
        }
        self.overall.inc(1);
    }
}
