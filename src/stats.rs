//! Per-solve metrics: expansions, peak open-set size, wall time — threaded
//! through every planner and rendered into the response envelope.

use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub expansions: usize,
    pub peak_open_size: usize,
    pub high_level_expansions: usize,
    elapsed_start: Option<Instant>,
    pub elapsed_ms: f64,
}

impl Stats {
    pub fn start() -> Self {
        Stats {
            elapsed_start: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_expansion(&mut self, open_size: usize) {
        self.expansions += 1;
        self.peak_open_size = self.peak_open_size.max(open_size);
    }

    pub fn finish(&mut self) {
        if let Some(start) = self.elapsed_start.take() {
            self.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        }
    }
}
