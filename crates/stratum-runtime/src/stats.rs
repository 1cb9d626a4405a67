use std::time::Duration;

#[derive(Clone, Copy, Debug, Default)]
pub struct TickStats {
    pub tick: u64,
    pub edits_applied: usize,
    pub edits_dropped: usize,
    pub columns_drained: usize,
    pub height_changes: usize,
    pub columns_finalized: usize,
    pub topmost_refreshed: usize,
    pub chunks_unloaded: usize,
    pub t_simulation: Duration,
    pub t_lighting: Duration,
    pub t_snapshot: Duration,
    pub t_finalize: Duration,
}

impl TickStats {
    pub fn total_time(&self) -> Duration {
        self.t_simulation + self.t_lighting + self.t_snapshot + self.t_finalize
    }

    /// Adds counts and timings from `other`; keeps the later tick number.
    pub fn merge(&mut self, other: &TickStats) {
        self.tick = self.tick.max(other.tick);
        self.edits_applied += other.edits_applied;
        self.edits_dropped += other.edits_dropped;
        self.columns_drained += other.columns_drained;
        self.height_changes += other.height_changes;
        self.columns_finalized += other.columns_finalized;
        self.topmost_refreshed += other.topmost_refreshed;
        self.chunks_unloaded += other.chunks_unloaded;
        self.t_simulation += other.t_simulation;
        self.t_lighting += other.t_lighting;
        self.t_snapshot += other.t_snapshot;
        self.t_finalize += other.t_finalize;
    }

    pub fn log(&self) {
        log::debug!(
            target: "perf",
            "tick={} ms_total={:.3} sim_ms={:.3} edits={} dropped={} light_ms={:.3} columns={} changes={} snap_ms={:.3} unloaded={} fin_ms={:.3} finalized={} topmost={}",
            self.tick,
            self.total_time().as_secs_f64() * 1000.0,
            self.t_simulation.as_secs_f64() * 1000.0,
            self.edits_applied,
            self.edits_dropped,
            self.t_lighting.as_secs_f64() * 1000.0,
            self.columns_drained,
            self.height_changes,
            self.t_snapshot.as_secs_f64() * 1000.0,
            self.chunks_unloaded,
            self.t_finalize.as_secs_f64() * 1000.0,
            self.columns_finalized,
            self.topmost_refreshed,
        );
    }
}
