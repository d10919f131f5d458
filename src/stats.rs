use std::{
    collections::VecDeque,
    fmt::{self, Display},
    time::{Duration, Instant},
};

/// Frequency statistics for one bit class.
#[derive(Debug, Clone, Copy)]
pub struct HzStats {
    pub count: u64,
    pub min: u32,
    pub max: u32,
    pub avg: f64,
}

impl HzStats {
    pub fn new() -> Self {
        Self {
            count: 0,
            min: u32::MAX,
            max: 0,
            avg: 0.0,
        }
    }

    pub fn record(&mut self, hz: u32) {
        self.count += 1;
        self.min = self.min.min(hz);
        self.max = self.max.max(hz);
        // Incremental mean, seeded by the first observation.
        self.avg += (hz as f64 - self.avg) / self.count as f64;
    }
}

impl Default for HzStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for HzStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return f.write_str("no cycles");
        }

        write!(
            f,
            "{}-{}Hz avg: {:.1}Hz variation: {}Hz ({} cycles)",
            self.min,
            self.max,
            self.avg,
            self.max - self.min,
            self.count
        )
    }
}

/// Everything the bit decoder observed about the signal. Purely
/// observational; decode results never depend on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitStats {
    pub one: HzStats,
    pub nul: HzStats,
    /// Cycles whose frequency fell outside both tolerance windows.
    pub rejected: u64,
}

impl BitStats {
    pub fn bits(&self) -> u64 {
        self.one.count + self.nul.count
    }
}

/// Throughput and ETA tracking over a known total, smoothed over the last
/// few observations.
pub struct ProcessInfo {
    total: u64,
    start: Instant,
    recent: VecDeque<(Instant, u64)>,
    use_last_rates: usize,
}

pub struct Progress {
    pub eta: Duration,
    /// Units per second.
    pub rate: f64,
}

impl ProcessInfo {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            start: Instant::now(),
            recent: VecDeque::new(),
            use_last_rates: 4,
        }
    }

    pub fn update(&mut self, position: u64) -> Progress {
        let now = Instant::now();
        if self.recent.len() == self.use_last_rates {
            self.recent.pop_front();
        }

        let (since, from) = *self.recent.front().unwrap_or(&(self.start, 0));
        self.recent.push_back((now, position));

        let elapsed = now.duration_since(since).as_secs_f64();
        let rate = if elapsed > 0.0 {
            (position.saturating_sub(from)) as f64 / elapsed
        } else {
            0.0
        };

        let remaining = self.total.saturating_sub(position);
        let eta = if rate > 0.0 {
            Duration::from_secs_f64(remaining as f64 / rate)
        } else {
            Duration::ZERO
        };

        Progress { eta, rate }
    }
}
