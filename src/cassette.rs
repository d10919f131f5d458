use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use log::{debug, info};

use crate::{
    misc::human_duration,
    stats::{BitStats, ProcessInfo},
    wave::{Sample, Spec},
};

/// A "1" is a single sine cycle at 2400 Hz.
pub const BIT_ONE_HZ: u32 = 2400;
/// A "0" is a single sine cycle at 1200 Hz.
pub const BIT_NUL_HZ: u32 = 1200;
/// How far a cycle's frequency may scatter and still match a bit.
pub const HZ_VARIATION: u32 = 450;

/// How many consecutive same-sign samples count as a polarity flip.
pub const MIN_TOGGLE_COUNT: usize = 4;
/// Amplitudes this close to zero are noise and count for neither sign.
pub const MIN_SAMPLE_VALUE: i32 = 5;

#[derive(Debug, Clone, Copy)]
pub struct DecodeConfig {
    pub bit_one_hz: u32,
    pub bit_nul_hz: u32,
    pub hz_variation: u32,
    /// Initial polarity guess. The signal itself does not tell us whether
    /// the recording starts in a positive or negative half-wave; on a
    /// zero-leader warning, retry with this inverted.
    pub even_odd: bool,
    pub min_toggle_count: usize,
    pub min_sample_value: i32,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            bit_one_hz: BIT_ONE_HZ,
            bit_nul_hz: BIT_NUL_HZ,
            hz_variation: HZ_VARIATION,
            even_odd: false,
            min_toggle_count: MIN_TOGGLE_COUNT,
            min_sample_value: MIN_SAMPLE_VALUE,
        }
    }
}

/// Counts window entries above `+min_value` and below `-min_value`.
pub fn count_sign(values: impl IntoIterator<Item = i32>, min_value: i32) -> (usize, usize) {
    let mut positive = 0;
    let mut negative = 0;
    for value in values {
        if value > min_value {
            positive += 1;
        } else if value < -min_value {
            negative += 1;
        }
    }

    (positive, negative)
}

/// Demodulates an amplitude sequence into bits, one full sine cycle at a
/// time. Single pass, lazy; restart by re-running the whole pipeline.
pub struct Bits<I> {
    samples: I,
    config: DecodeConfig,
    sample_rate: u32,
    frame_count: u64,

    one_hz: (u32, u32),
    nul_hz: (u32, u32),

    window: VecDeque<i32>,
    last_census: Option<(usize, usize)>,
    in_positive: bool,
    toggle_count: u32,
    previous_frame: u64,

    stats: BitStats,
    progress: ProcessInfo,
    next_status: Instant,
}

impl<I: Iterator<Item = Sample>> Bits<I> {
    pub fn new(samples: I, spec: Spec, config: DecodeConfig) -> Self {
        Self {
            samples,
            sample_rate: spec.sample_rate,
            frame_count: spec.frame_count,
            one_hz: (
                config.bit_one_hz.saturating_sub(config.hz_variation),
                config.bit_one_hz + config.hz_variation,
            ),
            nul_hz: (
                config.bit_nul_hz.saturating_sub(config.hz_variation),
                config.bit_nul_hz + config.hz_variation,
            ),
            window: VecDeque::with_capacity(config.min_toggle_count),
            last_census: None,
            in_positive: config.even_odd,
            toggle_count: 0,
            previous_frame: 0,
            stats: BitStats::default(),
            progress: ProcessInfo::new(spec.frame_count),
            next_status: Instant::now() + Duration::from_millis(250),
            config,
        }
    }

    pub fn stats(&self) -> &BitStats {
        &self.stats
    }

    fn report(&mut self, frame_no: u64) {
        if Instant::now() < self.next_status {
            return;
        }
        self.next_status = Instant::now() + Duration::from_secs(1);

        let progress = self.progress.update(frame_no);
        info!(
            "frame {}/{}, {} bits, eta: {} ({:.0} frames/sec)",
            frame_no,
            self.frame_count,
            self.stats.bits(),
            human_duration(progress.eta),
            progress.rate
        );
    }
}

impl<I: Iterator<Item = Sample>> Iterator for Bits<I> {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        loop {
            let sample = self.samples.next()?;

            self.window.push_back(sample.value);
            if self.window.len() > self.config.min_toggle_count {
                self.window.pop_front();
            }
            if self.window.len() < self.config.min_toggle_count {
                continue;
            }

            // Re-evaluating an unchanged window would re-trigger on the same
            // half-wave.
            let census = count_sign(self.window.iter().copied(), self.config.min_sample_value);
            if self.last_census == Some(census) {
                continue;
            }
            self.last_census = Some(census);

            let (positive, negative) = census;
            let full = self.config.min_toggle_count;
            if !self.in_positive && positive == full && negative == 0 {
                self.in_positive = true;
            } else if self.in_positive && negative == full && positive == 0 {
                self.in_positive = false;
            } else {
                continue;
            }

            self.toggle_count += 1;
            if self.toggle_count < 2 {
                continue;
            }
            // Two polarity flips make one complete cycle.
            self.toggle_count = 0;

            let duration = (sample.frame_no - self.previous_frame).max(1);
            self.previous_frame = sample.frame_no;
            let hz = (self.sample_rate as u64 / duration) as u32;

            let bit = if hz > self.one_hz.0 && hz < self.one_hz.1 {
                self.stats.one.record(hz);
                true
            } else if hz > self.nul_hz.0 && hz < self.nul_hz.1 {
                self.stats.nul.record(hz);
                false
            } else {
                self.stats.rejected += 1;
                debug!("skipping {hz}Hz cycle at frame {}", sample.frame_no);
                continue;
            };

            self.report(sample.frame_no);
            return Some(bit);
        }
    }
}
