use std::{fs::File, io::BufReader, path::Path};

use anyhow::{ensure, Result};
use hound::{SampleFormat, WavIntoSamples, WavReader};
use log::warn;

/// Supported PCM sample widths, in bits.
pub const SUPPORTED_WIDTHS: [u16; 3] = [8, 16, 32];

#[derive(Debug, Clone, Copy)]
pub struct Spec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub frame_count: u64,
}

/// One audio frame: a monotonically increasing frame number and the signed
/// amplitude at that frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub frame_no: u64,
    pub value: i32,
}

/// Opens a WAV file as a lazy sample sequence.
pub fn open(path: &Path) -> Result<(Spec, Samples)> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    ensure!(
        spec.channels == 1,
        "unsupported channel layout: {} channels, only mono input is supported",
        spec.channels
    );
    ensure!(
        spec.sample_format == SampleFormat::Int
            && SUPPORTED_WIDTHS.contains(&spec.bits_per_sample),
        "unsupported sample width: {}-bit {:?} samples, only 8/16/32-bit integer PCM is supported",
        spec.bits_per_sample,
        spec.sample_format
    );

    let out = Spec {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        frame_count: reader.duration() as u64,
    };

    Ok((
        out,
        Samples {
            inner: reader.into_samples(),
            frame_no: 0,
        },
    ))
}

pub struct Samples {
    inner: WavIntoSamples<BufReader<File>, i32>,
    frame_no: u64,
}

impl Iterator for Samples {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        match self.inner.next()? {
            Ok(value) => {
                let sample = Sample {
                    frame_no: self.frame_no,
                    value,
                };
                self.frame_no += 1;
                Some(sample)
            }
            Err(err) => {
                warn!("wav read error after {} frames: {err}", self.frame_no);
                None
            }
        }
    }
}

/// The same lazy interface over an in-memory capture buffer.
pub struct BufferSamples {
    inner: std::vec::IntoIter<i32>,
    frame_no: u64,
}

pub fn from_buffer(samples: Vec<i32>) -> BufferSamples {
    BufferSamples {
        inner: samples.into_iter(),
        frame_no: 0,
    }
}

impl Iterator for BufferSamples {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let sample = Sample {
            frame_no: self.frame_no,
            value: self.inner.next()?,
        };
        self.frame_no += 1;
        Some(sample)
    }
}

/// Lazy linear-interpolation rate converter. Lossy; only meant for
/// downsampling oversampled recordings, never for bit-exact work.
pub struct Resample<I> {
    inner: I,
    /// Input frames advanced per output frame.
    step: f64,
    out_no: u64,
    lo: Option<Sample>,
    hi: Option<Sample>,
}

impl<I: Iterator<Item = Sample>> Resample<I> {
    pub fn new(inner: I, from_rate: u32, to_rate: u32) -> Self {
        Self {
            inner,
            step: from_rate as f64 / to_rate as f64,
            out_no: 0,
            lo: None,
            hi: None,
        }
    }
}

impl<I: Iterator<Item = Sample>> Iterator for Resample<I> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let pos = self.out_no as f64 * self.step;
        let idx = pos as u64;
        let frac = pos - idx as f64;

        // Advance the input until `lo`/`hi` bracket the source position.
        loop {
            match self.hi {
                Some(hi) if hi.frame_no > idx => break,
                _ => {
                    self.lo = self.hi;
                    self.hi = Some(self.inner.next()?);
                }
            }
        }

        let hi = self.hi?;
        let value = match self.lo {
            Some(lo) if lo.frame_no == idx => {
                lo.value as f64 + (hi.value as f64 - lo.value as f64) * frac
            }
            _ => hi.value as f64,
        };

        let sample = Sample {
            frame_no: self.out_no,
            value: value.round() as i32,
        };
        self.out_no += 1;
        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<i32> {
        (0..len as i32).map(|i| i * 10).collect()
    }

    #[test]
    fn test_buffer_samples_are_numbered() {
        let samples: Vec<_> = from_buffer(vec![5, -5, 7]).collect();
        assert_eq!(
            samples,
            [
                Sample { frame_no: 0, value: 5 },
                Sample { frame_no: 1, value: -5 },
                Sample { frame_no: 2, value: 7 },
            ]
        );
    }

    #[test]
    fn test_resample_half_rate() {
        let out: Vec<_> = Resample::new(from_buffer(ramp(8)), 44100, 22050).collect();

        let values: Vec<_> = out.iter().map(|s| s.value).collect();
        assert_eq!(values, [0, 20, 40, 60]);

        // Frame numbering restarts at the target rate and stays monotonic.
        let frames: Vec<_> = out.iter().map(|s| s.frame_no).collect();
        assert_eq!(frames, [0, 1, 2, 3]);
    }

    #[test]
    fn test_resample_interpolates() {
        // 3:2 ratio, source positions 0.0, 1.5, 3.0, ...
        let out: Vec<_> = Resample::new(from_buffer(ramp(5)), 33075, 22050)
            .map(|s| s.value)
            .collect();
        assert_eq!(out, [0, 15, 30]);
    }
}
