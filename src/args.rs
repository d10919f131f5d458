//  Commands:
// - decode <input> <output>

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cassette::{self, DecodeConfig};

#[derive(Parser)]
pub struct Args {
    #[clap(subcommand)]
    pub subcommand: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Decode a cassette recording into BASIC source files.
    Decode(Decode),
}

#[derive(Parser)]
pub struct Decode {
    /// WAV file to decode, or an input device name with --input-audio.
    pub input: String,
    /// Directory the decoded .bas files are written to.
    pub output: PathBuf,

    /// Record from an audio input device instead of reading a WAV file.
    #[arg(long)]
    pub input_audio: bool,

    /// Frequency of a "1" cycle.
    #[arg(long, default_value_t = cassette::BIT_ONE_HZ)]
    pub bit_one_hz: u32,
    /// Frequency of a "0" cycle.
    #[arg(long, default_value_t = cassette::BIT_NUL_HZ)]
    pub bit_nul_hz: u32,
    /// How far a cycle may scatter around a bit frequency and still match.
    #[arg(long, default_value_t = cassette::HZ_VARIATION)]
    pub hz_variation: u32,
    /// Invert the initial polarity guess. Try this when the decode warns
    /// about missing leader bytes.
    #[arg(long)]
    pub even_odd: bool,
    /// Polarity flip window size, in samples.
    #[arg(long, default_value_t = cassette::MIN_TOGGLE_COUNT)]
    pub min_toggle_count: usize,
    /// Amplitudes this close to zero count as noise.
    #[arg(long, default_value_t = cassette::MIN_SAMPLE_VALUE)]
    pub min_sample_value: i32,
    /// Downsample the input to this rate before decoding (lossy).
    #[arg(long)]
    pub resample_rate: Option<u32>,
}

impl Decode {
    pub fn config(&self) -> DecodeConfig {
        DecodeConfig {
            bit_one_hz: self.bit_one_hz,
            bit_nul_hz: self.bit_nul_hz,
            hz_variation: self.hz_variation,
            even_odd: self.even_odd,
            min_toggle_count: self.min_toggle_count,
            min_sample_value: self.min_sample_value,
        }
    }
}
