use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
    sync::{Arc, Barrier},
    time::Instant,
};

use anyhow::{Context, Result};
use bitvec::{order::Lsb0, vec::BitVec};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::WavSpec;
use log::warn;
use parking_lot::Mutex;

use crate::{
    args::Decode,
    cassette::Bits,
    formats::{self, tokens::DRAGON32, BlockType, Cassette},
    misc::{audio_dev, human_duration, plural},
    parser::BitParser,
    wave::{self, Sample, Spec},
};

/// Treat the capture as silent below this level.
const CAPTURE_THRESHOLD: f32 = 0.1;
/// Stop recording after this many seconds of trailing silence.
const CAPTURE_TAIL: f32 = 3.0;

pub fn decode(args: Decode) -> Result<()> {
    if args.input_audio {
        decode_audio(args)
    } else {
        decode_file(args)
    }
}

fn decode_file(args: Decode) -> Result<()> {
    println!(
        "[*] Decoding `{}` to `{}`",
        args.input,
        args.output.to_string_lossy()
    );

    let (spec, samples) = wave::open(Path::new(&args.input))?;
    println!(
        " └─ {} channel{}, {} Hz, {} bit{}, {} frames",
        spec.channels,
        plural(spec.channels),
        spec.sample_rate,
        spec.bits_per_sample,
        plural(spec.bits_per_sample),
        spec.frame_count
    );

    let cassette = decode_samples(Box::new(samples), spec, &args)?;
    write_output(&cassette, &args.output)
}

fn decode_audio(args: Decode) -> Result<()> {
    let host = cpal::default_host();
    let device = audio_dev(host.input_devices()?, &args.input)?;
    println!("[*] Using audio device `{}`", device.name()?);

    let mut config_range = device.supported_input_configs()?;
    let config = config_range
        .next()
        .context("No configs")?
        .with_max_sample_rate();
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    struct State {
        samples: Mutex<Vec<i32>>,
        barrier: Barrier,
    }

    let state = Arc::new(State {
        samples: Mutex::new(Vec::new()),
        barrier: Barrier::new(2),
    });

    let mut last_cross = None;
    let stream_state = state.clone();
    let stream = device.build_input_stream(
        &config.clone().into(),
        move |data: &[f32], info: &cpal::InputCallbackInfo| {
            let mut samples = stream_state.samples.lock();
            // Only the first channel carries the cassette signal.
            for sample in data.iter().step_by(channels) {
                samples.push((sample * i16::MAX as f32) as i32);

                if let Some(last_cross) = last_cross {
                    if info
                        .timestamp()
                        .capture
                        .duration_since(&last_cross)
                        .unwrap_or_default()
                        .as_secs_f32()
                        > CAPTURE_TAIL
                    {
                        println!("[*] Stopping capture");
                        stream_state.barrier.wait();
                        return;
                    }
                }

                if sample.abs() > CAPTURE_THRESHOLD {
                    if last_cross.is_none() {
                        println!("[*] Starting capture");
                    }

                    last_cross = Some(info.timestamp().capture);
                }

                // Keep at most one second of pre-signal silence.
                if last_cross.is_none() {
                    let len = samples.len();
                    if len > sample_rate as usize {
                        samples.drain(..len - sample_rate as usize);
                    }
                }
            }
        },
        move |err| warn!("capture error: {err}"),
        None,
    )?;

    println!("[*] Waiting for audio input on `{}`", device.name()?);
    stream.play()?;

    state.barrier.wait();
    stream.pause()?;
    drop(stream);

    let samples = std::mem::take(&mut *state.samples.lock());
    println!(
        " └─ captured {} frame{} at {} Hz",
        samples.len(),
        plural(samples.len() as u64),
        sample_rate
    );
    write_debug_wav(&samples, sample_rate)?;

    let spec = Spec {
        sample_rate,
        channels: 1,
        bits_per_sample: 16,
        frame_count: samples.len() as u64,
    };

    let cassette = decode_samples(Box::new(wave::from_buffer(samples)), spec, &args)?;
    write_output(&cassette, &args.output)
}

fn write_debug_wav(samples: &[i32], sample_rate: u32) -> Result<()> {
    let mut wav_writer = hound::WavWriter::create(
        "debug.wav",
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        },
    )?;
    for &sample in samples {
        wav_writer.write_sample(sample as i16)?;
    }
    wav_writer.finalize()?;

    Ok(())
}

fn decode_samples(
    samples: Box<dyn Iterator<Item = Sample>>,
    mut spec: Spec,
    args: &Decode,
) -> Result<Cassette> {
    let mut samples = samples;
    if let Some(rate) = args.resample_rate {
        if rate < spec.sample_rate {
            warn!(
                "downsampling {} Hz to {rate} Hz is lossy, the decode may differ from the full-rate signal",
                spec.sample_rate
            );
            samples = Box::new(wave::Resample::new(samples, spec.sample_rate, rate));
            spec.frame_count = spec.frame_count * rate as u64 / spec.sample_rate as u64;
            spec.sample_rate = rate;
        }
    }

    let start = Instant::now();
    let mut bits = Bits::new(samples, spec, args.config());
    let decoded: BitVec<u8, Lsb0> = bits.by_ref().collect();
    let stats = *bits.stats();

    println!(
        "[I] {} bit{} decoded from {} audio frames in {}",
        decoded.len(),
        plural(decoded.len() as u64),
        spec.frame_count,
        human_duration(start.elapsed())
    );
    println!(" ├─ bit 1: {}", stats.one);
    println!(" {}─ bit 0: {}", if stats.rejected > 0 { "├" } else { "└" }, stats.nul);
    if stats.rejected > 0 {
        println!(
            " └─ skipped {} cycle{} outside both bit windows",
            stats.rejected,
            plural(stats.rejected)
        );
    }

    let mut parser = BitParser::new(decoded);
    let mut cassette = Cassette::default();
    let mut eof = false;
    while let Some(block) = formats::read_block(&mut parser)? {
        if block.kind == BlockType::Eof {
            println!("[I] End-of-file block found");
            eof = true;
            break;
        }

        cassette.add_block(&block, &DRAGON32)?;
    }
    if !eof {
        warn!("no end-of-file block, the recording may be cut short");
    }

    Ok(cassette)
}

fn write_output(cassette: &Cassette, output: &Path) -> Result<()> {
    fs::create_dir_all(output)
        .with_context(|| format!("Creating output directory `{}`", output.display()))?;

    for file in &cassette.files {
        let mut name = file.name();
        if name.is_empty() {
            name = "unnamed".into();
        }

        let lines = &file.content.code_lines;
        println!(
            "[*] File `{}`: {} line{}",
            name,
            lines.len(),
            plural(lines.len() as u64)
        );
        if !file.supported() {
            println!(" └─ unsupported file kind, nothing to write");
            continue;
        }

        let path = output.join(format!("{name}.bas"));
        let out = File::create(&path).with_context(|| format!("Creating `{}`", path.display()))?;
        let mut out = BufWriter::new(out);
        for line in lines {
            writeln!(out, "{} {}", line.line_no, line.text)?;
        }

        println!(" └─ wrote `{}`", path.display());
    }

    println!("[*] Done!");
    Ok(())
}
