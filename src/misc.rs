use std::{fmt::Write, time::Duration};

use anyhow::{Context, Result};
use bitvec::{order::Lsb0, slice::BitSlice};
use cpal::{traits::DeviceTrait, Device, Devices, InputDevices};
use num_traits::Num;

use crate::parser::bits_to_byte;

/// How many 8-bit groups of a bit dump go on one line.
const DUMP_GROUPS_PER_LINE: usize = 8;

pub fn plural(n: impl Num) -> &'static str {
    if n.is_one() {
        ""
    } else {
        "s"
    }
}

pub fn audio_dev(mut devices: InputDevices<Devices>, search: &str) -> Result<Device> {
    let mut best = devices.next().context("No audio devices")?;
    let mut best_similarity = 0.0;

    for device in devices {
        let name = device.name()?;
        let similarity = strsim::sorensen_dice(&name, search);
        if similarity > best_similarity {
            best = device;
            best_similarity = similarity;
        }
    }

    Ok(best)
}

pub fn human_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{}m {}s", duration.as_secs() / 60, duration.as_secs() % 60)
    }
}

/// Formats a bitstream as 8-bit groups with the byte value each group
/// reassembles to, for diagnosing a desynchronized or corrupt recording.
pub fn format_bits(bits: &BitSlice<u8, Lsb0>) -> String {
    let mut out = String::new();
    for (i, group) in bits.chunks(8).enumerate() {
        if i > 0 {
            out.push(if i % DUMP_GROUPS_PER_LINE == 0 { '\n' } else { ' ' });
        }

        for bit in group.iter().by_vals() {
            out.push(if bit { '1' } else { '0' });
        }
        if group.len() == 8 {
            let _ = write!(out, "={:#04x}", bits_to_byte(group));
        }
    }

    out
}
