use bitvec::{order::Lsb0, vec::BitVec, view::BitView};
use log::{debug, warn};

use crate::parser::BitParser;

/// The leader byte repeats before every block: 10101010... on tape.
pub const LEAD_IN: u8 = 0x55;
/// The sync byte marks the start of byte-aligned payload data.
pub const SYNC: u8 = 0x3C;

#[derive(Debug, Clone, Copy)]
pub struct SyncInfo {
    /// Bits of noise discarded before the leader was found.
    pub leader_pos: usize,
    /// Whole leader bytes discarded.
    pub leader_count: usize,
    /// Bits between the leader and the sync byte.
    pub sync_pos: usize,
}

fn pattern(byte: u8) -> BitVec<u8, Lsb0> {
    byte.view_bits::<Lsb0>().to_bitvec()
}

/// Establishes byte alignment for the next block: discards noise up to the
/// first leader, the run of leader bytes, and everything through the sync
/// byte. Returns `None` when no further leader occurs, which is the normal
/// end of a recording that carries no more blocks.
pub fn synchronize(parser: &mut BitParser) -> Option<SyncInfo> {
    let lead_in = pattern(LEAD_IN);
    let sync = pattern(SYNC);

    let leader_pos = match parser.find(&lead_in) {
        Some(pos) => pos,
        None => {
            if parser.len() >= 8 {
                warn!(
                    "no leader bytes in the remaining {} bits, maybe `even_odd` is wrong",
                    parser.len()
                );
            }
            return None;
        }
    };
    parser.skip(leader_pos);

    // The leader run may be cut short by signal drift, so matches are
    // counted bit-by-bit rather than assumed from the block layout.
    let leader_count = parser.count_pattern(&lead_in);
    parser.skip(leader_count * 8);

    let sync_pos = match parser.find(&sync) {
        Some(pos) => pos,
        None => {
            warn!(
                "no sync byte after the leader, {} unconsumed bits",
                parser.len()
            );
            parser.skip(parser.len());
            return None;
        }
    };
    parser.skip(sync_pos + 8);

    let info = SyncInfo {
        leader_pos,
        leader_count,
        sync_pos,
    };
    debug!(
        "synchronized: leader at bit {}, {} leader bytes, sync after {} bits",
        info.leader_pos, info.leader_count, info.sync_pos
    );
    Some(info)
}
