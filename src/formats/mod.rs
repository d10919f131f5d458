use anyhow::{bail, ensure, Result};
use log::{debug, info, warn};

use crate::{misc::format_bits, parser::BitParser, sync};

pub mod basic;
pub mod tokens;

use basic::{get_word, FileContent};
use tokens::TokenTables;

/// How many of the following bits an unknown-block-type error dumps.
const DUMP_BITS: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Filename,
    Data,
    Eof,
}

impl BlockType {
    fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Filename),
            0x01 => Some(Self::Data),
            0xFF => Some(Self::Eof),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Block {
    pub kind: BlockType,
    pub length: u8,
    pub payload: Vec<u8>,
}

/// Reads the next block off the bitstream: resynchronize, then a type byte,
/// a length byte and `length` payload bytes.
///
/// Returns `Ok(None)` when the stream carries no further block. An
/// end-of-file block terminates after its type byte alone, so a recording
/// cut right behind that byte still decodes.
pub fn read_block(parser: &mut BitParser) -> Result<Option<Block>> {
    if sync::synchronize(parser).is_none() {
        return Ok(None);
    }

    let type_byte = match parser.read_u8() {
        Some(byte) => byte,
        None => {
            warn!("stream ended inside a block header");
            return Ok(None);
        }
    };

    if type_byte == 0xFF {
        return Ok(Some(Block {
            kind: BlockType::Eof,
            length: 0,
            payload: Vec::new(),
        }));
    }

    let kind = match BlockType::from_u8(type_byte) {
        Some(kind) => kind,
        None => {
            let len = parser.len().min(DUMP_BITS);
            bail!(
                "unknown block type {type_byte:#04x}, maybe `even_odd` is wrong. Following bits:\n{}",
                format_bits(&parser.remaining()[..len])
            );
        }
    };

    let length = match parser.read_u8() {
        Some(byte) => byte,
        None => {
            warn!("stream ended inside a block header");
            return Ok(None);
        }
    };

    let payload = parser.read_bytes(length as usize);
    if payload.len() < length as usize {
        warn!(
            "block payload cut short: {} of {length} bytes",
            payload.len()
        );
    }

    debug!("read {kind:?} block, {length} bytes");
    Ok(Some(Block {
        kind,
        length,
        payload,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Basic,
    Data,
    Binary,
}

impl FileKind {
    fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Basic),
            0x01 => Some(Self::Data),
            0xFF => Some(Self::Binary),
            _ => None,
        }
    }
}

/// One named file on the tape: a filename block and the data blocks that
/// follow it.
#[derive(Debug)]
pub struct CassetteFile {
    /// Raw 8-character space-padded name.
    pub filename: String,
    /// `None` for a kind byte outside the known set.
    pub kind: Option<FileKind>,
    pub is_tokenized: bool,
    pub gap_flag: Option<u8>,
    pub exec_addr: Option<u16>,
    pub load_addr: Option<u16>,
    pub content: FileContent,
}

impl CassetteFile {
    fn new(block: &Block) -> Result<Self> {
        ensure!(
            block.payload.len() >= 10,
            "filename block too short: {} bytes",
            block.payload.len()
        );

        let filename: String = block.payload[..8].iter().map(|&b| char::from(b)).collect();

        let kind_byte = block.payload[8];
        let kind = FileKind::from_u8(kind_byte);
        match kind {
            Some(FileKind::Basic) => {}
            Some(other) => warn!("unsupported file kind {other:?}, skipping its data blocks"),
            None => warn!("unknown file kind byte {kind_byte:#04x}, skipping its data blocks"),
        }

        let is_tokenized = match block.payload[9] {
            0x00 => true,
            0xFF => false,
            other => {
                warn!("unexpected ASCII flag {other:#04x}, assuming tokenized");
                true
            }
        };

        // Gap flag and default exec/load addresses of binary files; carried
        // along but not needed to decode BASIC.
        let mut rest = block.payload[10..].iter().copied();
        let gap_flag = rest.next();
        let exec_addr = get_word(&mut rest);
        let load_addr = get_word(&mut rest);
        debug!("gap flag {gap_flag:?}, exec address {exec_addr:?}, load address {load_addr:?}");

        Ok(Self {
            filename,
            kind,
            is_tokenized,
            gap_flag,
            exec_addr,
            load_addr,
            content: FileContent::default(),
        })
    }

    pub fn supported(&self) -> bool {
        self.kind == Some(FileKind::Basic)
    }

    pub fn name(&self) -> String {
        self.filename.chars().take_while(|&c| c != ' ').collect()
    }

    fn add_data(&mut self, block: &Block, tokens: &TokenTables) {
        if !self.supported() {
            warn!("skipping data block for unsupported file `{}`", self.name());
            return;
        }

        if self.is_tokenized {
            self.content
                .add_tokenized_block(block.length, &block.payload, tokens);
        } else {
            self.content.add_ascii_block(block.length, &block.payload);
        }
    }
}

/// Everything recovered from one recording. The last file stays "current"
/// until the next filename block or the end-of-file block closes it.
#[derive(Debug, Default)]
pub struct Cassette {
    pub files: Vec<CassetteFile>,
}

impl Cassette {
    pub fn add_block(&mut self, block: &Block, tokens: &TokenTables) -> Result<()> {
        match block.kind {
            BlockType::Eof => {}
            BlockType::Filename => {
                let file = CassetteFile::new(block)?;
                info!("found file `{}`", file.name());
                self.files.push(file);
            }
            BlockType::Data => match self.files.last_mut() {
                Some(file) => file.add_data(block, tokens),
                None => bail!("data block with no preceding filename block"),
            },
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{tokens::DRAGON32, *};
    use crate::{
        parser::byte_to_bits,
        sync::{LEAD_IN, SYNC},
    };
    use bitvec::{order::Lsb0, vec::BitVec};

    fn filename_payload(name: &[u8; 8], kind: u8, ascii: u8) -> Vec<u8> {
        let mut payload = name.to_vec();
        payload.extend([kind, ascii, 0x00, 0x3B, 0x1A, 0x9B, 0x44]);
        payload
    }

    const HELLO_LINE: [u8; 19] = [
        0x1E, 0x12, 0x00, 0x0A, 0x80, 0x20, 0x49, 0x20, 0xCB, 0x20, 0x31, 0x20, 0xBC, 0x20, 0x31,
        0x30, 0x00, 0x00, 0x00,
    ];

    /// Serializes framed blocks the way they appear on tape: a leader run
    /// and the sync byte in front of every block.
    fn tape(blocks: &[Vec<u8>]) -> BitVec<u8, Lsb0> {
        let mut bits = BitVec::new();
        for block in blocks {
            for byte in [LEAD_IN; 6].iter().chain([SYNC].iter()).chain(block) {
                bits.extend_from_bitslice(&byte_to_bits(*byte));
            }
        }
        bits
    }

    fn block_bytes(kind: u8, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![kind, payload.len() as u8];
        bytes.extend(payload);
        bytes
    }

    fn decode(bits: BitVec<u8, Lsb0>) -> Result<Cassette> {
        let mut parser = BitParser::new(bits);
        let mut cassette = Cassette::default();
        while let Some(block) = read_block(&mut parser)? {
            let eof = block.kind == BlockType::Eof;
            cassette.add_block(&block, &DRAGON32)?;
            if eof {
                break;
            }
        }
        Ok(cassette)
    }

    #[test]
    fn test_end_to_end_tokenized_file() {
        let bits = tape(&[
            block_bytes(0x00, &filename_payload(b"TEST    ", 0x00, 0x00)),
            block_bytes(0x01, &HELLO_LINE),
            vec![0xFF],
        ]);

        let cassette = decode(bits).unwrap();
        assert_eq!(cassette.files.len(), 1);

        let file = &cassette.files[0];
        assert_eq!(file.name(), "TEST");
        assert_eq!(file.kind, Some(FileKind::Basic));
        assert!(file.is_tokenized);
        assert_eq!(file.exec_addr, Some(0x3B1A));
        assert_eq!(file.load_addr, Some(0x9B44));

        let line = &file.content.code_lines[0];
        assert_eq!(line.line_no, 10);
        assert_eq!(line.text, "FOR I = 1 TO 10");
        assert_eq!(line.line_pointer, Some(0x1E12));
    }

    #[test]
    fn test_eof_block_needs_no_length_byte() {
        // The stream ends right behind the 0xFF type byte.
        let mut parser = BitParser::new(tape(&[vec![0xFF]]));

        let block = read_block(&mut parser).unwrap().unwrap();
        assert_eq!(block.kind, BlockType::Eof);
        assert_eq!(parser.len(), 0);
    }

    #[test]
    fn test_unknown_block_type_is_fatal() {
        let mut parser = BitParser::new(tape(&[vec![0x42, 0x00]]));

        let err = read_block(&mut parser).unwrap_err();
        assert!(err.to_string().contains("unknown block type 0x42"));
    }

    #[test]
    fn test_data_block_without_file_is_a_protocol_error() {
        let bits = tape(&[block_bytes(0x01, &HELLO_LINE)]);
        assert!(decode(bits).is_err());
    }

    #[test]
    fn test_unsupported_file_kind_skips_data() {
        let bits = tape(&[
            block_bytes(0x00, &filename_payload(b"MACHINE ", 0xFF, 0x00)),
            block_bytes(0x01, &HELLO_LINE),
            vec![0xFF],
        ]);

        let cassette = decode(bits).unwrap();
        let file = &cassette.files[0];
        assert_eq!(file.kind, Some(FileKind::Binary));
        assert!(!file.supported());
        assert!(file.content.code_lines.is_empty());
    }

    #[test]
    fn test_second_filename_block_opens_a_new_file() {
        let bits = tape(&[
            block_bytes(0x00, &filename_payload(b"ONE     ", 0x00, 0x00)),
            block_bytes(0x01, &HELLO_LINE),
            block_bytes(0x00, &filename_payload(b"TWO     ", 0x00, 0x00)),
            block_bytes(0x01, &HELLO_LINE),
            vec![0xFF],
        ]);

        let cassette = decode(bits).unwrap();
        assert_eq!(cassette.files.len(), 2);
        assert_eq!(cassette.files[0].name(), "ONE");
        assert_eq!(cassette.files[1].name(), "TWO");
        assert_eq!(cassette.files[1].content.code_lines.len(), 1);
    }

    #[test]
    fn test_ascii_file_end_to_end() {
        let ascii_block = [
            0x0D, 0x31, 0x30, 0x20, 0x43, 0x4C, 0x53, 0x0D, // 10 CLS
        ];
        let bits = tape(&[
            block_bytes(0x00, &filename_payload(b"ASCII   ", 0x00, 0xFF)),
            block_bytes(0x01, &ascii_block),
            vec![0xFF],
        ]);

        let cassette = decode(bits).unwrap();
        let file = &cassette.files[0];
        assert!(!file.is_tokenized);

        let line = &file.content.code_lines[0];
        assert_eq!(line.line_no, 10);
        assert_eq!(line.text, "CLS");
        assert_eq!(line.line_pointer, None);
    }
}
