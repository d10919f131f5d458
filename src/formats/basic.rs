use log::warn;

use super::tokens::TokenTables;

/// One line of recovered BASIC source. `line_pointer` is the in-memory next
/// line address and only exists for tokenized saves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine {
    pub line_pointer: Option<u16>,
    pub line_no: u16,
    pub text: String,
}

/// All data blocks of one cassette file, in arrival order.
#[derive(Debug, Default)]
pub struct FileContent {
    pub code_lines: Vec<CodeLine>,
}

/// Reads a big-endian u16 off a byte stream.
pub fn get_word(bytes: &mut impl Iterator<Item = u8>) -> Option<u16> {
    let hi = bytes.next()?;
    let lo = bytes.next()?;
    Some(u16::from_be_bytes([hi, lo]))
}

/// Expands one line of tokenized bytecode into source text.
pub fn bytes_to_code_line(raw: &[u8], tokens: &TokenTables) -> String {
    let mut text = String::new();
    let mut func_token = false;
    for &byte in raw {
        if byte == 0xFF {
            // The next byte indexes the function table.
            func_token = true;
        } else if func_token {
            func_token = false;
            match tokens.function(byte) {
                Some(keyword) => text.push_str(keyword),
                None => {
                    warn!("unknown function token {byte:#04x}");
                    text.push(char::from(byte));
                }
            }
        } else if let Some(keyword) = tokens.statement(byte) {
            text.push_str(keyword);
        } else {
            text.push(char::from(byte));
        }
    }

    text
}

impl FileContent {
    /// Appends a data block of tokenized BASIC. Returns the number of
    /// payload bytes consumed.
    pub fn add_tokenized_block(
        &mut self,
        block_length: u8,
        payload: &[u8],
        tokens: &TokenTables,
    ) -> usize {
        let mut bytes = payload.iter().copied();
        let mut byte_count = 0;

        loop {
            let line_pointer = match get_word(&mut bytes) {
                Some(word) => word,
                None => {
                    warn!("block ended inside a line pointer");
                    break;
                }
            };
            byte_count += 2;
            if line_pointer == 0 {
                // [0x00, 0x00] marks the end of the block.
                break;
            }

            let line_no = match get_word(&mut bytes) {
                Some(word) => word,
                None => {
                    warn!("block ended inside a line number");
                    break;
                }
            };
            byte_count += 2;

            let code: Vec<u8> = bytes.by_ref().take_while(|&byte| byte != 0x00).collect();
            byte_count += code.len() + 1;

            self.code_lines.push(CodeLine {
                line_pointer: Some(line_pointer),
                line_no,
                text: bytes_to_code_line(&code, tokens),
            });
        }

        check_block_length(block_length, byte_count);
        byte_count
    }

    /// Appends a data block of plain ASCII BASIC: CR-separated lines, each
    /// `<number> <code>`. Returns the number of payload bytes consumed.
    pub fn add_ascii_block(&mut self, block_length: u8, payload: &[u8]) -> usize {
        let mut bytes = payload.iter().copied();
        let mut byte_count = 0;

        // The block opens with a carriage return.
        if bytes.next().is_some() {
            byte_count += 1;
        }

        loop {
            let mut saw_cr = false;
            let line: Vec<u8> = bytes
                .by_ref()
                .take_while(|&byte| {
                    saw_cr = byte == 0x0D;
                    !saw_cr
                })
                .collect();
            if line.is_empty() {
                break;
            }
            byte_count += line.len() + saw_cr as usize;

            let text: String = line.iter().map(|&byte| char::from(byte)).collect();
            let parsed = text
                .split_once(' ')
                .and_then(|(no, code)| Some((no.parse::<u16>().ok()?, code)));
            let (line_no, code) = match parsed {
                Some(parts) => parts,
                None => {
                    warn!("cannot split line number off {text:?}, dropping the rest of the block");
                    break;
                }
            };

            self.code_lines.push(CodeLine {
                line_pointer: None,
                line_no,
                text: code.to_string(),
            });
        }

        check_block_length(block_length, byte_count);
        byte_count
    }
}

fn check_block_length(block_length: u8, byte_count: usize) {
    if usize::from(block_length) != byte_count {
        warn!("block length {block_length} is not equal to {byte_count} parsed bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::tokens::DRAGON32;

    fn lines(content: &FileContent) -> Vec<String> {
        content
            .code_lines
            .iter()
            .map(|line| format!("{} {}", line.line_no, line.text))
            .collect()
    }

    #[test]
    fn test_get_word_big_endian() {
        let mut bytes = [0x1E, 0x12].into_iter();
        assert_eq!(get_word(&mut bytes), Some(0x1E12));

        for (hi, lo) in [(0x00, 0x0A), (0x03, 0xE8), (0xF9, 0xFF)] {
            let mut bytes = [hi, lo].into_iter();
            assert_eq!(get_word(&mut bytes), Some(u16::from(hi) * 256 + u16::from(lo)));
        }
        assert_eq!(get_word(&mut [0x1E].into_iter()), None);
    }

    #[test]
    fn test_single_byte_token_law() {
        for token in 0x80..=0xCD_u8 {
            let keyword = DRAGON32.statement(token).unwrap();
            assert_eq!(bytes_to_code_line(&[token], &DRAGON32), keyword);
        }
    }

    #[test]
    fn test_function_token_law() {
        for token in 0x80..=0xA1_u8 {
            let keyword = DRAGON32.function(token).unwrap();
            assert_eq!(bytes_to_code_line(&[0xFF, token], &DRAGON32), keyword);
        }
    }

    #[test]
    fn test_bytes_to_code_line() {
        let raw = [
            0x87, 0x20, 0x22, 0x48, 0x45, 0x4C, 0x4C, 0x4F, 0x20, 0x57, 0x4F, 0x52, 0x4C, 0x44,
            0x21, 0x22,
        ];
        assert_eq!(bytes_to_code_line(&raw, &DRAGON32), "PRINT \"HELLO WORLD!\"");
    }

    #[test]
    fn test_tokenized_block() {
        let block = [
            0x1E, 0x12, 0x00, 0x0A, 0x80, 0x20, 0x49, 0x20, 0xCB, 0x20, 0x31, 0x20, 0xBC, 0x20,
            0x31, 0x30, 0x00, 0x00, 0x00,
        ];

        let mut content = FileContent::default();
        let parsed = content.add_tokenized_block(19, &block, &DRAGON32);

        assert_eq!(parsed, 19);
        assert_eq!(lines(&content), ["10 FOR I = 1 TO 10"]);
        assert_eq!(content.code_lines[0].line_pointer, Some(0x1E12));
    }

    #[test]
    fn test_tokenized_block_with_function_tokens() {
        let block = [
            0x1E, 0x4A, 0x00, 0x1E, 0x58, 0xCB, 0x58, 0xC3, 0x4C, 0xC5, 0xFF, 0x88, 0x28, 0x52,
            0x29, 0x3A, 0x59, 0xCB, 0x59, 0xC3, 0x4C, 0xC5, 0xFF, 0x89, 0x28, 0x52, 0x29, 0x00,
            0x00, 0x00,
        ];

        let mut content = FileContent::default();
        let parsed = content.add_tokenized_block(30, &block, &DRAGON32);

        assert_eq!(parsed, 30);
        assert_eq!(lines(&content), ["30 X=X+L*SIN(R):Y=Y+L*COS(R)"]);
    }

    #[test]
    fn test_tokenized_block_with_high_line_numbers() {
        let block = [
            0x1E, 0x1A, 0x00, 0x01, 0x87, 0x20, 0x22, 0x4C, 0x49, 0x4E, 0x45, 0x20, 0x4E, 0x55,
            0x4D, 0x42, 0x45, 0x52, 0x20, 0x54, 0x45, 0x53, 0x54, 0x22, 0x00, //
            0x1E, 0x23, 0x00, 0x0A, 0x87, 0x20, 0x31, 0x30, 0x00, //
            0x1E, 0x2D, 0x00, 0x64, 0x87, 0x20, 0x31, 0x30, 0x30, 0x00, //
            0x1E, 0x38, 0x03, 0xE8, 0x87, 0x20, 0x31, 0x30, 0x30, 0x30, 0x00, //
            0x1E, 0x44, 0x27, 0x10, 0x87, 0x20, 0x31, 0x30, 0x30, 0x30, 0x30, 0x00, //
            0x1E, 0x50, 0x80, 0x00, 0x87, 0x20, 0x33, 0x32, 0x37, 0x36, 0x38, 0x00, //
            0x1E, 0x62, 0xF9, 0xFF, 0x87, 0x20, 0x22, 0x45, 0x4E, 0x44, 0x22, 0x3B, 0x36, 0x33,
            0x39, 0x39, 0x39, 0x00, 0x00, 0x00,
        ];
        assert_eq!(block.len(), 99);

        let mut content = FileContent::default();
        let parsed = content.add_tokenized_block(99, &block, &DRAGON32);

        assert_eq!(parsed, 99);
        assert_eq!(
            lines(&content),
            [
                "1 PRINT \"LINE NUMBER TEST\"",
                "10 PRINT 10",
                "100 PRINT 100",
                "1000 PRINT 1000",
                "10000 PRINT 10000",
                "32768 PRINT 32768",
                "63999 PRINT \"END\";63999",
            ]
        );
    }

    #[test]
    fn test_tokenized_block_length_mismatch_still_decodes() {
        let block = [
            0x1E, 0x29, 0x00, 0x14, 0x87, 0x20, 0x49, 0x3B, 0x22, 0x48, 0x45, 0x4C, 0x4C, 0x4F,
            0x20, 0x57, 0x4F, 0x52, 0x4C, 0x44, 0x21, 0x22, 0x00, 0x00, 0x00,
        ];

        let mut content = FileContent::default();
        let parsed = content.add_tokenized_block(0xFF, &block, &DRAGON32);

        assert_eq!(parsed, 25);
        assert_eq!(lines(&content), ["20 PRINT I;\"HELLO WORLD!\""]);
    }

    #[test]
    fn test_ascii_block() {
        let block = [
            0x0D, //
            0x31, 0x30, 0x20, 0x50, 0x52, 0x49, 0x4E, 0x54, 0x20, 0x22, 0x54, 0x45, 0x53, 0x54,
            0x22, 0x0D, //
            0x32, 0x30, 0x20, 0x50, 0x52, 0x49, 0x4E, 0x54, 0x20, 0x22, 0x48, 0x45, 0x4C, 0x4C,
            0x4F, 0x20, 0x57, 0x4F, 0x52, 0x4C, 0x44, 0x21, 0x22, 0x0D,
        ];
        assert_eq!(block.len(), 41);

        let mut content = FileContent::default();
        let parsed = content.add_ascii_block(41, &block);

        assert_eq!(parsed, 41);
        assert_eq!(
            lines(&content),
            ["10 PRINT \"TEST\"", "20 PRINT \"HELLO WORLD!\""]
        );
        assert!(content.code_lines.iter().all(|l| l.line_pointer.is_none()));
    }

    #[test]
    fn test_ascii_block_split_failure_stops_the_block() {
        // Second line has no line number, third would be fine.
        let block = [
            0x0D, //
            0x31, 0x30, 0x20, 0x41, 0x0D, //
            0x4E, 0x4F, 0x4E, 0x55, 0x4D, 0x42, 0x45, 0x52, 0x0D, //
            0x32, 0x30, 0x20, 0x42, 0x0D,
        ];

        let mut content = FileContent::default();
        content.add_ascii_block(block.len() as u8, &block);

        assert_eq!(lines(&content), ["10 A"]);
    }
}
