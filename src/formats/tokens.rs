/// The Dragon 32 BASIC token tables. Keywords are stored on tape as single
/// bytes from `0x80` up; a `0xFF` escape selects the function table for the
/// byte that follows.
#[derive(Debug, Clone, Copy)]
pub struct TokenTables {
    statements: &'static [(u8, &'static str)],
    functions: &'static [(u8, &'static str)],
}

impl TokenTables {
    pub fn statement(&self, byte: u8) -> Option<&'static str> {
        lookup(self.statements, byte)
    }

    pub fn function(&self, byte: u8) -> Option<&'static str> {
        lookup(self.functions, byte)
    }
}

fn lookup<'a>(table: &[(u8, &'a str)], byte: u8) -> Option<&'a str> {
    table
        .binary_search_by_key(&byte, |&(key, _)| key)
        .ok()
        .map(|i| table[i].1)
}

pub const DRAGON32: TokenTables = TokenTables {
    statements: STATEMENTS,
    functions: FUNCTIONS,
};

// Sorted by token byte.
const STATEMENTS: &[(u8, &str)] = &[
    (0x80, "FOR"),
    (0x81, "GO"),
    (0x82, "REM"),
    (0x83, "'"),
    (0x84, "ELSE"),
    (0x85, "IF"),
    (0x86, "DATA"),
    (0x87, "PRINT"),
    (0x88, "ON"),
    (0x89, "INPUT"),
    (0x8A, "END"),
    (0x8B, "NEXT"),
    (0x8C, "DIM"),
    (0x8D, "READ"),
    (0x8E, "LET"),
    (0x8F, "RUN"),
    (0x90, "RESTORE"),
    (0x91, "RETURN"),
    (0x92, "STOP"),
    (0x93, "POKE"),
    (0x94, "CONT"),
    (0x95, "LIST"),
    (0x96, "CLEAR"),
    (0x97, "NEW"),
    (0x98, "DEF"),
    (0x99, "CLOAD"),
    (0x9A, "CSAVE"),
    (0x9B, "OPEN"),
    (0x9C, "CLOSE"),
    (0x9D, "LLIST"),
    (0x9E, "SET"),
    (0x9F, "RESET"),
    (0xA0, "CLS"),
    (0xA1, "MOTOR"),
    (0xA2, "SOUND"),
    (0xA3, "AUDIO"),
    (0xA4, "EXEC"),
    (0xA5, "SKIPF"),
    (0xA6, "DEL"),
    (0xA7, "EDIT"),
    (0xA8, "TRON"),
    (0xA9, "TROFF"),
    (0xAA, "LINE"),
    (0xAB, "PCLS"),
    (0xAC, "PSET"),
    (0xAD, "PRESET"),
    (0xAE, "SCREEN"),
    (0xAF, "PCLEAR"),
    (0xB0, "COLOR"),
    (0xB1, "CIRCLE"),
    (0xB2, "PAINT"),
    (0xB3, "GET"),
    (0xB4, "PUT"),
    (0xB5, "DRAW"),
    (0xB6, "PCOPY"),
    (0xB7, "PMODE"),
    (0xB8, "PLAY"),
    (0xB9, "DLOAD"),
    (0xBA, "RENUM"),
    (0xBB, "TAB("),
    (0xBC, "TO"),
    (0xBD, "SUB"),
    (0xBE, "FN"),
    (0xBF, "THEN"),
    (0xC0, "NOT"),
    (0xC1, "STEP"),
    (0xC2, "OFF"),
    (0xC3, "+"),
    (0xC4, "-"),
    (0xC5, "*"),
    (0xC6, "/"),
    (0xC7, "^"),
    (0xC8, "AND"),
    (0xC9, "OR"),
    (0xCA, ">"),
    (0xCB, "="),
    (0xCC, "<"),
    (0xCD, "USING"),
];

// Sorted by token byte; selected by the 0xFF escape.
const FUNCTIONS: &[(u8, &str)] = &[
    (0x80, "SGN"),
    (0x81, "INT"),
    (0x82, "ABS"),
    (0x83, "POS"),
    (0x84, "RND"),
    (0x85, "SQR"),
    (0x86, "LOG"),
    (0x87, "EXP"),
    (0x88, "SIN"),
    (0x89, "COS"),
    (0x8A, "TAN"),
    (0x8B, "ATN"),
    (0x8C, "PEEK"),
    (0x8D, "LEN"),
    (0x8E, "STR$"),
    (0x8F, "VAL"),
    (0x90, "ASC"),
    (0x91, "CHR$"),
    (0x92, "EOF"),
    (0x93, "JOYSTK"),
    (0x94, "FIX"),
    (0x95, "HEX$"),
    (0x96, "LEFT$"),
    (0x97, "RIGHT$"),
    (0x98, "MID$"),
    (0x99, "POINT"),
    (0x9A, "INKEY$"),
    (0x9B, "MEM"),
    (0x9C, "VARPTR"),
    (0x9D, "INSTR"),
    (0x9E, "TIMER"),
    (0x9F, "PPOINT"),
    (0xA0, "STRING$"),
    (0xA1, "USR"),
];
