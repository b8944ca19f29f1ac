//! Ordered text decoding for result documents.
//!
//! Runners on different machines write their JSON in different encodings.
//! Each strategy either produces text or declines; the first strategy whose
//! text also parses wins.

use std::fmt;

/// Windows-1252 code points for bytes 0x80..=0x9F. `None` marks bytes the
/// code page leaves undefined.
const WINDOWS_1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoding {
    Utf8,
    /// UTF-8 preceded by a byte order mark.
    Utf8Bom,
    /// UTF-16 little endian; requires a byte order mark.
    Utf16Le,
    /// UTF-16 big endian; requires a byte order mark.
    Utf16Be,
    Windows1252,
    Latin1,
}

impl TextDecoding {
    pub const DEFAULT_ORDER: [TextDecoding; 6] = [
        TextDecoding::Utf8,
        TextDecoding::Utf8Bom,
        TextDecoding::Utf16Le,
        TextDecoding::Utf16Be,
        TextDecoding::Windows1252,
        TextDecoding::Latin1,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf8Bom => "utf-8-sig",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Windows1252 => "windows-1252",
            Self::Latin1 => "iso-8859-1",
        }
    }

    /// Decode `bytes`, or `None` when they are not valid in this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            Self::Utf8Bom => bytes
                .strip_prefix(&[0xEF, 0xBB, 0xBF])
                .and_then(|rest| std::str::from_utf8(rest).ok())
                .map(str::to_string),
            Self::Utf16Le => bytes
                .strip_prefix(&[0xFF, 0xFE])
                .and_then(|rest| decode_utf16(rest, u16::from_le_bytes)),
            Self::Utf16Be => bytes
                .strip_prefix(&[0xFE, 0xFF])
                .and_then(|rest| decode_utf16(rest, u16::from_be_bytes)),
            Self::Windows1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => WINDOWS_1252_HIGH[usize::from(b - 0x80)],
                    _ => Some(char::from(b)),
                })
                .collect(),
            Self::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl fmt::Display for TextDecoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes.chunks_exact(2).map(|pair| to_unit([pair[0], pair[1]]));
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

/// Every strategy declined or produced text that did not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    /// Strategies whose text reached the parser.
    pub attempted: Vec<TextDecoding>,
    pub last_error: Option<String>,
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tried: Vec<&str> = self.attempted.iter().map(TextDecoding::name).collect();
        match &self.last_error {
            Some(err) => write!(f, "{} (tried {})", err, tried.join(", ")),
            None => write!(f, "no decoding produced text"),
        }
    }
}

impl std::error::Error for DecodeFailure {}

/// Run `parse` over the output of each strategy in `order`, returning the
/// first success together with the strategy that produced it.
pub fn parse_with_fallback<T, E, F>(
    bytes: &[u8],
    order: &[TextDecoding],
    mut parse: F,
) -> Result<(T, TextDecoding), DecodeFailure>
where
    E: fmt::Display,
    F: FnMut(&str) -> Result<T, E>,
{
    let mut failure = DecodeFailure {
        attempted: Vec::new(),
        last_error: None,
    };

    for decoding in order {
        let Some(text) = decoding.decode(bytes) else {
            continue;
        };
        failure.attempted.push(*decoding);
        match parse(&text) {
            Ok(value) => return Ok((value, *decoding)),
            Err(e) => failure.last_error = Some(e.to_string()),
        }
    }

    Err(failure)
}
