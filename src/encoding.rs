use std::borrow::Cow;
use std::fmt;

/// Text encoding of a configuration source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Sniff a byte order mark (UTF-8, UTF-16LE or UTF-16BE), falling back to UTF-8.
    #[default]
    Auto,
    /// A fixed charset such as `GBK`, `windows-1252` or `UTF-16LE`.
    Charset(&'static encoding_rs::Encoding),
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Auto => "auto".fmt(f),
            Self::Charset(charset) => charset.name().fmt(f),
        }
    }
}

impl std::str::FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        Self::for_label(s).ok_or_else(|| format!("unknown encoding: {s:?}"))
    }
}

impl From<&'static encoding_rs::Encoding> for Encoding {
    fn from(charset: &'static encoding_rs::Encoding) -> Self {
        Self::Charset(charset)
    }
}

impl Encoding {
    /// Look up a charset by any of its WHATWG labels, ignoring case: `gbk`, `gb2312`, `latin1`,
    /// `shift_jis`, `utf-16le`, ...
    #[must_use]
    pub fn for_label(label: &str) -> Option<Self> {
        encoding_rs::Encoding::for_label_no_replacement(label.trim().as_bytes()).map(Self::Charset)
    }

    #[must_use]
    pub fn utf8() -> Self {
        Self::Charset(encoding_rs::UTF_8)
    }

    /// Resolve [`Encoding::Auto`] against the leading bytes of `data`.
    #[must_use]
    pub fn detect(self, data: &[u8]) -> Self {
        Self::Charset(self.charset(data))
    }

    fn charset(self, data: &[u8]) -> &'static encoding_rs::Encoding {
        match self {
            Self::Auto => encoding_rs::Encoding::for_bom(data)
                .map_or(encoding_rs::UTF_8, |(charset, _)| charset),
            Self::Charset(charset) => charset,
        }
    }
}

/// Decode `data` into text. Returns `None` when the bytes are not valid in the chosen encoding;
/// malformed input is never replaced with `U+FFFD`.
pub(crate) fn decode_data(data: &[u8], encoding: Encoding) -> Option<String> {
    let charset = encoding.charset(data);

    // A BOM is only stripped when it names the charset being decoded.
    let data = match encoding_rs::Encoding::for_bom(data) {
        Some((bom, len)) if bom == charset => &data[len..],
        _ => data,
    };

    charset
        .decode_without_bom_handling_and_without_replacement(data)
        .map(Cow::into_owned)
}
