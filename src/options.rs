use std::fs;
use std::io::Read;
use std::path::Path;

use snafu::prelude::*;

use crate::encoding::{Encoding, decode_data};
use crate::error::{DecodeSnafu, ReadSnafu, Result, non_blank};
use crate::parser::Parser;
use crate::reader::IniReader;

/// What to do with a `key = value` line that appears before any section header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OrphanPolicy {
    /// Fail the whole parse.
    #[default]
    Reject,
    /// Drop the property and record a warning.
    Discard,
    /// Collect such properties into a section with this title. The title is trimmed and must not
    /// be blank.
    Section(String),
}

/// Options for building an [`IniReader`].
///
/// ```
/// use inireader::{Encoding, OrphanPolicy, ReaderOptions};
///
/// let reader = ReaderOptions::new()
///     .encoding(Encoding::utf8())
///     .orphans(OrphanPolicy::Section("general".to_owned()))
///     .parse_str("name = demo\n[mail]\nenable = true\n")?;
///
/// assert_eq!(reader.get_string("general", "name")?, "demo");
/// # Ok::<(), inireader::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    encoding: Encoding,
    orphans: OrphanPolicy,
}

impl ReaderOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub fn orphans(mut self, orphans: OrphanPolicy) -> Self {
        self.orphans = orphans;
        self
    }

    /// Read and parse the file at `path`.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<IniReader> {
        let path = path.as_ref();
        non_blank("path", &path.to_string_lossy())?;

        let origin = path.display().to_string();
        let data = fs::read(path).context(ReadSnafu { origin: &origin })?;
        tracing::debug!(path = %origin, bytes = data.len(), "Read configuration file");

        self.parse_bytes(&data, &origin)
    }

    /// Read `reader` to the end and parse it. `origin` names the source in error messages.
    pub fn read<R: Read>(&self, mut reader: R, origin: &str) -> Result<IniReader> {
        let mut data = Vec::with_capacity(4096);
        reader
            .read_to_end(&mut data)
            .context(ReadSnafu { origin })?;

        self.parse_bytes(&data, origin)
    }

    /// Parse already-decoded text.
    pub fn parse_str(&self, text: &str) -> Result<IniReader> {
        self.parse_lines(text.lines())
    }

    /// Parse a sequence of lines. Line terminators must already be stripped.
    pub fn parse_lines<I>(&self, lines: I) -> Result<IniReader>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        if let OrphanPolicy::Section(title) = &self.orphans {
            non_blank("orphan section title", title)?;
        }

        let document = Parser::new(&self.orphans).into_document(lines)?;
        Ok(IniReader::new(document))
    }

    fn parse_bytes(&self, data: &[u8], origin: &str) -> Result<IniReader> {
        let text = decode_data(data, self.encoding).context(DecodeSnafu {
            origin,
            encoding: self.encoding.detect(data),
        })?;

        self.parse_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::error::{Error, ErrorKind};

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device unplugged"))
        }
    }

    fn temp_file(name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("inireader-{}-{name}", std::process::id()));
        fs::write(&path, contents).expect("failed to write temporary file");
        path
    }

    #[test]
    fn open_reads_file() {
        let path = temp_file("open.ini", b"[mail]\nhost = smtp.example.com\n");
        let reader = ReaderOptions::new().open(&path).expect("failed to open file");
        _ = fs::remove_file(&path);

        assert_eq!(reader.get_string("mail", "host").ok(), Some("smtp.example.com"));
    }

    #[test]
    fn open_utf16_file() {
        let mut data = vec![0xFF, 0xFE];
        data.extend("[s]\nk = \u{4f60}\u{597d}\n".encode_utf16().flat_map(u16::to_le_bytes));
        let path = temp_file("utf16.ini", &data);
        let reader = ReaderOptions::new().open(&path).expect("failed to open file");
        _ = fs::remove_file(&path);

        assert_eq!(reader.get_string("s", "k").ok(), Some("\u{4f60}\u{597d}"));
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let path = std::env::temp_dir().join("inireader-does-not-exist.ini");
        let err = ReaderOptions::new()
            .open(&path)
            .expect_err("missing file must fail");

        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn blank_path_is_invalid() {
        let err = ReaderOptions::new().open("  ").expect_err("blank path must fail");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn read_failure_propagates() {
        let err = ReaderOptions::new()
            .read(FailingReader, "stdin")
            .expect_err("failing reader must fail");

        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
        assert_eq!(err.to_string(), "failed to read stdin: device unplugged");
    }

    #[test]
    fn undecodable_input_fails() {
        let err = ReaderOptions::new()
            .encoding(Encoding::utf8())
            .read(&b"[a]\nk = \xFF\n"[..], "buffer")
            .expect_err("invalid UTF-8 must fail");

        assert!(matches!(
            err,
            Error::Decode { encoding, .. } if encoding == Encoding::utf8()
        ));
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }

    #[test]
    fn read_with_legacy_charset() {
        let (bytes, _, _) = encoding_rs::GBK.encode("[mail]\nsubject = \u{65e5}\u{62a5}\n");
        let encoding = Encoding::for_label("GBK").expect("GBK should be a known label");

        let reader = ReaderOptions::new()
            .encoding(encoding)
            .read(&bytes[..], "buffer")
            .expect("GBK input should decode");
        assert_eq!(reader.get_string("mail", "subject").ok(), Some("\u{65e5}\u{62a5}"));

        let err = ReaderOptions::new()
            .read(&bytes[..], "buffer")
            .expect_err("GBK input is not UTF-8");
        assert_eq!(err.to_string(), "failed to decode buffer as UTF-8");
    }

    #[test]
    fn orphan_policy_is_applied() {
        let text = "k = v\n[a]\n";

        assert!(ReaderOptions::new().parse_str(text).is_err());

        let reader = ReaderOptions::new()
            .orphans(OrphanPolicy::Discard)
            .parse_str(text)
            .expect("discarding orphans should succeed");
        assert_eq!(reader.section_titles(), ["a"]);
        assert_eq!(reader.document().warnings().len(), 1);
    }

    #[test]
    fn orphan_section_title_must_not_be_blank() {
        let err = ReaderOptions::new()
            .orphans(OrphanPolicy::Section("  ".to_owned()))
            .parse_str("k = v\n")
            .expect_err("blank orphan section title must fail");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let reader = ReaderOptions::new()
            .orphans(OrphanPolicy::Section(" general ".to_owned()))
            .parse_str("k = v\n")
            .expect("padded title should be trimmed");
        assert_eq!(reader.get_string("general", "k").ok(), Some("v"));
    }
}
