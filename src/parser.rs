use std::fmt;

use crate::error::{OrphanPropertySnafu, Result};
use crate::options::OrphanPolicy;
use crate::section::{Document, Section};

/// A line that the parser skipped instead of failing the whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    line: usize,
    kind: WarningKind,
    text: String,
}

impl ParseWarning {
    /// 1-based line number.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    #[must_use]
    pub fn kind(&self) -> WarningKind {
        self.kind
    }

    /// The offending line, trimmed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {:?}", self.line, self.kind, self.text)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Neither a section header, a property, a comment, nor blank.
    UnrecognizedLine,
    BlankSectionTitle,
    BlankKey,
    /// A property after a header with a blank title, which is dropped.
    BlankSectionProperty,
    /// A property before any section header, dropped under [`OrphanPolicy::Discard`].
    OrphanDiscarded,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UnrecognizedLine => "unrecognized line".fmt(f),
            Self::BlankSectionTitle => "section title cannot be blank".fmt(f),
            Self::BlankKey => "property key cannot be blank".fmt(f),
            Self::BlankSectionProperty => {
                "property under a blank section title was discarded".fmt(f)
            }
            Self::OrphanDiscarded => "property outside of any section was discarded".fmt(f),
        }
    }
}

/// Where the next property goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Current {
    /// No header yet.
    Start,
    /// The last header had a blank title.
    Blank,
    Section(usize),
}

/// Represents an on-going parse.
#[derive(Debug)]
pub(crate) struct Parser<'a> {
    orphans: &'a OrphanPolicy,
    sections: Vec<Section>,
    current: Current,
    warnings: Vec<ParseWarning>,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(orphans: &'a OrphanPolicy) -> Self {
        Self {
            orphans,
            sections: Vec::with_capacity(16),
            current: Current::Start,
            warnings: Vec::new(),
        }
    }
}

impl Parser<'_> {
    pub fn into_document<I>(mut self, lines: I) -> Result<Document>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for (i, line) in lines.into_iter().enumerate() {
            self.parse_line(i + 1, line.as_ref())?;
        }

        tracing::debug!(
            sections = self.sections.len(),
            warnings = self.warnings.len(),
            "Parsed configuration document"
        );

        Ok(Document::new(self.sections, self.warnings))
    }

    fn parse_line(&mut self, number: usize, line: &str) -> Result<()> {
        let line = line.trim();

        if line.is_empty() || line.starts_with([';', '#']) {
            return Ok(());
        }

        if let Some(title) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            self.start_section(number, line, title.trim());
        } else if let Some((key, value)) = line.split_once('=') {
            self.add_property(number, line, key.trim(), value.trim())?;
        } else {
            self.warn(number, WarningKind::UnrecognizedLine, line);
        }

        Ok(())
    }

    /// A redeclared section is emptied but keeps the position of its first declaration.
    fn start_section(&mut self, number: usize, line: &str, title: &str) {
        if title.is_empty() {
            self.warn(number, WarningKind::BlankSectionTitle, line);
            self.current = Current::Blank;
            return;
        }

        if let Some(i) = self.position(title) {
            tracing::debug!(
                line = number,
                section = title,
                "Section redeclared, discarding its earlier properties"
            );
            self.sections[i].clear();
            self.current = Current::Section(i);
        } else {
            self.current = Current::Section(self.push_section(title));
        }
    }

    fn add_property(&mut self, number: usize, line: &str, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            self.warn(number, WarningKind::BlankKey, line);
            return Ok(());
        }

        let orphans = self.orphans;
        let index = match (self.current, orphans) {
            (Current::Section(i), _) => i,
            (Current::Blank, _) => {
                self.warn(number, WarningKind::BlankSectionProperty, line);
                return Ok(());
            }
            (Current::Start, OrphanPolicy::Reject) => {
                return OrphanPropertySnafu { line: number, key }.fail();
            }
            (Current::Start, OrphanPolicy::Discard) => {
                self.warn(number, WarningKind::OrphanDiscarded, line);
                return Ok(());
            }
            (Current::Start, OrphanPolicy::Section(title)) => {
                let title = title.trim();
                self.position(title).unwrap_or_else(|| self.push_section(title))
            }
        };

        let section = &mut self.sections[index];
        if let Some(previous) = section.insert(key.to_owned(), value.to_owned()) {
            tracing::debug!(
                line = number,
                section = section.title(),
                key,
                previous = %previous,
                "Duplicate key overwrites its earlier value"
            );
        }

        Ok(())
    }

    fn position(&self, title: &str) -> Option<usize> {
        self.sections
            .iter()
            .position(|section| section.title() == title)
    }

    fn push_section(&mut self, title: &str) -> usize {
        self.sections.push(Section::new(title.to_owned()));
        self.sections.len() - 1
    }

    fn warn(&mut self, number: usize, kind: WarningKind, line: &str) {
        tracing::warn!(line = number, text = line, "Skipping configuration line: {kind}");
        self.warnings.push(ParseWarning {
            line: number,
            kind,
            text: line.to_owned(),
        });
    }
}
