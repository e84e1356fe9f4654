use std::io;

use snafu::prelude::*;

use crate::datetime::DateTimeError;
use crate::encoding::Encoding;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("invalid argument `{name}`: {reason}"))]
    InvalidArgument { name: &'static str, reason: String },

    #[snafu(display("failed to read {origin}: {source}"))]
    Read { origin: String, source: io::Error },

    #[snafu(display("failed to decode {origin} as {encoding}"))]
    Decode { origin: String, encoding: Encoding },

    #[snafu(display("line {line}: property `{key}` appears before any section header"))]
    OrphanProperty { line: usize, key: String },

    #[snafu(display("no value for `{key}` in section [{section}]"))]
    MissingKey { section: String, key: String },

    #[snafu(display("[{section}] {key} = {value:?} is not a valid {target}"))]
    TypeConversion {
        section: String,
        key: String,
        value: String,
        target: &'static str,
    },

    #[snafu(display("{source}"))]
    DateTime { source: DateTimeError },
}

/// Coarse classification of an [`Error`], for callers that only care about the category of
/// failure and not the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    SourceUnavailable,
    MissingKey,
    TypeConversion,
    Parse,
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match *self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Read { .. } | Self::Decode { .. } => ErrorKind::SourceUnavailable,
            Self::MissingKey { .. } => ErrorKind::MissingKey,
            Self::TypeConversion { .. } => ErrorKind::TypeConversion,
            Self::DateTime {
                source: DateTimeError::EmptyPattern | DateTimeError::EmptyInput,
            } => ErrorKind::InvalidArgument,
            Self::OrphanProperty { .. } | Self::DateTime { .. } => ErrorKind::Parse,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reject arguments that are empty or only whitespace, returning the trimmed value otherwise.
pub(crate) fn non_blank<'a>(name: &'static str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    ensure!(
        !trimmed.is_empty(),
        InvalidArgumentSnafu {
            name,
            reason: "must not be blank",
        }
    );
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_arguments_are_rejected() {
        let err = non_blank("section", "   ").expect_err("blank input must fail");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.to_string(), "invalid argument `section`: must not be blank");
    }

    #[test]
    fn arguments_are_trimmed() {
        assert_eq!(non_blank("key", " host_name\t").ok(), Some("host_name"));
    }

    #[test]
    fn date_time_kinds() {
        let err = Error::DateTime {
            source: DateTimeError::EmptyPattern,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = Error::DateTime {
            source: DateTimeError::LengthMismatch {
                pattern: "yyyy".to_owned(),
                text: "24".to_owned(),
            },
        };
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
