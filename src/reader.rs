use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Local};
use snafu::prelude::*;

use crate::datetime;
use crate::error::{
    Error, InvalidArgumentSnafu, MissingKeySnafu, Result, TypeConversionSnafu, non_blank,
};
use crate::options::ReaderOptions;
use crate::section::{Document, Section};
use crate::util::substitute;

/// Typed, read-only access to a parsed configuration document.
///
/// ```text
/// ; This line is comment
/// # This line is comment too.
/// [section1]
/// key1 = value1
/// key2 = true
/// key3 = 12
///
/// [section2]
/// key1 =
/// key2 = abc,def,ghi
/// ```
///
/// Every accessor trims `section` and `key` and fails with an invalid-argument error when either
/// is blank. Required accessors fail with [`Error::MissingKey`] when the section or key is
/// absent; the `_or` variants return the default instead, but never hide a conversion error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniReader {
    document: Document,
}

impl IniReader {
    #[must_use]
    pub(crate) fn new(document: Document) -> Self {
        Self { document }
    }

    /// Open a file with the default [`ReaderOptions`].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        ReaderOptions::new().open(path)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        ReaderOptions::new().read(reader, "reader")
    }

    pub fn from_lines<I>(lines: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        ReaderOptions::new().parse_lines(lines)
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Section titles in the order they first appear.
    #[must_use]
    pub fn section_titles(&self) -> Vec<&str> {
        self.document.titles().collect()
    }

    pub fn section(&self, section: &str) -> Result<Option<&Section>> {
        let section = non_blank("section", section)?;
        Ok(self.document.section(section))
    }

    pub fn contains_section(&self, section: &str) -> Result<bool> {
        Ok(self.section(section)?.is_some())
    }

    pub fn contains_key(&self, section: &str, key: &str) -> Result<bool> {
        Ok(self.lookup(section, key)?.is_some())
    }

    pub fn get_string(&self, section: &str, key: &str) -> Result<&str> {
        self.require(section, key)
    }

    pub fn get_string_or<'a>(&'a self, section: &str, key: &str, default: &'a str) -> Result<&'a str> {
        Ok(self.lookup(section, key)?.unwrap_or(default))
    }

    pub fn get_int(&self, section: &str, key: &str) -> Result<i32> {
        let value = self.require(section, key)?;
        convert(section, key, value, "integer")
    }

    pub fn get_int_or(&self, section: &str, key: &str, default: i32) -> Result<i32> {
        match self.lookup(section, key)? {
            Some(value) => convert(section, key, value, "integer"),
            None => Ok(default),
        }
    }

    /// Accepts `true` or `false` in any letter case; anything else, including an empty value,
    /// is a conversion error.
    pub fn get_boolean(&self, section: &str, key: &str) -> Result<bool> {
        let value = self.require(section, key)?;
        to_boolean(section, key, value)
    }

    pub fn get_boolean_or(&self, section: &str, key: &str, default: bool) -> Result<bool> {
        match self.lookup(section, key)? {
            Some(value) => to_boolean(section, key, value),
            None => Ok(default),
        }
    }

    /// Split the value on every `,` and trim each element. `"a,b,"` yields `["a", "b", ""]`.
    pub fn get_string_array(&self, section: &str, key: &str) -> Result<Vec<String>> {
        self.require(section, key).map(split_array)
    }

    pub fn get_string_array_or(
        &self,
        section: &str,
        key: &str,
        default: &[&str],
    ) -> Result<Vec<String>> {
        Ok(match self.lookup(section, key)? {
            Some(value) => split_array(value),
            None => default.iter().map(|&s| s.to_owned()).collect(),
        })
    }

    /// Read a string and replace its `#{pattern}` placeholders with `millis` (milliseconds since
    /// the Unix epoch) rendered in local time. Any malformed placeholder is an error.
    pub fn get_string_with_date(&self, section: &str, key: &str, millis: i64) -> Result<String> {
        let at = local_time(millis)?;
        let value = self.require(section, key)?;
        substitute(value, &at, true)
    }

    /// Like [`IniReader::get_string_with_date`], but returns `default` unchanged when the key is
    /// absent. Placeholder errors in a present value still fail.
    pub fn get_string_with_date_or(
        &self,
        section: &str,
        key: &str,
        millis: i64,
        default: &str,
    ) -> Result<String> {
        let at = local_time(millis)?;
        match self.lookup(section, key)? {
            Some(value) => substitute(value, &at, true),
            None => Ok(default.to_owned()),
        }
    }

    fn lookup(&self, section: &str, key: &str) -> Result<Option<&str>> {
        let section = non_blank("section", section)?;
        let key = non_blank("key", key)?;
        Ok(self.document.get(section, key))
    }

    fn require(&self, section: &str, key: &str) -> Result<&str> {
        self.lookup(section, key)?.context(MissingKeySnafu {
            section: section.trim(),
            key: key.trim(),
        })
    }
}

impl FromStr for IniReader {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ReaderOptions::new().parse_str(s)
    }
}

fn local_time(millis: i64) -> Result<DateTime<Local>> {
    ensure!(
        millis >= 0,
        InvalidArgumentSnafu {
            name: "millis",
            reason: format!("timestamp cannot be negative: {millis}"),
        }
    );

    datetime::local_from_millis(millis).context(InvalidArgumentSnafu {
        name: "millis",
        reason: format!("timestamp is out of range: {millis}"),
    })
}

fn convert<T: FromStr>(section: &str, key: &str, value: &str, target: &'static str) -> Result<T> {
    value.parse::<T>().ok().context(TypeConversionSnafu {
        section: section.trim(),
        key: key.trim(),
        value,
        target,
    })
}

fn to_boolean(section: &str, key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => TypeConversionSnafu {
            section: section.trim(),
            key: key.trim(),
            value,
            target: "boolean",
        }
        .fail(),
    }
}

fn split_array(value: &str) -> Vec<String> {
    value.split(',').map(|item| item.trim().to_owned()).collect()
}
