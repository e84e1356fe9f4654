#![warn(
    clippy::correctness,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::style,
    clippy::pedantic
)]

//! Reader for INI-style configuration files.
//!
//! A document is parsed once into ordered sections of trimmed `key = value` strings. Values are
//! only interpreted when read, through the typed accessors on [`IniReader`]. String values may
//! embed `#{pattern}` placeholders that are rendered with a timestamp at read time (see
//! [`datetime`] for the pattern syntax).
//!
//! ```
//! let reader: inireader::IniReader = "
//! [mail_address]
//! receiver = a@example.com, b@example.com
//! [settings]
//! enable = TRUE
//! retries = 3
//! "
//! .parse()?;
//!
//! assert!(reader.get_boolean("settings", "enable")?);
//! assert_eq!(reader.get_int_or("settings", "timeout", 30)?, 30);
//! assert_eq!(reader.get_string_array("mail_address", "receiver")?.len(), 2);
//! # Ok::<(), inireader::Error>(())
//! ```

pub mod datetime;
mod encoding;
mod error;
pub mod mail;
mod options;
mod parser;
mod reader;
mod section;
mod util;

pub use encoding::Encoding;
pub use error::{Error, ErrorKind, Result};
pub use options::{OrphanPolicy, ReaderOptions};
pub use parser::{ParseWarning, WarningKind};
pub use reader::IniReader;
pub use section::{Document, Property, Section};
pub use util::substitute;
