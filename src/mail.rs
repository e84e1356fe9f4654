//! Mail delivery settings read from a configuration document.
//!
//! ```text
//! [settings]
//! enable = true
//!
//! [email_host]
//! host_name = smtp.example.com
//! host_port = 465
//! from = reports@example.com
//! user_name = reports
//! user_password = secret
//!
//! [mail_address]
//! receiver = ops@example.com, dev@example.com
//! cc =
//!
//! [subject]
//! subject = Nightly report #{yyyy-MM-dd}
//! ```

use serde::Serialize;
use snafu::prelude::*;

use crate::error::{Result, TypeConversionSnafu};
use crate::reader::IniReader;

const SETTINGS: &str = "settings";
const EMAIL_HOST: &str = "email_host";
const MAIL_ADDRESS: &str = "mail_address";
const SUBJECT: &str = "subject";

const DEFAULT_PORT: i32 = 25;
const DEFAULT_CHARSET: &str = "UTF-8";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub charset: String,
    pub from: String,
    /// Display name of the sender; defaults to `from`.
    pub sender: String,
    pub credentials: Option<Credentials>,
    pub receivers: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub user_name: String,
    #[serde(skip)]
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl MailSettings {
    /// Read the settings, rendering subject placeholders at `now_millis`.
    pub fn from_reader(reader: &IniReader, now_millis: i64) -> Result<Self> {
        let enabled = reader.get_boolean_or(SETTINGS, "enable", false)?;

        let host = reader.get_string(EMAIL_HOST, "host_name")?.to_owned();
        let port = reader.get_int_or(EMAIL_HOST, "host_port", DEFAULT_PORT)?;
        let port = u16::try_from(port)
            .ok()
            .filter(|&port| port != 0)
            .context(TypeConversionSnafu {
                section: EMAIL_HOST,
                key: "host_port",
                value: port.to_string(),
                target: "port number",
            })?;
        let charset = reader
            .get_string_or(EMAIL_HOST, "charset", DEFAULT_CHARSET)?
            .to_owned();
        let from = reader.get_string(EMAIL_HOST, "from")?.to_owned();
        let sender = reader.get_string_or(EMAIL_HOST, "sender", &from)?.to_owned();
        let credentials = credentials(reader)?;

        let receivers = addresses(reader.get_string_array(MAIL_ADDRESS, "receiver")?);
        let cc = addresses(reader.get_string_array_or(MAIL_ADDRESS, "cc", &[])?);
        let subject = reader.get_string_with_date(SUBJECT, SUBJECT, now_millis)?;

        tracing::debug!(
            enabled,
            host = %host,
            port,
            receivers = receivers.len(),
            cc = cc.len(),
            authenticated = credentials.is_some(),
            "Loaded mail settings"
        );

        Ok(Self {
            enabled,
            host,
            port,
            charset,
            from,
            sender,
            credentials,
            receivers,
            cc,
            subject,
        })
    }
}

/// Credentials are only used when both a user name and a password are present.
fn credentials(reader: &IniReader) -> Result<Option<Credentials>> {
    let user_name = first_of(reader, &["user_name", "authentication_name"])?;
    let password = first_of(reader, &["user_password", "auth_password"])?;

    Ok(match (user_name, password) {
        (Some(user_name), Some(password)) => Some(Credentials {
            user_name: user_name.to_owned(),
            password: password.to_owned(),
        }),
        _ => None,
    })
}

fn first_of<'a>(reader: &'a IniReader, keys: &[&str]) -> Result<Option<&'a str>> {
    for key in keys {
        let value = reader.get_string_or(EMAIL_HOST, key, "")?;
        if !value.is_empty() {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

fn addresses(items: Vec<String>) -> Vec<String> {
    items.into_iter().filter(|item| !item.is_empty()).collect()
}
