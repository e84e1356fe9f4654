use crate::datetime::{self, Timestamp};
use crate::error::{Error, InvalidArgumentSnafu, Result};

const OPEN: &str = "#{";
const CLOSE: char = '}';

/// Replace every `#{pattern}` placeholder in `text` with `at` formatted by that pattern.
///
/// Placeholders are found left to right, each ending at the first `}` after its `#{`; an
/// unterminated `#{` is left as is. Identical placeholders are all replaced, and formatted output
/// is never scanned again.
///
/// With `strict`, a blank or invalid pattern is an error. Otherwise the placeholder is kept
/// verbatim and the rest of the text is still processed.
pub fn substitute<T>(text: &str, at: &T, strict: bool) -> Result<String>
where
    T: Timestamp,
{
    if text.trim().is_empty() {
        return Ok(text.to_owned());
    }

    let mut result = String::with_capacity(text.len() + 16);
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        let inner = &rest[start + OPEN.len()..];
        let Some(end) = inner.find(CLOSE) else {
            break;
        };

        let pattern = &inner[..end];
        let token_len = OPEN.len() + end + CLOSE.len_utf8();
        result.push_str(&rest[..start]);

        match expand(text, pattern, at, strict)? {
            Some(formatted) => result.push_str(&formatted),
            None => result.push_str(&rest[start..start + token_len]),
        }

        rest = &rest[start + token_len..];
    }

    result.push_str(rest);
    Ok(result)
}

fn expand<T>(text: &str, pattern: &str, at: &T, strict: bool) -> Result<Option<String>>
where
    T: Timestamp,
{
    if pattern.trim().is_empty() {
        if strict {
            return InvalidArgumentSnafu {
                name: "pattern",
                reason: format!("blank date/time placeholder in {text:?}"),
            }
            .fail();
        }

        tracing::debug!(text, "Leaving blank date/time placeholder in place");
        return Ok(None);
    }

    match datetime::format(pattern, at) {
        Ok(formatted) => Ok(Some(formatted)),
        Err(source) if strict => Err(Error::DateTime { source }),
        Err(err) => {
            tracing::debug!(pattern, %err, "Leaving invalid date/time placeholder in place");
            Ok(None)
        }
    }
}
