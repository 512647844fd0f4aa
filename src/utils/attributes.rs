use crate::error::{HlsError, Result};

/// One `NAME=VALUE` pair of an attribute list, with quotes stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Attribute name
    pub name: &'a str,
    /// Value without surrounding quotes
    pub value: &'a str,
    /// Whether the value was a quoted string
    pub quoted: bool,
}

/// Splits an attribute list such as `METHOD=AES-128,URI="k.bin",IV=0x1`.
///
/// Quoted values may contain commas. Surrounding whitespace around names,
/// separators and unquoted values is ignored.
///
/// Example:
/// ```
/// use hlsio::utils::parse_attributes;
///
/// let attrs = parse_attributes(r#"TYPE=AUDIO,GROUP-ID="aac",NAME="en, main""#).unwrap();
/// assert_eq!(attrs.len(), 3);
/// assert_eq!(attrs[2].value, "en, main");
/// assert!(attrs[2].quoted);
/// ```
pub fn parse_attributes(input: &str) -> Result<Vec<Attribute<'_>>> {
    let mut attrs = Vec::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        let eq = rest
            .find('=')
            .ok_or_else(|| HlsError::malformed(input, "attribute without value"))?;
        let name = rest[..eq].trim();
        if name.is_empty() || name.contains(',') {
            return Err(HlsError::malformed(input, "attribute without value"));
        }

        let after = &rest[eq + 1..];
        let (value, quoted, remainder) = match after.strip_prefix('"') {
            Some(stripped) => {
                let end = stripped
                    .find('"')
                    .ok_or_else(|| HlsError::malformed(input, "unterminated quoted string"))?;
                (&stripped[..end], true, &stripped[end + 1..])
            }
            None => {
                let end = after.find(',').unwrap_or(after.len());
                (after[..end].trim(), false, &after[end..])
            }
        };
        attrs.push(Attribute {
            name,
            value,
            quoted,
        });

        rest = remainder.trim_start();
        if let Some(next) = rest.strip_prefix(',') {
            rest = next.trim_start();
        } else if !rest.is_empty() {
            return Err(HlsError::malformed(input, "expected ',' between attributes"));
        }
    }

    Ok(attrs)
}

/// Renders a boolean attribute as the `YES` / `NO` enumerated string.
pub fn yes_no(value: bool) -> &'static str {
    if value {
        "YES"
    } else {
        "NO"
    }
}

/// Parses a `YES` / `NO` enumerated string, ignoring case.
pub fn parse_yes_no(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("YES") {
        Some(true)
    } else if value.eq_ignore_ascii_case("NO") {
        Some(false)
    } else {
        None
    }
}
