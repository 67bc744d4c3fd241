//! Page name patterns
//!
//! A pattern is literal text with exactly one page placeholder:
//! `{page}`, `{page:d}`, `{page:Nd}` (space padded) or `{page:0Nd}` (zero
//! padded). `{{` and `}}` produce literal braces.

use crate::config::config_error;
use crate::types::*;

/// Expand `pattern` for the 1-based display number `page`.
pub fn format_page_name(pattern: &str, page: u32) -> Result<String> {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut placeholders = 0;
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => field.push(ch),
                        None => {
                            return Err(config_error(format!(
                                "output.page_basename has an unclosed placeholder: {pattern:?}"
                            )));
                        }
                    }
                }
                out.push_str(&expand_field(&field, page, pattern)?);
                placeholders += 1;
            }
            '}' => {
                return Err(config_error(format!(
                    "output.page_basename has an unmatched '}}': {pattern:?}"
                )));
            }
            _ => out.push(c),
        }
    }

    if placeholders != 1 {
        return Err(config_error(format!(
            "output.page_basename must contain exactly one {{page}} placeholder: {pattern:?}"
        )));
    }
    if out.contains(['/', '\\']) {
        return Err(config_error(format!(
            "output.page_basename must not contain path separators: {pattern:?}"
        )));
    }
    Ok(out)
}

fn expand_field(field: &str, page: u32, pattern: &str) -> Result<String> {
    let invalid = || {
        config_error(format!(
            "output.page_basename has an invalid placeholder {{{field}}}: {pattern:?}"
        ))
    };

    let spec = match field.split_once(':') {
        None if field == "page" => return Ok(page.to_string()),
        Some(("page", spec)) => spec,
        _ => return Err(invalid()),
    };
    let digits = spec.strip_suffix('d').ok_or_else(invalid)?;
    if digits.is_empty() {
        return Ok(page.to_string());
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let zero_pad = digits.starts_with('0');
    let width: usize = digits.parse().map_err(|_| invalid())?;
    Ok(if zero_pad {
        format!("{page:0width$}")
    } else {
        format!("{page:width$}")
    })
}
