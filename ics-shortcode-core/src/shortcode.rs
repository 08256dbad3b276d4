//! Shortcode parsing and expansion.
//!
//! Recognizes WordPress-style tags such as
//! `[calendar start="31.12.2014 22:00" title='Party' location=Kugl]` inside
//! free text. A doubled bracket (`[[calendar]]`) is an escaped literal.

use std::iter::Peekable;
use std::str::Chars;

use crate::options::Attributes;

/// Tag name of the calendar shortcode.
pub const CALENDAR_TAG: &str = "calendar";

/// A tag occurrence found at the start of a string.
struct TagMatch<'a> {
    /// Bytes consumed, brackets included
    len: usize,
    /// Raw attribute text between the tag name and the closing bracket
    attributes: &'a str,
    escaped: bool,
}

/// Replace every `tag` shortcode in `content` with the output of `render`.
///
/// Text outside the tag, and other shortcodes, are copied unchanged.
pub fn expand<F, E>(content: &str, tag: &str, mut render: F) -> Result<String, E>
where
    F: FnMut(&Attributes) -> Result<String, E>,
{
    let mut output = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(open) = rest.find('[') {
        output.push_str(&rest[..open]);
        let candidate = &rest[open..];

        match match_tag(candidate, tag) {
            Some(m) if m.escaped => {
                output.push_str(&candidate[1..m.len - 1]);
                rest = &candidate[m.len..];
            }
            Some(m) => {
                output.push_str(&render(&parse_attributes(m.attributes))?);
                rest = &candidate[m.len..];
            }
            None => {
                output.push('[');
                rest = &candidate[1..];
            }
        }
    }

    output.push_str(rest);
    Ok(output)
}

/// Parse shortcode attribute text into named attributes.
///
/// Supports `name="value"`, `name='value'` and `name=value`. Names are
/// lowercased. Values without a name are keyed by their position (`"0"`,
/// `"1"`, ...).
pub fn parse_attributes(text: &str) -> Attributes {
    let mut attributes = Attributes::new();
    let mut chars = text.chars().peekable();
    let mut position = 0;

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let Some(&first) = chars.peek() else {
            break;
        };

        if first == '"' || first == '\'' {
            chars.next();
            attributes.insert(position.to_string(), take_quoted(&mut chars, first));
            position += 1;
            continue;
        }

        let word = take_while(&mut chars, |c| !c.is_whitespace() && c != '=');
        if skip_to_equals(&mut chars) {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            let value = match chars.peek() {
                Some(&quote) if quote == '"' || quote == '\'' => {
                    chars.next();
                    take_quoted(&mut chars, quote)
                }
                _ => take_while(&mut chars, |c| !c.is_whitespace()),
            };
            attributes.insert(word.to_lowercase(), value);
        } else {
            attributes.insert(position.to_string(), word);
            position += 1;
        }
    }

    attributes
}

/// Consume optional whitespace and an `=`. Leaves `chars` untouched when
/// no `=` follows.
fn skip_to_equals(chars: &mut Peekable<Chars<'_>>) -> bool {
    let mut ahead = chars.clone();
    while ahead.next_if(|c| c.is_whitespace()).is_some() {}
    if ahead.next_if_eq(&'=').is_none() {
        return false;
    }
    *chars = ahead;
    true
}

fn match_tag<'a>(s: &'a str, tag: &str) -> Option<TagMatch<'a>> {
    let escaped = s.starts_with("[[");
    let name_start = if escaped { 2 } else { 1 };

    let after_name = s[name_start..].strip_prefix(tag)?;
    match after_name.chars().next() {
        Some(c) if c.is_whitespace() || c == ']' || c == '/' => {}
        _ => return None,
    }

    let attrs_start = name_start + tag.len();
    let close = attrs_start + find_closing_bracket(&s[attrs_start..])?;

    let raw = s[attrs_start..close].trim_end();
    let attributes = raw.strip_suffix('/').unwrap_or(raw);

    let mut len = close + 1;
    if escaped {
        if !s[len..].starts_with(']') {
            return None;
        }
        len += 1;
    }

    Some(TagMatch {
        len,
        attributes,
        escaped,
    })
}

/// Byte offset of the first `]` outside of quotes.
fn find_closing_bracket(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;

    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == ']' => return Some(i),
            None => {}
        }
    }

    None
}

fn take_while(chars: &mut Peekable<Chars<'_>>, pred: impl Fn(char) -> bool) -> String {
    let mut taken = String::new();
    while let Some(c) = chars.next_if(|c| pred(*c)) {
        taken.push(c);
    }
    taken
}

/// Take characters up to the closing `quote`, consuming it.
fn take_quoted(chars: &mut Peekable<Chars<'_>>, quote: char) -> String {
    let mut taken = String::new();
    for c in chars.by_ref() {
        if c == quote {
            break;
        }
        taken.push(c);
    }
    taken
}
