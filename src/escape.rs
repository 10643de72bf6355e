//! Xml character-reference resolution.
//!
//! The [`Reader`] expands references *in place* inside its buffer, so the
//! helpers here only resolve a reference to its replacement; the buffer
//! surgery lives in the reader. A reference that does not resolve is left
//! verbatim in the output, which is why these return `Option` rather than
//! an error.
//!
//! [`Reader`]: crate::reader::Reader

/// Resolves one of the five predefined XML entities to its replacement
/// byte. Anything else, including the empty name, returns `None`.
///
/// ```
/// # use xopp_parser::escape::resolve_predefined_entity;
/// assert_eq!(resolve_predefined_entity(b"lt"), Some(b'<'));
/// assert_eq!(resolve_predefined_entity(b"gt"), Some(b'>'));
/// assert_eq!(resolve_predefined_entity(b"amp"), Some(b'&'));
/// assert_eq!(resolve_predefined_entity(b"apos"), Some(b'\''));
/// assert_eq!(resolve_predefined_entity(b"quot"), Some(b'"'));
///
/// assert_eq!(resolve_predefined_entity(b"foo"), None);
/// ```
pub const fn resolve_predefined_entity(entity: &[u8]) -> Option<u8> {
    // match over strings is not allowed in const functions
    let b = match entity {
        b"lt" => b'<',
        b"gt" => b'>',
        b"amp" => b'&',
        b"apos" => b'\'',
        b"quot" => b'"',
        _ => return None,
    };
    Some(b)
}

/// Parses the payload of a character reference, i.e. the bytes between
/// `&#` and `;`. A leading `x` selects hexadecimal, otherwise the payload
/// is decimal. `U+0000`, surrogates, out-of-range codepoints and values
/// that do not even fit a `u32` all resolve to `None`.
pub fn parse_character_reference(payload: &[u8]) -> Option<char> {
    let code = match payload.strip_prefix(b"x") {
        Some(hex_digits) => fold_digits(hex_digits, 16),
        None => fold_digits(payload, 10),
    }?;
    if code == 0 {
        return None;
    }
    char::from_u32(code)
}

fn fold_digits(digits: &[u8], radix: u32) -> Option<u32> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u32, |code, &b| {
        code.checked_mul(radix)?
            .checked_add((b as char).to_digit(radix)?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn predefined() {
        assert_eq!(resolve_predefined_entity(b"amp"), Some(b'&'));
        assert_eq!(resolve_predefined_entity(b"quot"), Some(b'"'));
        assert_eq!(resolve_predefined_entity(b""), None);
        assert_eq!(resolve_predefined_entity(b"AMP"), None);
        assert_eq!(resolve_predefined_entity(b"ampere"), None);
    }

    #[test]
    fn decimal_reference() {
        assert_eq!(parse_character_reference(b"65"), Some('A'));
        assert_eq!(parse_character_reference(b"48"), Some('0'));
        assert_eq!(parse_character_reference(b"1114111"), Some('\u{10FFFF}'));
    }

    #[test]
    fn hexadecimal_reference() {
        assert_eq!(parse_character_reference(b"x30"), Some('0'));
        assert_eq!(parse_character_reference(b"x4E2D"), Some('中'));
        assert_eq!(parse_character_reference(b"x10FFFF"), Some('\u{10FFFF}'));
    }

    #[test]
    fn invalid_references() {
        // null, surrogates and beyond-Unicode are rejected
        assert_eq!(parse_character_reference(b"0"), None);
        assert_eq!(parse_character_reference(b"x0"), None);
        assert_eq!(parse_character_reference(b"xD800"), None);
        assert_eq!(parse_character_reference(b"1114112"), None);
        // garbage digits and empty payloads
        assert_eq!(parse_character_reference(b""), None);
        assert_eq!(parse_character_reference(b"x"), None);
        assert_eq!(parse_character_reference(b"12a"), None);
        assert_eq!(parse_character_reference(b"xZZ"), None);
        // far beyond any codepoint, with and without u32 overflow
        assert_eq!(parse_character_reference(b"99999999"), None);
        assert_eq!(parse_character_reference(b"x1234567"), None);
        assert_eq!(parse_character_reference(b"4294967296"), None);
        assert_eq!(parse_character_reference(b"xFFFFFFFFF"), None);
    }
}
