//! Single-byte text encodings used by simple fonts.

/// The characters assigned by `WinAnsiEncoding` to the codes `0x80..=0x9F`, the only block
/// where it departs from ISO Latin-1.
const WIN_ANSI_HIGH_BLOCK: [Option<char>; 32] = [
    Some('€'),
    None,
    Some('‚'),
    Some('ƒ'),
    Some('„'),
    Some('…'),
    Some('†'),
    Some('‡'),
    Some('ˆ'),
    Some('‰'),
    Some('Š'),
    Some('‹'),
    Some('Œ'),
    None,
    Some('Ž'),
    None,
    None,
    Some('‘'),
    Some('’'),
    Some('“'),
    Some('”'),
    Some('•'),
    Some('–'),
    Some('—'),
    Some('˜'),
    Some('™'),
    Some('š'),
    Some('›'),
    Some('œ'),
    None,
    Some('ž'),
    Some('Ÿ'),
];

/// Decode a single `WinAnsiEncoding` code.
pub(crate) fn win_ansi_to_char(code: u8) -> Option<char> {
    match code {
        0x20..=0x7E => Some(code as char),
        0x80..=0x9F => WIN_ANSI_HIGH_BLOCK[(code - 0x80) as usize],
        // Non-breaking space and soft hyphen render as their plain counterparts
        0xA0 => Some(' '),
        0xAD => Some('-'),
        0xA1..=0xFF => Some(code as char),
        _ => None,
    }
}

/// Encode a character into `WinAnsiEncoding`, if the encoding covers it.
pub(crate) fn char_to_win_ansi(character: char) -> Option<u8> {
    match character as u32 {
        code @ 0x20..=0x7E => Some(code as u8),
        code @ 0xA0..=0xFF => Some(code as u8),
        _ => WIN_ANSI_HIGH_BLOCK
            .iter()
            .position(|candidate| *candidate == Some(character))
            .map(|index| 0x80 + index as u8),
    }
}

/// Encode a whole string into `WinAnsiEncoding`, returning the characters that could not be encoded on failure.
pub(crate) fn encode_win_ansi(text: &str) -> Result<Vec<u8>, Vec<char>> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut unencodable = Vec::new();
    for character in text.chars() {
        match char_to_win_ansi(character) {
            Some(code) => bytes.push(code),
            None => unencodable.push(character),
        }
    }
    if unencodable.is_empty() {
        Ok(bytes)
    } else {
        Err(unencodable)
    }
}

/// Glyph names whose character cannot be derived from the name itself.
const NAMED_GLYPHS: &[(&str, char)] = &[
    ("space", ' '),
    ("exclam", '!'),
    ("quotedbl", '"'),
    ("numbersign", '#'),
    ("dollar", '$'),
    ("percent", '%'),
    ("ampersand", '&'),
    ("quotesingle", '\''),
    ("quoteright", '’'),
    ("quoteleft", '‘'),
    ("parenleft", '('),
    ("parenright", ')'),
    ("asterisk", '*'),
    ("plus", '+'),
    ("comma", ','),
    ("hyphen", '-'),
    ("minus", '−'),
    ("period", '.'),
    ("slash", '/'),
    ("zero", '0'),
    ("one", '1'),
    ("two", '2'),
    ("three", '3'),
    ("four", '4'),
    ("five", '5'),
    ("six", '6'),
    ("seven", '7'),
    ("eight", '8'),
    ("nine", '9'),
    ("colon", ':'),
    ("semicolon", ';'),
    ("less", '<'),
    ("equal", '='),
    ("greater", '>'),
    ("question", '?'),
    ("at", '@'),
    ("bracketleft", '['),
    ("backslash", '\\'),
    ("bracketright", ']'),
    ("asciicircum", '^'),
    ("underscore", '_'),
    ("grave", '`'),
    ("braceleft", '{'),
    ("bar", '|'),
    ("braceright", '}'),
    ("asciitilde", '~'),
    ("bullet", '•'),
    ("endash", '–'),
    ("emdash", '—'),
    ("ellipsis", '…'),
    ("quotedblleft", '“'),
    ("quotedblright", '”'),
    ("Euro", '€'),
    ("fi", 'ﬁ'),
    ("fl", 'ﬂ'),
    ("germandbls", 'ß'),
    ("ae", 'æ'),
    ("AE", 'Æ'),
    ("oe", 'œ'),
    ("OE", 'Œ'),
    ("oslash", 'ø'),
    ("Oslash", 'Ø'),
    ("ccedilla", 'ç'),
    ("Ccedilla", 'Ç'),
    ("degree", '°'),
    ("copyright", '©'),
    ("registered", '®'),
    ("trademark", '™'),
    ("section", '§'),
    ("paragraph", '¶'),
    ("nbspace", ' '),
];

/// Accent suffixes of Adobe glyph names, combined with a base letter (`eacute` is `e` + acute).
const ACCENT_SUFFIXES: &[(&str, char)] = &[
    ("acute", '\u{301}'),
    ("grave", '\u{300}'),
    ("circumflex", '\u{302}'),
    ("tilde", '\u{303}'),
    ("dieresis", '\u{308}'),
    ("ring", '\u{30A}'),
    ("caron", '\u{30C}'),
    ("cedilla", '\u{327}'),
];

/// Map an Adobe glyph name (as found in a `Differences` array) to its character.
pub(crate) fn glyph_name_to_char(name: &[u8]) -> Option<char> {
    use unicode_normalization::UnicodeNormalization as _;

    let name = std::str::from_utf8(name).ok()?;
    // Drop the variant suffix, like in `a.sc` or `one.oldstyle`
    let name = name.split('.').next().unwrap_or(name);

    if name.chars().count() == 1 {
        return name.chars().next().filter(|character| character.is_ascii_alphabetic());
    }
    if let Some((_, character)) = NAMED_GLYPHS.iter().find(|(glyph, _)| *glyph == name) {
        return Some(*character);
    }
    if let Some(hex) = name.strip_prefix("uni").or_else(|| name.strip_prefix('u')) {
        if (4..=6).contains(&hex.len()) {
            if let Some(character) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                return Some(character);
            }
        }
    }
    for (suffix, accent) in ACCENT_SUFFIXES {
        if let Some(base) = name.strip_suffix(suffix) {
            let mut letters = base.chars();
            if let (Some(letter), None) = (letters.next(), letters.next()) {
                if letter.is_ascii_alphabetic() {
                    return [letter, *accent].into_iter().nfc().next();
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_ansi_special_block() {
        assert_eq!(win_ansi_to_char(0x80), Some('€'));
        assert_eq!(win_ansi_to_char(0x81), None);
        assert_eq!(win_ansi_to_char(0x41), Some('A'));
        assert_eq!(win_ansi_to_char(0xE9), Some('é'));
        assert_eq!(char_to_win_ansi('“'), Some(0x93));
        assert_eq!(char_to_win_ansi('é'), Some(0xE9));
    }

    #[test]
    fn test_encode_reports_unencodable_characters() {
        assert_eq!(encode_win_ansi("Café"), Ok(b"Caf\xE9".to_vec()));
        assert_eq!(encode_win_ansi("日本"), Err(vec!['日', '本']));
    }

    #[test]
    fn test_glyph_names() {
        assert_eq!(glyph_name_to_char(b"A"), Some('A'));
        assert_eq!(glyph_name_to_char(b"space"), Some(' '));
        assert_eq!(glyph_name_to_char(b"eacute"), Some('é'));
        assert_eq!(glyph_name_to_char(b"uni00E8"), Some('è'));
        assert_eq!(glyph_name_to_char(b"seven.oldstyle"), Some('7'));
        assert_eq!(glyph_name_to_char(b"g123"), None);
    }
}
