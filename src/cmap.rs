use std::collections::HashMap;

/// The character code to Unicode mapping of a `ToUnicode` CMap stream.
#[derive(Clone, Debug, Default)]
pub(crate) struct ToUnicodeMap {
    mappings: HashMap<u32, String>,
}

#[derive(Debug, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Keyword(String),
}

impl ToUnicodeMap {
    /// Parse the `bfchar` and `bfrange` sections of a CMap. Everything else (code space ranges,
    /// the CID system information, comments) is skipped.
    pub(crate) fn parse(data: &[u8]) -> Self {
        let tokens = tokenize(data);
        let mut mappings = HashMap::new();
        let mut index = 0;
        while index < tokens.len() {
            match &tokens[index] {
                Token::Keyword(keyword) if keyword == "beginbfchar" => {
                    index += 1;
                    while let (Some(Token::Hex(source)), Some(Token::Hex(destination))) =
                        (tokens.get(index), tokens.get(index + 1))
                    {
                        mappings.insert(code_from_bytes(source), utf16_to_string(destination));
                        index += 2;
                    }
                }
                Token::Keyword(keyword) if keyword == "beginbfrange" => {
                    index += 1;
                    loop {
                        let (Some(Token::Hex(low)), Some(Token::Hex(high))) =
                            (tokens.get(index), tokens.get(index + 1))
                        else {
                            break;
                        };
                        let (low, high) = (code_from_bytes(low), code_from_bytes(high));
                        index += 2;
                        match tokens.get(index) {
                            Some(Token::Hex(destination)) => {
                                let units = utf16_units(destination);
                                for (offset, code) in (low..=high.min(low.saturating_add(0xFFFF))).enumerate() {
                                    let mut units = units.clone();
                                    if let Some(last) = units.last_mut() {
                                        *last = last.wrapping_add(offset as u16);
                                    }
                                    mappings.insert(code, String::from_utf16_lossy(&units));
                                }
                                index += 1;
                            }
                            Some(Token::ArrayStart) => {
                                index += 1;
                                let mut code = low;
                                while let Some(Token::Hex(destination)) = tokens.get(index) {
                                    if code <= high {
                                        mappings.insert(code, utf16_to_string(destination));
                                    }
                                    code = code.saturating_add(1);
                                    index += 1;
                                }
                                if tokens.get(index) == Some(&Token::ArrayEnd) {
                                    index += 1;
                                }
                            }
                            _ => break,
                        }
                    }
                }
                _ => index += 1,
            }
        }

        Self { mappings }
    }

    pub(crate) fn get(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(String::as_str)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

fn code_from_bytes(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0, |code, byte| (code << 8) | u32::from(*byte))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [high, low] => u16::from_be_bytes([*high, *low]),
            [single] => u16::from(*single),
            _ => 0,
        })
        .collect()
}

fn utf16_to_string(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut index = 0;
    while index < data.len() {
        let byte = data[index];
        match byte {
            b'%' => {
                while index < data.len() && data[index] != b'\n' && data[index] != b'\r' {
                    index += 1;
                }
            }
            b'<' if data.get(index + 1) == Some(&b'<') => index += 2,
            b'>' if data.get(index + 1) == Some(&b'>') => index += 2,
            b'<' => {
                let end = data[index..]
                    .iter()
                    .position(|byte| *byte == b'>')
                    .map_or(data.len(), |offset| index + offset);
                let digits: Vec<u8> = data[index + 1..end]
                    .iter()
                    .copied()
                    .filter(u8::is_ascii_hexdigit)
                    .collect();
                let bytes = digits
                    .chunks(2)
                    .map(|pair| {
                        let high = hex_value(pair[0]);
                        let low = pair.get(1).map_or(0, |digit| hex_value(*digit));
                        (high << 4) | low
                    })
                    .collect();
                tokens.push(Token::Hex(bytes));
                index = end + 1;
            }
            b'[' => {
                tokens.push(Token::ArrayStart);
                index += 1;
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                index += 1;
            }
            b'(' => {
                // Literal strings only appear in the CID system information
                let mut depth = 0;
                while index < data.len() {
                    match data[index] {
                        b'\\' => index += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    index += 1;
                }
                index += 1;
            }
            _ if byte.is_ascii_whitespace() => index += 1,
            _ => {
                let start = index;
                while index < data.len()
                    && !data[index].is_ascii_whitespace()
                    && !b"<>[]()%/".contains(&data[index])
                {
                    index += 1;
                }
                if index == start {
                    // A name delimiter, the name itself is read as a keyword next
                    index += 1;
                    continue;
                }
                let word = String::from_utf8_lossy(&data[start..index]).into_owned();
                tokens.push(Token::Keyword(word));
            }
        }
    }

    tokens
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        b'A'..=b'F' => digit - b'A' + 10,
        _ => 0,
    }
}
