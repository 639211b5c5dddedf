//! Character reference decoding and escaping.

/// Decode the character references the editor actually meets in pasted and
/// stored markup. Unknown references are left untouched.
pub fn decode(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        output.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_reference(&rest[1..semi]).map(|ch| (ch, semi)));

        match decoded {
            Some((ch, semi)) => {
                output.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                output.push('&');
                rest = &rest[1..];
            }
        }
    }

    output.push_str(rest);
    output
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(numeric) = name.strip_prefix('#') {
        let code = match numeric.strip_prefix('x').or_else(|| numeric.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }

    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

/// Escape text node content
pub fn escape_text(input: &str, output: &mut String) {
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            _ => output.push(ch),
        }
    }
}

/// Escape a double-quoted attribute value
pub fn escape_attribute(input: &str, output: &mut String) {
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            _ => output.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_named_and_numeric() {
        assert_eq!(decode("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode("&#39;&#x41;&quot;"), "'A\"");
        assert_eq!(decode("x&nbsp;y"), "x\u{a0}y");
    }

    #[test]
    fn test_decode_leaves_unknown_references() {
        assert_eq!(decode("AT&T"), "AT&T");
        assert_eq!(decode("&bogus;"), "&bogus;");
        assert_eq!(decode("trailing &"), "trailing &");
    }

    #[test]
    fn test_escape_round_trips() {
        let mut out = String::new();
        escape_text("1 < 2 & 3", &mut out);
        assert_eq!(out, "1 &lt; 2 &amp; 3");
        assert_eq!(decode(&out), "1 < 2 & 3");
    }
}
