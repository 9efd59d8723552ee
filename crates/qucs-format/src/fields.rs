//! Whitespace separated fields of a tag line, with `"quoted"` values.

use crate::error::LineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field<'a> {
    /// Field text; for quoted fields the text between the quotes, escapes
    /// left undecoded.
    pub text: &'a str,
    pub quoted: bool,
}

impl<'a> Field<'a> {
    pub fn int(&self, name: &'static str) -> Result<i32, LineError> {
        if self.quoted {
            return Err(LineError::NotAnInteger {
                field: name,
                value: self.text.to_string(),
            });
        }
        self.text.parse().map_err(|_| LineError::NotAnInteger {
            field: name,
            value: self.text.to_string(),
        })
    }
}

/// Split `line` into fields.
///
/// Inside quotes a backslash protects the next character, so `"a \" b"` is
/// one field. An unterminated quote is a grammar error.
pub fn split_fields(line: &str) -> Result<Vec<Field<'_>>, LineError> {
    let mut fields = Vec::new();
    let bytes = line.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if bytes[i] == b'"' {
            let start = i + 1;
            let mut j = start;
            loop {
                match bytes.get(j) {
                    None => {
                        return Err(LineError::Grammar(format!(
                            "unterminated quoted field starting at column {i}"
                        )));
                    }
                    Some(b'\\') => j += 2,
                    Some(b'"') => break,
                    Some(_) => j += 1,
                }
            }
            fields.push(Field {
                text: &line[start..j],
                quoted: true,
            });
            i = j + 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        fields.push(Field {
            text: &line[start..i],
            quoted: false,
        });
    }

    Ok(fields)
}

/// Decode the `\n` and `\\` escapes used in stored text; other escaped
/// characters are kept as-is without the backslash.
pub fn decode_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fields() {
        let fields = split_fields(r#"R R1 1 200 120 15 -26 0 1 "50 Ohm" 1 "" 0"#).unwrap();
        let texts: Vec<&str> = fields.iter().map(|f| f.text).collect();
        assert_eq!(
            texts,
            ["R", "R1", "1", "200", "120", "15", "-26", "0", "1", "50 Ohm", "1", "", "0"]
        );
        assert!(fields[9].quoted);
        assert!(fields[11].quoted);
        assert!(!fields[10].quoted);
    }

    #[test]
    fn test_split_fields_escaped_quote() {
        let fields = split_fields(r#"Text 0 0 12 #000000 0 "say \"hi\"""#).unwrap();
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[5].text, r#"say \"hi\""#);
        assert_eq!(decode_escapes(fields[5].text), r#"say "hi""#);
    }

    #[test]
    fn test_split_fields_unterminated() {
        assert!(matches!(
            split_fields(r#"Text 0 0 12 #000000 0 "oops"#),
            Err(LineError::Grammar(_))
        ));
        assert!(matches!(
            split_fields(r#"Text "trailing\"#),
            Err(LineError::Grammar(_))
        ));
    }

    #[test]
    fn test_int_field() {
        let fields = split_fields(r#"-30 x "7""#).unwrap();
        assert_eq!(fields[0].int("x"), Ok(-30));
        assert!(fields[1].int("y").is_err());
        assert!(fields[2].int("n").is_err());
    }

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode_escapes(r"a\nb\\c"), "a\nb\\c");
        assert_eq!(decode_escapes(r"end\"), "end\\");
    }
}
