//! Single-record comma-separated encoding for collection flags.
//!
//! Quoting follows RFC 4180: fields containing a comma, quote, or line break
//! (or starting with whitespace) are quoted, and quotes are doubled. A record
//! holding one empty field is written as `""` so it differs from no fields.
//! Reading is strict: a bare quote inside an unquoted field, text after a
//! closing quote, or an unterminated quoted field are errors. Only the first
//! record is read.

use crate::error::ParseError;

/// Splits `raw` into the fields of its first record.
///
/// The empty string yields an empty list.
pub(crate) fn read_record(raw: &str) -> Result<Vec<String>, ParseError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let fail = |reason: &str| ParseError::Csv {
        value: raw.to_owned(),
        reason: reason.to_owned(),
    };

    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = raw.chars().peekable();
    loop {
        if chars.peek() == Some(&'"') {
            chars.next();
            loop {
                match chars.next() {
                    None => return Err(fail("extraneous or missing \" in quoted-field")),
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    Some('"') => break,
                    Some(other) => field.push(other),
                }
            }
            match chars.next() {
                None | Some('\n') => {
                    fields.push(field);
                    return Ok(fields);
                }
                Some('\r') if matches!(chars.peek(), None | Some('\n')) => {
                    fields.push(field);
                    return Ok(fields);
                }
                Some(',') => fields.push(std::mem::take(&mut field)),
                Some(_) => return Err(fail("extraneous or missing \" in quoted-field")),
            }
        } else {
            loop {
                match chars.next() {
                    None | Some('\n') => {
                        fields.push(field);
                        return Ok(fields);
                    }
                    Some('\r') if matches!(chars.peek(), None | Some('\n')) => {
                        fields.push(field);
                        return Ok(fields);
                    }
                    Some(',') => {
                        fields.push(std::mem::take(&mut field));
                        break;
                    }
                    Some('"') => return Err(fail("bare \" in non-quoted-field")),
                    Some(other) => field.push(other),
                }
            }
        }
    }
}

/// Joins `fields` into a single record, quoting where required.
pub(crate) fn write_record<S: AsRef<str>>(fields: &[S]) -> String {
    if matches!(fields, [only] if only.as_ref().is_empty()) {
        return String::from("\"\"");
    }
    fields
        .iter()
        .map(|field| quote(field.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

fn quote(field: &str) -> String {
    if !needs_quotes(field) {
        return field.to_owned();
    }
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn needs_quotes(field: &str) -> bool {
    field == r"\."
        || field.contains([',', '"', '\r', '\n'])
        || field.chars().next().is_some_and(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", &[])]
    #[case("some value with spaces", &["some value with spaces"])]
    #[case("val2,val1", &["val2", "val1"])]
    #[case("a,,b", &["a", "", "b"])]
    #[case("\"a,b\",c", &["a,b", "c"])]
    #[case("\"say \"\"hi\"\"\"", &["say \"hi\""])]
    #[case("first\nsecond", &["first"])]
    #[case("a,", &["a", ""])]
    fn read_record_splits_fields(#[case] input: &str, #[case] expected: &[&str]) {
        assert_eq!(
            read_record(input).expect("record should be read"),
            expected.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>()
        );
    }

    #[rstest]
    #[case("\",", "extraneous or missing \" in quoted-field")]
    #[case("a\"b", "bare \" in non-quoted-field")]
    #[case("\"a\"b", "extraneous or missing \" in quoted-field")]
    fn read_record_rejects_malformed_quotes(#[case] input: &str, #[case] reason: &str) {
        let error = read_record(input).expect_err("malformed record should fail");
        assert_eq!(
            error.to_string(),
            format!("cannot read value '{input}' as comma-separated values: {reason}")
        );
    }

    #[rstest]
    #[case(&["2", "3", "4"], "2,3,4")]
    #[case(&["a,b", "c"], "\"a,b\",c")]
    #[case(&["say \"hi\""], "\"say \"\"hi\"\"\"")]
    #[case(&[" padded"], "\" padded\"")]
    #[case(&["", "x"], ",x")]
    #[case(&[""], "\"\"")]
    #[case(&["", ""], ",")]
    #[case(&["\tindented"], "\"\tindented\"")]
    #[case(&["\u{a0}non-breaking"], "\"\u{a0}non-breaking\"")]
    #[case(&["\u{3000}ideographic"], "\"\u{3000}ideographic\"")]
    #[case(&["trailing "], "trailing ")]
    fn write_record_quotes_where_required(#[case] fields: &[&str], #[case] expected: &str) {
        assert_eq!(write_record(fields), expected);
    }

    #[rstest]
    #[case(&["plain", "with,comma", "with \"quote\"", " lead"])]
    #[case(&[""])]
    #[case(&["", ""])]
    #[case(&["\u{a0}lead"])]
    fn written_records_read_back(#[case] fields: &[&str]) {
        let encoded = write_record(fields);
        assert_eq!(read_record(&encoded).expect("record should be read"), fields);
    }
}
