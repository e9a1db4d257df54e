//! Delimited-text reader with encoding and delimiter auto-detection.
//!
//! Turns a file into [`RawResponse`] rows keyed by header. No survey logic
//! here.

use csv::{ReaderBuilder, Trim};
use std::path::Path;

use crate::error::{InputError, InputResult};
use crate::models::RawResponse;

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// One entry per data line
    pub records: Vec<RawResponse>,
    /// Detected encoding
    pub encoding: String,
    /// Detected or configured delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

impl ParseResult {
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

/// Candidate delimiters, in tie-break order.
const DELIMITERS: [char; 4] = [';', ',', '\t', '|'];

/// Name of the encoding of `bytes`, as an `encoding_rs` label.
///
/// Valid UTF-8 (plain ASCII included) is always `"utf-8"`. Anything else is
/// left to chardet, normalized through the WHATWG label table, so
/// `iso-8859-1` comes back as `windows-1252`.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }
    let (charset, _confidence, _language) = chardet::detect(bytes);
    encoding_rs::Encoding::for_label(charset.as_bytes())
        .map(|enc| enc.name().to_lowercase())
        .unwrap_or(charset)
}

/// Decode `bytes` with the encoding named by `label`.
///
/// UTF-8 decodes lossily. Other encodings must decode cleanly; an unknown
/// label is an error rather than a guess.
pub fn decode_content(bytes: &[u8], label: &str) -> InputResult<String> {
    let label = label.trim().to_lowercase();
    let label = match label.as_str() {
        "ascii" | "utf8" => "utf-8",
        other => other,
    };
    let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
        .ok_or_else(|| InputError::Encoding(format!("unknown encoding '{}'", label)))?;

    if encoding == encoding_rs::UTF_8 {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(InputError::Encoding(format!(
            "invalid byte sequence for {}",
            encoding.name()
        )));
    }
    Ok(text.into_owned())
}

/// Most frequent candidate delimiter in the header line, `;` when none
/// occurs. Ties go to the earlier candidate.
pub fn detect_delimiter(content: &str) -> char {
    let header = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");

    DELIMITERS
        .iter()
        .rev()
        .map(|&d| (d, header.matches(d).count()))
        .filter(|&(_, count)| count > 0)
        .max_by_key(|&(_, count)| count)
        .map(|(d, _)| d)
        .unwrap_or(';')
}

/// Parse delimited text with an explicit delimiter.
///
/// Short rows are padded with empty strings, extra cells are ignored and
/// blank lines are skipped.
///
/// # Example
/// ```ignore
/// use survey_report::parser::parse_str;
///
/// let result = parse_str("ID;PHYS\n1;1", ';').unwrap();
/// assert_eq!(result.records[0].get("PHYS"), "1");
/// ```
pub fn parse_str(content: &str, delimiter: char) -> InputResult<ParseResult> {
    parse_with_encoding(content, delimiter, "utf-8".to_string())
}

fn parse_with_encoding(
    content: &str,
    delimiter: char,
    encoding: String,
) -> InputResult<ParseResult> {
    if content.trim().is_empty() {
        return Err(InputError::EmptyFile);
    }
    if !delimiter.is_ascii() {
        return Err(InputError::Parse {
            line: 1,
            message: format!("delimiter '{}' is not ASCII", delimiter),
        });
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .trim(Trim::Headers)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| InputError::Parse {
            line: 1,
            message: format!("cannot read header: {}", e),
        })?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(InputError::NoHeaders);
    }

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| InputError::Parse {
            line: e.position().map(|p| p.line() as usize).unwrap_or(idx + 2),
            message: e.to_string(),
        })?;

        records.push(RawResponse::from_pairs(
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.as_str(), record.get(i).unwrap_or(""))),
        ));
    }

    Ok(ParseResult {
        records,
        encoding,
        delimiter,
        headers,
    })
}

/// Parse bytes, detecting the encoding and, when `delimiter` is `None`, the
/// delimiter.
pub fn parse_bytes(bytes: &[u8], delimiter: Option<char>) -> InputResult<ParseResult> {
    if bytes.is_empty() {
        return Err(InputError::EmptyFile);
    }
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    parse_with_encoding(&content, delimiter, encoding)
}

/// Parse a file, detecting the encoding and optionally the delimiter.
pub fn parse_file<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> InputResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| InputError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_bytes(&bytes, delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_simple_semicolon() {
        let result = parse_str("ID;PHYS;WORD\n1;1;Word\n2;;", ';').unwrap();

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.headers, vec!["ID", "PHYS", "WORD"]);
        assert_eq!(result.records[0].get("WORD"), "Word");
        assert_eq!(result.records[1].get("PHYS"), "");
    }

    #[test]
    fn test_quoted_values_keep_delimiter() {
        let csv = "ID;WRITESPECCL\n1;\"Zotero, Pandoc\"";
        let result = parse_str(csv, ';').unwrap();
        assert_eq!(result.records[0].get("WRITESPECCL"), "Zotero, Pandoc");
    }

    #[test]
    fn test_short_rows_padded() {
        let result = parse_str("a;b;c\n1", ';').unwrap();
        assert_eq!(result.records[0].get("a"), "1");
        assert_eq!(result.records[0].get("c"), "");
    }

    #[test]
    fn test_extra_columns_ignored() {
        let result = parse_str("a;b\n1;2;3;4", ';').unwrap();
        assert_eq!(result.records[0].len(), 2);
        assert_eq!(result.records[0].get("b"), "2");
    }

    #[test]
    fn test_empty_lines_skipped() {
        let result = parse_str("a;b\n1;2\n\n3;4\n", ';').unwrap();
        assert_eq!(result.records.len(), 2);
    }

    #[test]
    fn test_empty_content_error() {
        assert!(matches!(parse_str("", ';'), Err(InputError::EmptyFile)));
        assert!(matches!(parse_bytes(b"", None), Err(InputError::EmptyFile)));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        assert!(matches!(
            parse_str("a§b\n1§2", '§'),
            Err(InputError::Parse { .. })
        ));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("tool,famille\nWord,x"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
    }

    #[test]
    fn test_parse_bytes_auto_delimiter() {
        let result = parse_bytes(b"tool,famille\nWord,wysiwyg bureautique", None).unwrap();
        assert_eq!(result.delimiter, ',');
        assert_eq!(result.records[0].get("famille"), "wysiwyg bureautique");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_latin1_label_uses_whatwg_mapping() {
        // 0xA4 is the currency sign in ISO-8859-1, the euro sign only in -15
        let decoded = decode_content(&[0x31, 0xA4], "iso-8859-1").unwrap();
        assert_eq!(decoded, "1\u{a4}");
        assert_eq!(decode_content(&[0x80], "latin1").unwrap(), "\u{20ac}");
    }

    #[test]
    fn test_unknown_encoding_label_rejected() {
        assert!(matches!(
            decode_content(b"abc", "klingon-8"),
            Err(InputError::Encoding(_))
        ));
    }

    #[test]
    fn test_valid_utf8_detected_without_guessing() {
        assert_eq!(detect_encoding(b"tool,famille"), "utf-8");
        assert_eq!(detect_encoding("Médecine;Droit".as_bytes()), "utf-8");
    }

    #[test]
    fn test_detect_delimiter_ties_and_blank_lines() {
        assert_eq!(detect_delimiter("\n\na,b;c"), ';');
        assert_eq!(detect_delimiter("single"), ';');
    }

    #[test]
    fn test_parse_file_missing() {
        let err = parse_file("/definitely/not/here.csv", None).unwrap_err();
        assert!(matches!(err, InputError::Io { .. }));
        assert!(err.to_string().contains("here.csv"));
    }

    #[test]
    fn test_parse_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "ID;LAW\n7;Law\n").unwrap();

        let result = parse_file(file.path(), Some(';')).unwrap();
        assert!(result.has_column("LAW"));
        assert_eq!(result.records[0].get("ID"), "7");
    }
}
