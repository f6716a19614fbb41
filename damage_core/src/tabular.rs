//! # Tabular Files
//!
//! `csv` reader and writer setup shared by the damage curve, max damage and
//! segment files. Fields may be quoted, quoted fields may hold the separator
//! or line breaks, every field is trimmed and blank lines are skipped.
//!
//! Rows are read flexibly: a row with the wrong number of fields is reported
//! by the caller, which knows what the row means.

use std::fs::File;
use std::io;
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord, Trim, Writer, WriterBuilder};

use crate::errors::{DamageError, DamageResult};

/// The separator as the single byte the `csv` crate expects
pub fn delimiter(sep: char) -> DamageResult<u8> {
    u8::try_from(sep).ok().filter(u8::is_ascii).ok_or_else(|| {
        DamageError::invalid_input(
            "csv_separator",
            sep.to_string(),
            "Separator must be a single ASCII character",
        )
    })
}

/// Reader over any byte source, first record taken as the header
pub fn reader<R: io::Read>(input: R, sep: char) -> DamageResult<Reader<R>> {
    Ok(ReaderBuilder::new()
        .delimiter(delimiter(sep)?)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input))
}

/// Open a file for reading
pub fn open(path: &Path, sep: char) -> DamageResult<Reader<File>> {
    let file = File::open(path).map_err(|e| {
        DamageError::file_error("open", path.display().to_string(), e.to_string())
    })?;
    reader(file, sep)
}

/// Header names, `Format` error when the input has none
pub fn header<R: io::Read>(reader: &mut Reader<R>, source: &str) -> DamageResult<Vec<String>> {
    let header = reader.headers().map_err(|e| read_error(source, e))?;
    if header.is_empty() {
        return Err(DamageError::format(source, "file is empty"));
    }
    Ok(header.iter().map(str::to_string).collect())
}

/// Every data record after the header
pub fn records<R: io::Read>(reader: &mut Reader<R>, source: &str) -> DamageResult<Vec<StringRecord>> {
    reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| read_error(source, e))
}

/// Map a parse failure to a `Format` error naming the source
pub fn read_error(source: &str, error: csv::Error) -> DamageError {
    match error.kind() {
        csv::ErrorKind::Io(e) => DamageError::file_error("read", source, e.to_string()),
        _ => DamageError::format(source, error.to_string()),
    }
}

/// Writer with the same separator conventions as the readers
pub fn writer<W: io::Write>(output: W, sep: char) -> DamageResult<Writer<W>> {
    Ok(WriterBuilder::new().delimiter(delimiter(sep)?).from_writer(output))
}

/// Map a write failure to a `SerializationError`
pub fn write_error(error: impl std::fmt::Display) -> DamageError {
    DamageError::SerializationError {
        reason: format!("Cannot write delimited output: {}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_fields_and_blank_lines() {
        let input = "name;value\n\n\"a;b\";1\n\"say \"\"hi\"\"\"; 2 \n";
        let mut reader = reader(input.as_bytes(), ';').unwrap();
        assert_eq!(header(&mut reader, "input").unwrap(), vec!["name", "value"]);

        let rows = records(&mut reader, "input").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "a;b");
        assert_eq!(&rows[1][0], "say \"hi\"");
        assert_eq!(&rows[1][1], "2");
    }

    #[test]
    fn test_quoted_line_break_stays_in_field() {
        let input = "id,note\n1,\"first\nsecond\"\n2,plain\n";
        let mut reader = reader(input.as_bytes(), ',').unwrap();
        let rows = records(&mut reader, "input").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "first\nsecond");
    }

    #[test]
    fn test_empty_input_is_format_error() {
        let mut reader = reader("".as_bytes(), ',').unwrap();
        assert!(matches!(header(&mut reader, "input"), Err(DamageError::Format { .. })));
    }

    #[test]
    fn test_non_ascii_separator_rejected() {
        assert_eq!(delimiter('\t').unwrap(), b'\t');
        assert!(matches!(delimiter('§'), Err(DamageError::InvalidInput { .. })));
    }

    #[test]
    fn test_writer_quotes_when_needed() {
        let mut writer = writer(Vec::new(), ',').unwrap();
        writer.write_record(["a", "b, c", ""]).unwrap();
        let bytes = writer.into_inner().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "a,\"b, c\",\n");
    }
}
