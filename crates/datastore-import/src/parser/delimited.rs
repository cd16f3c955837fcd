//! CSV / TSV parser backed by the `csv` crate

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

use datastore_common::Resource;
use tracing::debug;

use super::{ParseError, ReaderPosition, RowParser, RowReader};
use crate::schema::Row;

/// Bytes inspected for binary content before parsing from the start
const SNIFF_LENGTH: u64 = 8 * 1024;

const UTF8_BOM: char = '\u{feff}';

/// Delimited-text parser.
///
/// The delimiter follows the resource MIME type (tab for
/// `text/tab-separated-values`, comma otherwise) unless fixed with
/// [`CsvParser::with_delimiter`]. Records may have differing lengths; the
/// importer decides what to do with short or long rows.
#[derive(Debug, Clone, Default)]
pub struct CsvParser {
    delimiter: Option<u8>,
}

impl CsvParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter: Some(delimiter),
        }
    }

    fn delimiter_for(&self, resource: &Resource) -> u8 {
        match self.delimiter {
            Some(d) => d,
            None if resource.is_tab_separated() => b'\t',
            None => b',',
        }
    }
}

impl RowParser for CsvParser {
    fn name(&self) -> &str {
        "csv"
    }

    fn open(
        &self,
        resource: &Resource,
        start: Option<ReaderPosition>,
    ) -> Result<Box<dyn RowReader>, ParseError> {
        let location = resource.uri().to_string();
        let path = resource
            .local_path()
            .map_err(|source| ParseError::InvalidLocation {
                location: location.clone(),
                source,
            })?;

        let unreadable = |source: std::io::Error| ParseError::Unreadable {
            location: location.clone(),
            source,
        };

        let mut file = File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ParseError::NotFound {
                location: location.clone(),
            },
            _ => unreadable(e),
        })?;

        if file.metadata().map_err(unreadable)?.is_dir() {
            return Err(unreadable(std::io::Error::new(
                ErrorKind::Other,
                "location is a directory",
            )));
        }

        let start = start.unwrap_or_default();
        if start.byte_offset == 0 {
            sniff_text(&mut file, &location)?;
        }

        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter_for(resource))
            .from_reader(file);

        let mut position = ::csv::Position::new();
        position.set_byte(start.byte_offset).set_line(start.line.max(1));
        reader
            .seek(position)
            .map_err(|e| map_csv_error(e, &location, start.line))?;

        debug!(
            location = %location,
            byte_offset = start.byte_offset,
            line = start.line,
            "Opened delimited reader"
        );

        Ok(Box::new(CsvRowReader {
            reader,
            location,
            at_start: start.byte_offset == 0,
            record: ::csv::StringRecord::new(),
        }))
    }
}

/// Reject content that is obviously binary before the CSV reader sees it
fn sniff_text(file: &mut File, location: &str) -> Result<(), ParseError> {
    let mut sample = Vec::with_capacity(SNIFF_LENGTH as usize);
    let unreadable = |source| ParseError::Unreadable {
        location: location.to_string(),
        source,
    };

    file.by_ref()
        .take(SNIFF_LENGTH)
        .read_to_end(&mut sample)
        .map_err(unreadable)?;
    file.seek(SeekFrom::Start(0)).map_err(unreadable)?;

    if sample.contains(&0) {
        return Err(ParseError::NotText {
            location: location.to_string(),
            reason: "contains NUL bytes".to_string(),
        });
    }

    // A sample cut inside a multi-byte character is still text
    if let Err(e) = std::str::from_utf8(&sample) {
        if e.error_len().is_some() {
            return Err(ParseError::NotText {
                location: location.to_string(),
                reason: format!("invalid UTF-8 at byte {}", e.valid_up_to()),
            });
        }
    }

    Ok(())
}

fn map_csv_error(err: ::csv::Error, location: &str, line: u64) -> ParseError {
    let line = err.position().map(|p| p.line()).unwrap_or(line);
    match err.into_kind() {
        ::csv::ErrorKind::Io(source) => ParseError::Unreadable {
            location: location.to_string(),
            source,
        },
        ::csv::ErrorKind::Utf8 { err, .. } => ParseError::NotText {
            location: location.to_string(),
            reason: format!("invalid UTF-8 near line {}: {}", line, err),
        },
        other => ParseError::Malformed {
            line,
            reason: format!("{:?}", other),
        },
    }
}

struct CsvRowReader {
    reader: ::csv::Reader<File>,
    location: String,
    at_start: bool,
    record: ::csv::StringRecord,
}

impl RowReader for CsvRowReader {
    fn next_row(&mut self) -> Option<Result<Row, ParseError>> {
        let line = self.reader.position().line();
        match self.reader.read_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                let mut row: Row = self.record.iter().map(str::to_string).collect();
                if self.at_start {
                    if let Some(first) = row.first_mut() {
                        if let Some(stripped) = first.strip_prefix(UTF8_BOM) {
                            *first = stripped.to_string();
                        }
                    }
                    self.at_start = false;
                }
                Some(Ok(row))
            },
            Err(e) => Some(Err(map_csv_error(e, &self.location, line))),
        }
    }

    fn position(&self) -> ReaderPosition {
        let position = self.reader.position();
        ReaderPosition {
            byte_offset: position.byte(),
            line: position.line(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &[u8], suffix: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    fn collect(reader: &mut dyn RowReader) -> Vec<Row> {
        let mut rows = Vec::new();
        while let Some(row) = reader.next_row() {
            rows.push(row.unwrap());
        }
        rows
    }

    #[test]
    fn test_reads_header_and_rows() {
        let file = write_temp(b"a,b\n1,2\n\"x, y\",3\n", ".csv");
        let resource = Resource::from_path("1", file.path());

        let mut reader = CsvParser::new().open(&resource, None).unwrap();
        let rows = collect(reader.as_mut());

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["a", "b"]);
        assert_eq!(rows[2], vec!["x, y", "3"]);
    }

    #[test]
    fn test_resume_from_position() {
        let file = write_temp(b"h1,h2\n1,2\n3,4\n5,6\n", ".csv");
        let resource = Resource::from_path("1", file.path());
        let parser = CsvParser::new();

        let mut reader = parser.open(&resource, None).unwrap();
        reader.next_row().unwrap().unwrap();
        reader.next_row().unwrap().unwrap();
        let position = reader.position();
        assert_eq!(position.line, 3);

        let mut resumed = parser.open(&resource, Some(position)).unwrap();
        let rows = collect(resumed.as_mut());
        assert_eq!(rows, vec![vec!["3", "4"], vec!["5", "6"]]);
    }

    #[test]
    fn test_tab_separated_resource() {
        let file = write_temp(b"a\tb\n1,5\t2\n", ".tsv");
        let resource = Resource::from_path("1", file.path());

        let mut reader = CsvParser::new().open(&resource, None).unwrap();
        let rows = collect(reader.as_mut());
        assert_eq!(rows[1], vec!["1,5", "2"]);
    }

    #[test]
    fn test_strips_bom_from_header() {
        let file = write_temp("\u{feff}name,age\nann,3\n".as_bytes(), ".csv");
        let resource = Resource::from_path("1", file.path());

        let mut reader = CsvParser::new().open(&resource, None).unwrap();
        let header = reader.next_row().unwrap().unwrap();
        assert_eq!(header, vec!["name", "age"]);
    }

    #[test]
    fn test_missing_file() {
        let resource = Resource::new("1", "/definitely/not/here.csv", "text/csv");
        let err = CsvParser::new().open(&resource, None).err().unwrap();
        assert!(matches!(err, ParseError::NotFound { .. }));
    }

    #[test]
    fn test_binary_file_is_not_text() {
        let file = write_temp(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0x0d], ".csv");
        let resource = Resource::from_path("1", file.path());
        let err = CsvParser::new().open(&resource, None).err().unwrap();
        assert!(matches!(err, ParseError::NotText { .. }));
    }

    #[test]
    fn test_invalid_utf8_is_rejected_on_open() {
        let file = write_temp(b"city,n\ncaf\xe9,1\n", ".csv");
        let resource = Resource::from_path("1", file.path());

        let err = CsvParser::new().open(&resource, None).err().unwrap();
        assert!(matches!(err, ParseError::NotText { .. }));
    }

    #[test]
    fn test_invalid_utf8_past_sample_fails_on_read() {
        let mut contents = b"a,b\n".to_vec();
        while contents.len() < SNIFF_LENGTH as usize {
            contents.extend_from_slice(b"x,1\n");
        }
        contents.extend_from_slice(b"\xff\xfe,2\n");
        let file = write_temp(&contents, ".csv");
        let resource = Resource::from_path("1", file.path());

        let mut reader = CsvParser::new().open(&resource, None).unwrap();
        let err = loop {
            match reader.next_row().unwrap() {
                Ok(_) => continue,
                Err(e) => break e,
            }
        };
        assert!(matches!(err, ParseError::NotText { .. }));
    }

    #[test]
    fn test_sample_may_end_inside_a_character() {
        // "é" is two bytes; the first lands on the last sampled byte
        let mut contents = b"a\n".to_vec();
        contents.resize(SNIFF_LENGTH as usize - 1, b'x');
        contents.extend_from_slice("é\n".as_bytes());
        let file = write_temp(&contents, ".csv");
        let resource = Resource::from_path("1", file.path());

        let mut reader = CsvParser::new().open(&resource, None).unwrap();
        let rows = collect(reader.as_mut());
        assert_eq!(rows.len(), 2);
        assert!(rows[1][0].ends_with('é'));
    }

    #[test]
    fn test_unsupported_scheme_keeps_location() {
        let resource = Resource::new("1", "http://example.com/data.csv", "text/csv");
        let err = CsvParser::new().open(&resource, None).err().unwrap();

        assert!(matches!(err, ParseError::InvalidLocation { .. }));
        assert!(err.to_string().contains("example.com"));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let file = write_temp(b"n\n1\n\n2\n", ".csv");
        let resource = Resource::from_path("1", file.path());

        let mut reader = CsvParser::new().open(&resource, None).unwrap();
        let rows = collect(reader.as_mut());
        assert_eq!(rows, vec![vec!["n"], vec!["1"], vec!["2"]]);
    }
}
