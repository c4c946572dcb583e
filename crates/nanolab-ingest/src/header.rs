//! Comment-block metadata of instrument exports.
//!
//! An export starts with a line naming its procedure inside angle brackets,
//! followed by `#`-prefixed comment lines. Lines prefixed `#\t` carry
//! `key: value` pairs:
//!
//! ```text
//! #Procedure: <laser_setup.procedures.ITt>
//! #Parameters:
//! #	VDS: 0.1 V
//! #Metadata:
//! #	Start time: 1731364225.4285064
//! #Data:
//! Time (s),I (A)
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use indexmap::IndexMap;
use tracing::warn;

use nanolab_model::RawHeader;

use crate::error::{IngestError, Result};

/// Prefix of every line counted toward the body offset.
pub const COMMENT_MARKER: &str = "#";
/// Prefix of comment lines carrying a `key: value` pair.
pub const ENTRY_MARKER: &str = "#\t";
/// Separator between key and value in an entry line.
pub const KEY_VALUE_SEPARATOR: &str = ": ";

const BOM: char = '\u{feff}';

/// Joins the parent folder name and the file stem, e.g.
/// `data/2024-11-29/ITt_1.csv` -> `2024-11-29/ITt_1`.
pub fn extract_data_key(path: &Path) -> Result<String> {
    let invalid = || IngestError::InvalidPath {
        path: path.to_path_buf(),
    };
    let file_name = path.file_name().ok_or_else(invalid)?.to_string_lossy();
    let folder = path
        .parent()
        .and_then(Path::file_name)
        .ok_or_else(invalid)?
        .to_string_lossy();
    let stem = file_name.split('.').next().unwrap_or_default();
    Ok(format!("{folder}/{stem}"))
}

/// Reads the `#\t key: value` entries and the comment line count of a file.
pub fn read_header_lines(path: &Path) -> Result<RawHeader> {
    let file = File::open(path).map_err(|e| IngestError::open(path, e))?;
    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        lines.push(line.map_err(|e| IngestError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?);
    }
    parse_header(path, lines.iter().map(String::as_str))
}

/// Scans lines for comment entries.
///
/// Every line whose trimmed form starts with `#` counts toward the body
/// offset, wherever it appears. When no entry line is found the header is
/// empty and the offset is 0.
pub fn parse_header<'a>(path: &Path, lines: impl IntoIterator<Item = &'a str>) -> Result<RawHeader> {
    let mut entries = IndexMap::new();
    let mut comment_lines = 0usize;

    for (idx, line) in lines.into_iter().enumerate() {
        let line = if idx == 0 {
            line.strip_prefix(BOM).unwrap_or(line)
        } else {
            line
        };
        let stripped = line.trim();
        if stripped.starts_with(COMMENT_MARKER) {
            comment_lines += 1;
        }
        let Some(entry) = stripped.strip_prefix(ENTRY_MARKER) else {
            continue;
        };
        let (key, value) = parse_entry(entry).ok_or_else(|| IngestError::MalformedHeader {
            path: path.to_path_buf(),
            line: idx + 1,
            content: entry.to_string(),
        })?;
        entries.insert(key.to_string(), value.to_string());
    }

    if entries.is_empty() {
        return Ok(RawHeader::default());
    }
    Ok(RawHeader::new(entries, comment_lines))
}

/// Splits an entry on the first `": "`.
pub fn parse_entry(entry: &str) -> Option<(&str, &str)> {
    entry.split_once(KEY_VALUE_SEPARATOR)
}

/// Renders entries back into `#\t key: value` lines.
pub fn format_header(header: &RawHeader) -> String {
    let mut out = String::new();
    for (key, value) in header.iter() {
        out.push_str(ENTRY_MARKER);
        out.push_str(key);
        out.push_str(KEY_VALUE_SEPARATOR);
        out.push_str(value);
        out.push('\n');
    }
    out
}

/// Returns the last dotted segment of the `<...>` marker on the first line.
///
/// A first line without a marker yields an empty id and a warning; the
/// registry lookup downstream reports the failure.
pub fn extract_procedure_id(path: &Path) -> Result<String> {
    ensure_csv(path)?;
    let file = File::open(path).map_err(|e| IngestError::open(path, e))?;
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .map_err(|e| IngestError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(procedure_id_from_line(path, &first_line))
}

pub(crate) fn ensure_csv(path: &Path) -> Result<()> {
    if path.extension().and_then(|ext| ext.to_str()) == Some("csv") {
        Ok(())
    } else {
        Err(IngestError::InvalidFormat {
            path: path.to_path_buf(),
        })
    }
}

pub(crate) fn procedure_id_from_line(path: &Path, line: &str) -> String {
    let line = line.trim_start_matches(BOM).trim();
    match bracketed(line) {
        Some(content) => content.rsplit('.').next().unwrap_or_default().to_string(),
        None => {
            warn!(path = %path.display(), "no content found between < and >");
            String::new()
        }
    }
}

fn bracketed(line: &str) -> Option<&str> {
    let start = line.find('<')? + 1;
    let len = line[start..].find('>')?;
    Some(&line[start..start + len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tracing::Level;
    use tracing_subscriber::fmt::MakeWriter;

    /// In-memory log sink for asserting on emitted events.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn lines_at(&self, level: &str) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes)
                .lines()
                .filter(|line| line.trim_start().starts_with(level))
                .map(str::to_string)
                .collect()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, CapturedLogs) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(Level::WARN)
            .with_ansi(false)
            .without_time()
            .finish();
        let value = tracing::subscriber::with_default(subscriber, f);
        (value, logs)
    }

    fn parse(text: &str) -> Result<RawHeader> {
        parse_header(Path::new("test.csv"), text.lines())
    }

    #[test]
    fn test_data_key_uses_last_two_segments() {
        let key = extract_data_key(Path::new("a/b/c.csv")).unwrap();
        assert_eq!(key, "b/c");
        let key = extract_data_key(Path::new(
            "/home/user/data/01_raw/project_x/2024-11-29/ITt2024-11-29_1.csv",
        ))
        .unwrap();
        assert_eq!(key, "2024-11-29/ITt2024-11-29_1");
    }

    #[test]
    fn test_data_key_stem_stops_at_first_dot() {
        let key = extract_data_key(Path::new("day/run.v2.csv")).unwrap();
        assert_eq!(key, "day/run");
    }

    #[test]
    fn test_data_key_needs_two_segments() {
        let result = extract_data_key(Path::new("c.csv"));
        assert!(matches!(result, Err(IngestError::InvalidPath { .. })));
        let result = extract_data_key(&PathBuf::from("/"));
        assert!(matches!(result, Err(IngestError::InvalidPath { .. })));
    }

    #[test]
    fn test_parse_header_counts_all_comment_lines() {
        let header = parse(
            "#Procedure: <lab.instr.ITt>\n#Parameters:\n#\tVDS: 0.1 V\n#Metadata:\n#\tStart time: 1731364225.4\n#Data:\nt,I\n1,2\n",
        )
        .unwrap();
        assert_eq!(header.body_offset, 6);
        assert_eq!(header.get("VDS"), Some("0.1 V"));
        assert_eq!(header.get("Start time"), Some("1731364225.4"));
        assert_eq!(header.len(), 2);
    }

    #[test]
    fn test_parse_header_splits_on_first_separator() {
        let header = parse("#\tComment: note: with colon\n").unwrap();
        assert_eq!(header.get("Comment"), Some("note: with colon"));
    }

    #[test]
    fn test_parse_header_without_comments() {
        let header = parse("A,B\n1,2\n").unwrap();
        assert!(header.is_empty());
        assert_eq!(header.body_offset, 0);
    }

    #[test]
    fn test_parse_header_plain_comments_only() {
        let header = parse("#Procedure: <x.IV>\n#Data:\nA,B\n").unwrap();
        assert!(header.is_empty());
        assert_eq!(header.body_offset, 0);
    }

    #[test]
    fn test_parse_header_malformed_entry() {
        let result = parse("#Parameters:\n#\tVDS 0.1 V\n");
        match result {
            Err(IngestError::MalformedHeader { line, content, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(content, "VDS 0.1 V");
            }
            other => panic!("expected malformed header, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_header_strips_bom_and_indentation() {
        let header = parse("\u{feff}#\tA: 1\n  #\tB: 2  \n").unwrap();
        assert_eq!(header.get("A"), Some("1"));
        assert_eq!(header.get("B"), Some("2"));
        assert_eq!(header.body_offset, 2);
    }

    #[test]
    fn test_duplicate_key_keeps_last_value() {
        let header = parse("#\tA: 1\n#\tB: 2\n#\tA: 3\n").unwrap();
        assert_eq!(header.get("A"), Some("3"));
        assert_eq!(header.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_procedure_id_from_line() {
        let path = Path::new("x.csv");
        assert_eq!(procedure_id_from_line(path, "Result: <lab.instr.ITt>\n"), "ITt");
        assert_eq!(procedure_id_from_line(path, "#Procedure: <IVg>"), "IVg");
        assert_eq!(procedure_id_from_line(path, "<a.b> and <c.d>"), "b");
        assert_eq!(procedure_id_from_line(path, "no marker here"), "");
        assert_eq!(procedure_id_from_line(path, "unclosed <a.b"), "");
    }

    #[test]
    fn test_missing_marker_warns_once() {
        let path = Path::new("day/run.csv");
        let (id, logs) = with_captured_logs(|| procedure_id_from_line(path, "#Procedure: none"));
        assert_eq!(id, "");
        let warnings = logs.lines_at("WARN");
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].contains("no content found between < and >"), "{}", warnings[0]);
        assert!(warnings[0].contains("day/run.csv"), "{}", warnings[0]);

        let (id, logs) = with_captured_logs(|| procedure_id_from_line(path, "#P: <a.IV>"));
        assert_eq!(id, "IV");
        assert!(logs.lines_at("WARN").is_empty());
    }

    #[test]
    fn test_format_header_round_trips() {
        let header = parse("#Params:\n#\tVDS: 0.1 V\n#\tLaser toggle: True\n").unwrap();
        let reparsed = parse(&format_header(&header)).unwrap();
        assert_eq!(reparsed.entries, header.entries);
    }
}
