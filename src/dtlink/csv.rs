//! Delimiter sniffing for the tabular data preview.
//!
//! The delimiter is decided once, from the header row: more commas than tabs means
//! comma-separated (spaces and tabs around the comma are ignored), anything else means
//! whitespace-separated. Every data row is split with that same delimiter; rows that end up
//! with a different number of fields than the header are flagged but still shown. Blank and
//! `#` comment lines are dropped before the header is picked.

use crate::codec::filter_data_rows;
use once_cell::sync::Lazy;
use regex::Regex;

static COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]*,[ \t]*").expect("comma pattern is valid"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+").expect("whitespace pattern is valid"));
static MULTI_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w.*[\r\n]+.*\w").expect("row pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Whitespace,
}

impl Delimiter {
    pub fn sniff(header: &str) -> Self {
        let tabs = header.matches('\t').count();
        let commas = header.matches(',').count();
        if commas > tabs {
            Delimiter::Comma
        } else {
            Delimiter::Whitespace
        }
    }

    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        let pattern = match self {
            Delimiter::Comma => &*COMMA,
            Delimiter::Whitespace => &*WHITESPACE,
        };
        pattern.split(line.trim()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRow {
    /// Always exactly as many cells as the header; short rows are padded with "".
    pub cells: Vec<String>,
    pub field_count: usize,
    pub mismatched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPreview {
    pub delimiter: Delimiter,
    pub header: Vec<String>,
    pub rows: Vec<PreviewRow>,
}

impl CsvPreview {
    pub fn mismatched_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.mismatched).count()
    }
}

/// Builds a preview, or `None` when the data does not have a header and at least one row.
pub fn preview(data: &str) -> Option<CsvPreview> {
    let data = filter_data_rows(data);
    if !MULTI_ROW.is_match(&data) {
        return None;
    }

    let mut lines = data.lines();
    let header_line = lines.next()?;
    let delimiter = Delimiter::sniff(header_line);
    let header: Vec<String> = delimiter
        .split(header_line)
        .into_iter()
        .map(str::to_string)
        .collect();

    let rows = lines
        .map(|line| {
            let fields = delimiter.split(line);
            let cells = (0..header.len())
                .map(|i| fields.get(i).map(|f| f.to_string()).unwrap_or_default())
                .collect();
            PreviewRow {
                cells,
                field_count: fields.len(),
                mismatched: fields.len() != header.len(),
            }
        })
        .collect();

    Some(CsvPreview {
        delimiter,
        header,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff() {
        assert_eq!(Delimiter::sniff("a,b,c"), Delimiter::Comma);
        assert_eq!(Delimiter::sniff("a\tb\tc"), Delimiter::Whitespace);
        assert_eq!(Delimiter::sniff("a b c"), Delimiter::Whitespace);
        // tie goes to whitespace
        assert_eq!(Delimiter::sniff("a,b\tc"), Delimiter::Whitespace);
    }

    #[test]
    fn test_split() {
        assert_eq!(Delimiter::Comma.split("a , b,\tc"), vec!["a", "b", "c"]);
        assert_eq!(Delimiter::Whitespace.split("a \t b\t\tc"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_short_row_flagged_but_rendered() {
        let preview = preview("a,b,c\n1,2,3\n4,5").unwrap();
        assert_eq!(preview.delimiter, Delimiter::Comma);
        assert_eq!(preview.header, vec!["a", "b", "c"]);
        assert!(!preview.rows[0].mismatched);
        assert!(preview.rows[1].mismatched);
        assert_eq!(preview.rows[1].cells, vec!["4", "5", ""]);
        assert_eq!(preview.mismatched_rows(), 1);
    }

    #[test]
    fn test_delimiter_not_reevaluated_per_row() {
        let preview = preview("a\tb\n1,2\n3\t4").unwrap();
        assert_eq!(preview.delimiter, Delimiter::Whitespace);
        assert!(preview.rows[0].mismatched);
        assert!(!preview.rows[1].mismatched);
    }

    #[test]
    fn test_blank_rows_skipped() {
        let preview = preview("a,b\n\n1,2\n   \n3,4\n").unwrap();
        assert_eq!(preview.rows.len(), 2);
    }

    #[test]
    fn test_comment_lines_skipped() {
        let preview = preview("# hosts\na,b\n  # note\n1,2\n#3,4\n5,6").unwrap();
        assert_eq!(preview.delimiter, Delimiter::Comma);
        assert_eq!(preview.header, vec!["a", "b"]);
        assert_eq!(preview.rows.len(), 2);
        assert_eq!(preview.mismatched_rows(), 0);
        assert_eq!(preview.rows[1].cells, vec!["5", "6"]);

        // a header followed only by comments has nothing to show
        assert!(super::preview("a,b\n# 1,2").is_none());
    }

    #[test]
    fn test_header_only_has_no_preview() {
        assert!(preview("a,b,c").is_none());
        assert!(preview("").is_none());
    }
}
