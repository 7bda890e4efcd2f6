//! Minimal tab-separated reader shared by declaration sheets and data sources.
//!
//! Fields are split on `\t` with no quoting, matching how the sheets are
//! exported. A trailing `\r` is dropped from every line.

use indexmap::IndexMap;

/// One data line of a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsvRecord {
    /// 1-based line number in the file.
    pub line: usize,
    /// Raw fields, in header order.
    pub fields: Vec<String>,
}

/// A parsed sheet: header plus records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TsvSheet {
    /// 1-based line of the header, 0 when the sheet is empty.
    pub header_line: usize,
    pub headers: Vec<String>,
    pub records: Vec<TsvRecord>,
}

impl TsvSheet {
    /// Split text into a header and records. Blank lines are skipped.
    ///
    /// Field counts are not checked here; callers decide how a short or long
    /// record is treated.
    pub fn parse(text: &str) -> Self {
        let mut lines = text
            .split('\n')
            .enumerate()
            .map(|(i, line)| (i + 1, line.strip_suffix('\r').unwrap_or(line)));

        let (header_line, headers) = match lines.by_ref().find(|(_, line)| !line.trim().is_empty()) {
            Some((line, header)) => (line, split_fields(header)),
            None => return Self::default(),
        };

        let records = lines
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(line, text)| TsvRecord {
                line,
                fields: split_fields(text),
            })
            .collect();

        Self {
            header_line,
            headers,
            records,
        }
    }

    /// 1-based data row of a record: its distance from the header line, so
    /// blank lines still count.
    pub fn data_row(&self, record: &TsvRecord) -> usize {
        record.line - self.header_line
    }

    /// Get the index of a header.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Check if the sheet has no header.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterate records as header → value maps. Missing trailing fields read as empty.
    pub fn rows(&self) -> impl Iterator<Item = (usize, IndexMap<&str, &str>)> + '_ {
        self.records.iter().map(move |record| {
            let row = self
                .headers
                .iter()
                .enumerate()
                .map(|(i, h)| {
                    (
                        h.as_str(),
                        record.fields.get(i).map(String::as_str).unwrap_or(""),
                    )
                })
                .collect();
            (record.line, row)
        })
    }
}

/// Split one line into fields.
pub fn split_fields(line: &str) -> Vec<String> {
    line.split('\t').map(str::to_string).collect()
}

/// Join fields into one line. Tabs and newlines inside values are replaced by spaces.
pub fn join_fields<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| f.as_ref().replace(['\t', '\n', '\r'], " "))
        .collect::<Vec<_>>()
        .join("\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_sheet() {
        let sheet = TsvSheet::parse("id\tage\n1\t17\n2\t25\n");
        assert_eq!(sheet.headers, vec!["id", "age"]);
        assert_eq!(sheet.records.len(), 2);
        assert_eq!(sheet.records[0].line, 2);
        assert_eq!(sheet.records[1].fields, vec!["2", "25"]);
    }

    #[test]
    fn test_parse_crlf_and_blank_lines() {
        let sheet = TsvSheet::parse("id\tage\r\n\r\n1\t\r\n");
        assert_eq!(sheet.headers, vec!["id", "age"]);
        assert_eq!(sheet.records.len(), 1);
        assert_eq!(sheet.records[0].line, 3);
        assert_eq!(sheet.records[0].fields, vec!["1", ""]);
        assert_eq!(sheet.data_row(&sheet.records[0]), 2);
    }

    #[test]
    fn test_data_row_after_leading_blank_line() {
        let sheet = TsvSheet::parse("\nid\n1\n\n3\n");
        assert_eq!(sheet.header_line, 2);
        let rows: Vec<usize> = sheet.records.iter().map(|r| sheet.data_row(r)).collect();
        assert_eq!(rows, vec![1, 3]);
    }

    #[test]
    fn test_parse_empty() {
        let sheet = TsvSheet::parse("\n\n");
        assert!(sheet.is_empty());
        assert!(sheet.records.is_empty());
    }

    #[test]
    fn test_rows_pads_missing_fields() {
        let sheet = TsvSheet::parse("a\tb\tc\nx\n");
        let (line, row) = sheet.rows().next().unwrap();
        assert_eq!(line, 2);
        assert_eq!(row["a"], "x");
        assert_eq!(row["c"], "");
    }

    #[test]
    fn test_join_fields() {
        assert_eq!(join_fields(["a", "b\tc", ""]), "a\tb c\t");
    }
}
