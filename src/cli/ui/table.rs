use std::fmt::{self, Display, Formatter};

use tabled::{
    builder::Builder,
    settings::{Style as TableStyle, Width},
};
use terminal_size::{Width as TerminalWidth, terminal_size};

use super::painter::Painter;

/// Column headers shared by every field/value table.
const FIELD_VALUE_HEADERS: [&str; 2] = ["field", "value"];

/// A structured table that renders via `Display`.
///
/// The header row is stored as the first record; `tabled` draws the
/// separator line beneath it.
#[derive(Debug)]
pub(crate) struct Table {
    records: Vec<Vec<String>>,
}

impl Table {
    /// Creates a table with column headers and data rows.
    pub(crate) fn grid(
        headers: impl IntoIterator<Item = impl Into<String>>,
        rows: Vec<Vec<String>>,
    ) -> Self {
        let mut records = Vec::with_capacity(rows.len() + 1);
        records.push(headers.into_iter().map(Into::into).collect());
        records.extend(rows);
        Self { records }
    }

    /// Creates a two-column field/value table with muted field names.
    pub(crate) fn key_value(painter: &Painter, rows: Vec<(&str, String)>) -> Self {
        Self::grid(
            FIELD_VALUE_HEADERS,
            rows.into_iter()
                .map(|(field, value)| vec![painter.muted(field), value])
                .collect(),
        )
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut builder = Builder::default();
        for record in &self.records {
            builder.push_record(record);
        }
        let mut table = builder.build();
        table.with(TableStyle::rounded());
        // Long hex payloads would otherwise wrap mid-border on narrow terminals.
        if let Some((TerminalWidth(columns), _)) = terminal_size() {
            table.with(Width::truncate(columns as usize));
        }
        write!(f, "{table}")
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn grid_tables_draw_a_header_separator() {
        let table = Table::grid(
            ["type", "text"],
            vec![
                vec!["text".into(), "hi".into()],
                vec!["uri".into(), "https://example.com".into()],
            ],
        );
        assert_snapshot!("grid_table", table.to_string());
    }

    #[test]
    fn key_value_tables_pair_fields_with_values() {
        let painter = Painter::new(false);
        let table = Table::key_value(
            &painter,
            vec![
                ("reader", "fake-reader-0".into()),
                ("kind", "mifare".into()),
            ],
        );
        assert_snapshot!("key_value_table", table.to_string());
    }
}
