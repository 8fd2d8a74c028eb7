use std::fmt::{self, Display, Formatter};

use crate::hw::{InspectReport, NdefStatus};
use crate::utils::format_hex;

use super::painter::Painter;
use super::table::Table;

/// Renders an inspect report as a field/value table.
pub(crate) struct InspectReportView<'a> {
    report: &'a InspectReport,
    painter: &'a Painter,
}

impl<'a> InspectReportView<'a> {
    pub(crate) fn new(report: &'a InspectReport, painter: &'a Painter) -> Self {
        Self { report, painter }
    }

    fn status_value(&self) -> String {
        let status = self.report.status();
        match status {
            NdefStatus::ReadWrite => self.painter.success(status.to_string()),
            NdefStatus::ReadOnly | NdefStatus::NotSupported => {
                self.painter.warning(status.to_string())
            }
        }
    }

    fn capacity_value(&self) -> String {
        if self.report.status() == NdefStatus::NotSupported {
            self.painter.warning("<none>")
        } else {
            self.painter
                .value(format!("{} B", self.report.capacity_bytes()))
        }
    }
}

impl Display for InspectReportView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let report_table = Table::key_value(
            self.painter,
            vec![
                ("reader", self.painter.value(self.report.reader())),
                ("kind", self.painter.value(self.report.kind().to_string())),
                ("uid", self.painter.value(format_hex(self.report.uid()))),
                ("ndef", self.status_value()),
                ("capacity", self.capacity_value()),
            ],
        );

        write!(f, "{}", self.painter.heading("Inspected tag:"))?;
        write!(f, "\n{report_table}")
    }
}
