mod inspect_view;
mod painter;
mod scan_view;
mod table;

pub(crate) use self::inspect_view::InspectReportView;
pub(crate) use self::painter::Painter;
pub(crate) use self::scan_view::{
    ScanOutcomeView, ScanReadyView, ScanSummaryView, record_type_label,
};
