mod fake_backend;
mod hardware;
mod model;
mod pcsc_backend;

pub(crate) use self::fake_backend::{FakeBackendConfig, HexPayload, TagFixture};
pub use self::hardware::{ConnectedTag, HardwareClient, PreparedPollSession};
pub(crate) use self::hardware::{fake_hardware_client, real_hardware_client};
pub use self::model::{
    DetectionEvent, InspectReport, NdefStatus, ScanRunSummary, ScanStopReason, StatusReport,
    TagData, TagHandle, TagKind,
};
