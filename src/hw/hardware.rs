use async_trait::async_trait;
use tracing::info;

use super::fake_backend::{FakeBackend, FakeBackendConfig, FakeConnectedTag, FakePollSession};
use super::model::{DetectionEvent, StatusReport, TagHandle, TagKind};
use super::pcsc_backend::{PcscBackend, RealConnectedTag, RealPollSession};
use crate::error::TagError;

/// Builds a hardware client for the attached PC/SC readers.
pub(crate) fn real_hardware_client() -> Result<Box<dyn HardwareClient>, TagError> {
    Ok(Box::new(RealHardwareClient::new()?))
}

/// Builds a hardware client backed by fixture tags.
pub(crate) fn fake_hardware_client(config: FakeBackendConfig) -> Box<dyn HardwareClient> {
    info!("using fake tag backend");
    Box::new(FakeHardwareClient::new(config))
}

#[async_trait]
pub trait HardwareClient: Send + Sync {
    /// Reports whether the backend can reach its reader hardware.
    async fn availability(&self) -> Result<(), TagError>;

    /// Starts tag polling and hands back the running session.
    async fn begin_polling(self: Box<Self>) -> Result<PreparedPollSession, TagError>;
}

struct RealHardwareClient {
    backend: PcscBackend,
}

impl RealHardwareClient {
    fn new() -> Result<Self, TagError> {
        Ok(Self {
            backend: PcscBackend::new()?,
        })
    }
}

#[async_trait]
impl HardwareClient for RealHardwareClient {
    async fn availability(&self) -> Result<(), TagError> {
        self.backend.availability()
    }

    async fn begin_polling(self: Box<Self>) -> Result<PreparedPollSession, TagError> {
        let session = self.backend.begin_polling()?;
        Ok(PreparedPollSession {
            session: PollSession::Real(session),
        })
    }
}

struct FakeHardwareClient {
    backend: FakeBackend,
}

impl FakeHardwareClient {
    fn new(config: FakeBackendConfig) -> Self {
        Self {
            backend: FakeBackend::new(config),
        }
    }
}

#[async_trait]
impl HardwareClient for FakeHardwareClient {
    async fn availability(&self) -> Result<(), TagError> {
        self.backend.availability()
    }

    async fn begin_polling(self: Box<Self>) -> Result<PreparedPollSession, TagError> {
        let Self { backend } = *self;
        let session = backend.begin_polling()?;
        Ok(PreparedPollSession {
            session: PollSession::Fake(session),
        })
    }
}

/// A running polling session ready to surface tags.
pub struct PreparedPollSession {
    session: PollSession,
}

impl PreparedPollSession {
    /// Waits for the next polling round that surfaces tags.
    ///
    /// Returns `None` once polling ends on the backend side.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend loses its readers mid-poll.
    pub async fn next_detection(&mut self) -> Result<Option<DetectionEvent>, TagError> {
        match &mut self.session {
            PollSession::Real(real) => real.next_detection().await,
            PollSession::Fake(fake) => fake.next_detection().await,
        }
    }

    /// Connects to one detected tag.
    ///
    /// # Errors
    ///
    /// Returns an error when the tag left the field or the reader refused
    /// the connection.
    pub async fn connect_tag(&self, handle: TagHandle) -> Result<ConnectedTag, TagError> {
        match &self.session {
            PollSession::Real(real) => Ok(ConnectedTag {
                link: TagLink::Real(real.connect_tag(handle)?),
            }),
            PollSession::Fake(fake) => Ok(ConnectedTag {
                link: TagLink::Fake(fake.connect_tag(handle)?),
            }),
        }
    }

    /// Ends polling and tears the session down.
    pub async fn end(self) {
        info!("ending tag polling");
        match self.session {
            PollSession::Real(real) => real.end(),
            PollSession::Fake(fake) => fake.end(),
        }
    }
}

enum PollSession {
    Real(RealPollSession),
    Fake(FakePollSession),
}

/// A tag connected through a polling session.
pub struct ConnectedTag {
    link: TagLink,
}

impl ConnectedTag {
    /// Returns the name of the reader holding the tag.
    #[must_use]
    pub fn reader(&self) -> &str {
        match &self.link {
            TagLink::Real(real) => real.reader(),
            TagLink::Fake(fake) => fake.reader(),
        }
    }

    /// Returns the tag's radio family.
    #[must_use]
    pub fn kind(&self) -> TagKind {
        match &self.link {
            TagLink::Real(real) => real.kind(),
            TagLink::Fake(fake) => fake.kind(),
        }
    }

    /// Returns the tag UID bytes as reported by the reader.
    #[must_use]
    pub fn uid(&self) -> &[u8] {
        match &self.link {
            TagLink::Real(real) => real.uid(),
            TagLink::Fake(fake) => fake.uid(),
        }
    }

    /// Queries the tag's NDEF capability and capacity.
    ///
    /// # Errors
    ///
    /// Returns an error when the capability query itself fails; a tag
    /// without NDEF support reports [`NdefStatus::NotSupported`] instead.
    ///
    /// [`NdefStatus::NotSupported`]: super::model::NdefStatus::NotSupported
    pub async fn query_status(&self) -> Result<StatusReport, TagError> {
        match &self.link {
            TagLink::Real(real) => real.query_status(),
            TagLink::Fake(fake) => fake.query_status(),
        }
    }

    /// Reads the stored NDEF message bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::EmptyTag`] when the tag holds no message, and
    /// other variants when the read itself fails.
    pub async fn read_message_bytes(&self) -> Result<Vec<u8>, TagError> {
        match &self.link {
            TagLink::Real(real) => real.read_message_bytes(),
            TagLink::Fake(fake) => fake.read_message_bytes(),
        }
    }

    /// Writes NDEF message bytes to the tag.
    ///
    /// # Errors
    ///
    /// Returns an error when the message exceeds the tag capacity or the
    /// tag rejects the write.
    pub async fn write_message_bytes(&self, bytes: &[u8]) -> Result<(), TagError> {
        match &self.link {
            TagLink::Real(real) => real.write_message_bytes(bytes),
            TagLink::Fake(fake) => fake.write_message_bytes(bytes),
        }
    }
}

enum TagLink {
    Real(RealConnectedTag),
    Fake(FakeConnectedTag),
}
