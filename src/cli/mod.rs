pub(crate) mod command;
pub(crate) mod inspect;
pub(crate) mod read;
pub(crate) mod scan;
pub(crate) mod ui;
pub(crate) mod write;

pub use self::command::{Args, Command, FakeArgs, LogLevel, OutputFormat};
pub use self::read::ReadArgs;
pub use self::write::WriteArgs;
