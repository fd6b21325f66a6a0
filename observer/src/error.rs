use derive_more::{Display, From};
use flume::{RecvError, SendError};
use observer_common::event::ParseError;
use tokio::task::JoinError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum Error {
	#[from(String, &String, &str)]
	Custom(String),
	EventSend(String),
	EventRecv(RecvError),
	EbpfProgNotFound(&'static str),
	EbpfMapNotFound(&'static str),

	// -- Ring records
	InvalidEventSize { expected: usize, actual: usize },
	UnknownEventType(u32),

	// -- BTF
	#[display("BTF blob has bad magic {_0:#06x}")]
	BtfBadMagic(u16),
	#[display("BTF blob truncated at {section}")]
	BtfTruncated { section: &'static str },
	BtfUnknownKind(u32),

	// -- Externals
	//
	#[from]
	JoinError(JoinError),
	#[from]
	AyaEbpf(aya::EbpfError),
	#[from]
	AyaMaps(aya::maps::MapError),
	#[from]
	AyaProgram(aya::programs::ProgramError),
	#[from]
	Io(std::io::Error),
	#[from]
	Json(serde_json::Error),
}

impl<T> From<SendError<T>> for Error {
	fn from(value: SendError<T>) -> Self {
		Self::EventSend(value.to_string())
	}
}

impl From<RecvError> for Error {
	fn from(err: RecvError) -> Self {
		Self::EventRecv(err)
	}
}

impl From<ParseError> for Error {
	fn from(err: ParseError) -> Self {
		match err {
			ParseError::Truncated { expected, actual } => Self::InvalidEventSize { expected, actual },
			ParseError::UnknownKind(kind) => Self::UnknownEventType(kind),
		}
	}
}

// region:    --- Custom

impl Error {
	pub fn custom(val: impl Into<String>) -> Self {
		Self::Custom(val.into())
	}
}

// endregion: --- Custom

// region:    --- Error Boilerplate

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
