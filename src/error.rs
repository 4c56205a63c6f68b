use std::path::PathBuf;

/// Conditions the EEPROM engine and the orchestrator report to the operator.
///
/// These travel inside a `failure::Error`; callers that need to branch on
/// them use `err.downcast_ref::<EepromError>()`.
#[derive(Clone, Debug, PartialEq, Eq, Fail)]
pub enum EepromError {
	#[fail(display = "No FTDI devices connected")]
	EnumerationEmpty,

	#[fail(display = "Unknown or unsupported FTDI device type {}", code)]
	UnknownDeviceType { code: u32 },

	#[fail(display = "Device {} has no EEPROM", name)]
	NoEeprom { name: &'static str },

	#[fail(display = "Cannot open FTDI device {}: {}", index, reason)]
	DeviceOpenFailed { index: usize, reason: String },

	#[fail(display = "Input file size mismatch, expecting EEPROM size of {} bytes, got {} bytes", expected, found)]
	SizeMismatch { expected: usize, found: usize },

	#[fail(display = "EEPROM checksum mismatch: computed 0x{:04x}, image holds 0x{:04x}", expected, found)]
	ChecksumMismatch { expected: u16, found: u16 },

	#[fail(display = "EEPROM {} failed at word 0x{:02x}: {}", operation, address, reason)]
	Transport { operation: &'static str, address: u16, reason: String },

	#[fail(display = "EEPROM erase failed: {}", reason)]
	EraseFailed { reason: String },

	#[fail(display = "USB port cycle not supported: {}", reason)]
	PortCycleUnsupported { reason: String },

	#[fail(display = "Verify failed at word 0x{:02x}: expected {:04x}, EEPROM holds {:04x}", address, expected, found)]
	VerifyMismatch { address: u16, expected: u16, found: u16 },

	#[fail(display = "Invalid source file {:?}", path)]
	InvalidSourceFile { path: PathBuf },
}

impl EepromError {
	/// Conditions after which no further operation cycle can make progress.
	pub fn is_process_fatal(&self) -> bool {
		match self {
			EepromError::EnumerationEmpty => true,
			EepromError::InvalidSourceFile { .. } => true,
			_ => false,
		}
	}

	/// Wrap a transport failure for one word access.
	pub fn transport(operation: &'static str, address: u16, e: failure::Error) -> Self {
		EepromError::Transport {
			operation,
			address,
			reason: e.to_string(),
		}
	}
}

/// Find an `EepromError` anywhere in the cause chain of `e`.
pub fn find_eeprom_error(e: &failure::Error) -> Option<&EepromError> {
	e.iter_chain().filter_map(|cause| cause.downcast_ref::<EepromError>()).next()
}
