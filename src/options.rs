use std::time::Duration;

/// Delay after a successful port cycle; the device doesn't answer until it
/// has re-enumerated.
pub const DEFAULT_SETTLE_TIME: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Options {
	/// hexdumps and progress messages
	pub verbose: bool,
	/// read the EEPROM back after writing and compare
	pub verify_after_write: bool,
	pub settle_time: Duration,
}

impl Default for Options {
	fn default() -> Self {
		Options {
			verbose: true,
			verify_after_write: true,
			settle_time: DEFAULT_SETTLE_TIME,
		}
	}
}
