use std::fmt;

use crate::error::EepromError;

/// EEPROM size in bytes; always even, zero means the chip has no EEPROM.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EepromSize(pub usize);

impl EepromSize {
	pub fn bytes(&self) -> usize {
		self.0
	}

	pub fn is_absent(&self) -> bool {
		self.0 == 0
	}
}

impl fmt::Display for EepromSize {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{} bytes", self.0)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DeviceType {
	/// Device class identifier as reported by the driver (`FT_DEVICE_*`).
	pub code: u32,
	pub name: &'static str,
	pub eeprom_size: EepromSize,
}

const fn entry(code: u32, name: &'static str, size: usize) -> DeviceType {
	DeviceType {
		code,
		name,
		eeprom_size: EepromSize(size),
	}
}

pub const DEVICE_TYPES: [DeviceType; 13] = [
	entry(0, "FT232BM", 256),
	entry(1, "FT232AM", 0),
	entry(4, "FT2232C/D", 256),
	entry(5, "FT232R", 128),
	entry(6, "FT2232H", 256),
	entry(7, "FT4232H", 256),
	entry(8, "FT232H", 256),
	entry(9, "FTX_SERIES", 1024),
	entry(19, "FT2232HP", 256),
	entry(20, "FT4232HP", 256),
	entry(22, "FT232HP", 256),
	entry(23, "FT2232HA", 256),
	entry(24, "FT4232HA", 256),
];

pub fn lookup(code: u32) -> Result<&'static DeviceType, EepromError> {
	DEVICE_TYPES.iter()
		.find(|t| t.code == code)
		.ok_or(EepromError::UnknownDeviceType { code })
}

/// Size lookup; a zero size is a valid answer here, callers must stop on it.
pub fn size_for(code: u32) -> Result<EepromSize, EepromError> {
	lookup(code).map(|t| t.eeprom_size)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn documented_sizes() {
		let expected: &[(u32, usize)] = &[
			(0, 256), (1, 0), (4, 256), (5, 128), (6, 256), (7, 256), (8, 256),
			(9, 1024), (19, 256), (20, 256), (22, 256), (23, 256), (24, 256),
		];
		for &(code, size) in expected {
			assert_eq!(size_for(code), Ok(EepromSize(size)), "device type {}", code);
		}
		assert_eq!(DEVICE_TYPES.len(), expected.len());
	}

	#[test]
	fn unknown_codes() {
		for &code in &[2u32, 3, 10, 17, 18, 21, 25, 0xffff_ffff] {
			assert_eq!(size_for(code), Err(EepromError::UnknownDeviceType { code }));
		}
	}

	#[test]
	fn sizes_are_even_and_codes_unique() {
		for (i, t) in DEVICE_TYPES.iter().enumerate() {
			assert_eq!(t.eeprom_size.bytes() % 2, 0, "{}", t.name);
			assert!(DEVICE_TYPES[i + 1..].iter().all(|o| o.code != t.code), "duplicate code {}", t.code);
		}
	}

	#[test]
	fn only_am_has_no_eeprom() {
		let absent: Vec<_> = DEVICE_TYPES.iter().filter(|t| t.eeprom_size.is_absent()).collect();
		assert_eq!(absent.len(), 1);
		assert_eq!(absent[0].name, "FT232AM");
	}
}
