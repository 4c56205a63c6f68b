//! Byte image <-> EEPROM word conversion.
//!
//! Word `i` is stored little endian in image bytes `2i` (low) and `2i + 1`
//! (high).

use crate::error::EepromError;

use super::EepromHandle;

pub fn pack_word(image: &[u8], index: usize) -> u16 {
	u16::from_le_bytes([image[2 * index], image[2 * index + 1]])
}

pub fn unpack_word(image: &mut [u8], index: usize, word: u16) {
	image[2 * index..2 * index + 2].copy_from_slice(&word.to_le_bytes());
}

/// Fill `image` from EEPROM word 0 onwards.
pub fn read_into<H>(handle: &mut H, image: &mut [u8]) -> crate::AResult<()>
where
	H: EepromHandle + ?Sized,
{
	for index in 0..image.len() / 2 {
		let address = index as u16;
		let word = handle.read_word(address)
			.map_err(|e| EepromError::transport("read", address, e))?;
		trace!("EEPROM read  @{:02x}: {:04x}", address, word);
		unpack_word(image, index, word);
	}
	Ok(())
}

pub fn write_from<H>(handle: &mut H, image: &[u8]) -> crate::AResult<()>
where
	H: EepromHandle + ?Sized,
{
	for index in 0..image.len() / 2 {
		let address = index as u16;
		let word = pack_word(image, index);
		trace!("EEPROM write @{:02x}: {:04x}", address, word);
		handle.write_word(address, word)
			.map_err(|e| EepromError::transport("write", address, e))?;
	}
	Ok(())
}

/// Read the EEPROM back and compare it against `image`; fails on the first
/// differing word, otherwise returns what was read.
pub fn verify<H>(handle: &mut H, image: &[u8]) -> crate::AResult<Vec<u8>>
where
	H: EepromHandle + ?Sized,
{
	let mut back = vec![0u8; image.len()];
	for index in 0..image.len() / 2 {
		let address = index as u16;
		let expected = pack_word(image, index);
		let found = handle.read_word(address)
			.map_err(|e| EepromError::transport("verify", address, e))?;
		if found != expected {
			return Err(EepromError::VerifyMismatch { address, expected, found }.into());
		}
		unpack_word(&mut back, index, found);
	}
	Ok(back)
}

pub fn erase<H>(handle: &mut H) -> crate::AResult<()>
where
	H: EepromHandle + ?Sized,
{
	handle.erase_all().map_err(|e| EepromError::EraseFailed { reason: e.to_string() })?;
	Ok(())
}
