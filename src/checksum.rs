//! Vendor EEPROM checksum.
//!
//! Not a CRC: starting from `0xAAAA`, every little-endian word of the image
//! except the final one is XORed into the accumulator, which is then rotated
//! left by one bit. The final word of the image stores the result (low byte
//! first).

pub const SEED: u16 = 0xAAAA;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ChecksumStatus {
	Match,
	Mismatch {
		expected_low: u8,
		expected_high: u8,
		found_low: u8,
		found_high: u8,
	},
}

impl ChecksumStatus {
	pub fn expected(&self) -> Option<u16> {
		match *self {
			ChecksumStatus::Match => None,
			ChecksumStatus::Mismatch { expected_low, expected_high, .. } => Some(u16::from_le_bytes([expected_low, expected_high])),
		}
	}

	pub fn found(&self) -> Option<u16> {
		match *self {
			ChecksumStatus::Match => None,
			ChecksumStatus::Mismatch { found_low, found_high, .. } => Some(u16::from_le_bytes([found_low, found_high])),
		}
	}
}

/// Checksum over `body`, the image without its trailing checksum word.
///
/// A trailing odd byte is ignored.
pub fn checksum(body: &[u8]) -> u16 {
	body.chunks_exact(2).fold(SEED, |acc, word| {
		(acc ^ u16::from_le_bytes([word[0], word[1]])).rotate_left(1)
	})
}

fn split_trailer(image: &[u8]) -> (&[u8], [u8; 2]) {
	assert!(image.len() >= 2 && image.len() % 2 == 0, "EEPROM image must consist of at least one word");
	let (body, trailer) = image.split_at(image.len() - 2);
	(body, [trailer[0], trailer[1]])
}

/// Checksum for the body of a full image.
///
/// Like `validate` and `correct`, this panics unless `image` has an even
/// length of at least 2; callers check the image size against the device
/// first.
pub fn image_checksum(image: &[u8]) -> u16 {
	checksum(split_trailer(image).0)
}

/// Panics on odd or too short images, see `image_checksum`.
pub fn validate(image: &[u8]) -> ChecksumStatus {
	let (body, [found_low, found_high]) = split_trailer(image);
	let [expected_low, expected_high] = checksum(body).to_le_bytes();
	if (expected_low, expected_high) == (found_low, found_high) {
		ChecksumStatus::Match
	} else {
		ChecksumStatus::Mismatch {
			expected_low,
			expected_high,
			found_low,
			found_high,
		}
	}
}

/// Overwrite the trailing word with the computed checksum.
///
/// Panics on odd or too short images, see `image_checksum`.
pub fn correct(image: &mut [u8]) {
	let sum = image_checksum(image).to_le_bytes();
	let len = image.len();
	image[len - 2..].copy_from_slice(&sum);
}

#[cfg(test)]
pub(crate) mod test {
	use super::*;

	#[test]
	#[should_panic(expected = "at least one word")]
	fn odd_image_is_rejected() {
		validate(&[0u8; 127]);
	}

	#[test]
	#[should_panic(expected = "at least one word")]
	fn empty_image_is_rejected() {
		correct(&mut []);
	}

	/// FT232R image (manufacturer "FTDI", product "FT232R USB UART",
	/// serial "A50285BI") with a valid trailer.
	pub(crate) const FT232R_IMAGE: [u8; 128] = [
		0x00, 0x40, 0x03, 0x04, 0x01, 0x60, 0x00, 0x06, 0xa0, 0x2d, 0x08, 0x00, 0x00, 0x02, 0x98, 0x0a,
		0xa2, 0x20, 0xc2, 0x12, 0x23, 0x10, 0x05, 0x00, 0x0a, 0x03, 0x46, 0x00, 0x54, 0x00, 0x44, 0x00,
		0x49, 0x00, 0x20, 0x03, 0x46, 0x00, 0x54, 0x00, 0x32, 0x00, 0x33, 0x00, 0x32, 0x00, 0x52, 0x00,
		0x20, 0x00, 0x55, 0x00, 0x53, 0x00, 0x42, 0x00, 0x20, 0x00, 0x55, 0x00, 0x41, 0x00, 0x52, 0x00,
		0x54, 0x00, 0x12, 0x03, 0x41, 0x00, 0x35, 0x00, 0x30, 0x00, 0x32, 0x00, 0x38, 0x00, 0x35, 0x00,
		0x42, 0x00, 0x49, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
		0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
		0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x94, 0x72,
	];

	#[test]
	fn golden_ft232r_image() {
		assert_eq!(image_checksum(&FT232R_IMAGE), 0x7294);
		assert_eq!(validate(&FT232R_IMAGE), ChecksumStatus::Match);
	}

	#[test]
	fn small_vectors() {
		assert_eq!(checksum(&[]), SEED);
		assert_eq!(checksum(&[0x00, 0x00]), 0x5555);
		assert_eq!(checksum(&[0xaa, 0xaa]), 0x0000);
		// erased EEPROM: 0xAAAA ^ 0xFFFF = 0x5555, rotated back to 0xAAAA
		assert_eq!(image_checksum(&[0xff; 256]), 0xaaaa);
	}

	#[test]
	fn order_sensitive() {
		let mut swapped = FT232R_IMAGE;
		swapped.swap(0, 2);
		swapped.swap(1, 3);
		assert_ne!(image_checksum(&swapped), image_checksum(&FT232R_IMAGE));
	}

	#[test]
	fn mismatch_reports_both_values() {
		let mut image = FT232R_IMAGE;
		image[126] = 0x12;
		image[127] = 0x34;
		let status = validate(&image);
		assert_eq!(status, ChecksumStatus::Mismatch {
			expected_low: 0x94,
			expected_high: 0x72,
			found_low: 0x12,
			found_high: 0x34,
		});
		assert_eq!(status.expected(), Some(0x7294));
		assert_eq!(status.found(), Some(0x3412));
	}

	#[test]
	fn correct_rewrites_trailer_only() {
		let mut image = FT232R_IMAGE;
		image[126] = 0;
		image[127] = 0;
		correct(&mut image);
		assert_eq!(&image[..], &FT232R_IMAGE[..]);
	}

	#[test]
	fn single_word_image() {
		let mut image = [0x01, 0x02];
		correct(&mut image);
		assert_eq!(image, [0xaa, 0xaa]);
		assert_eq!(validate(&image), ChecksumStatus::Match);
	}
}
