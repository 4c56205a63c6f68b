//! Property tests for the checksum trailer and the word packing.

use ftdi_eeprom_flash::checksum::{
	self,
	ChecksumStatus,
};
use ftdi_eeprom_flash::transport::words::{
	pack_word,
	unpack_word,
};
use proptest::prelude::*;

/// Images of even length between 2 and 1024 bytes.
fn image_strategy() -> impl Strategy<Value = Vec<u8>> {
	(1usize..=512).prop_flat_map(|words| proptest::collection::vec(any::<u8>(), 2 * words))
}

proptest! {
	#[test]
	fn corrected_image_validates(mut image in image_strategy()) {
		checksum::correct(&mut image);
		prop_assert_eq!(checksum::validate(&image), ChecksumStatus::Match);
	}

	#[test]
	fn correct_only_touches_trailer(image in image_strategy()) {
		let mut corrected = image.clone();
		checksum::correct(&mut corrected);
		let body = image.len() - 2;
		prop_assert_eq!(&corrected[..body], &image[..body]);
	}

	#[test]
	fn damaged_trailer_is_detected(mut image in image_strategy(), flip in 1u8..) {
		checksum::correct(&mut image);
		let last = image.len() - 1;
		image[last] ^= flip;
		match checksum::validate(&image) {
			ChecksumStatus::Mismatch { .. } => (),
			ChecksumStatus::Match => prop_assert!(false, "flipped trailer still matches"),
		}
	}

	#[test]
	fn word_packing_round_trips(image in image_strategy()) {
		let mut back = vec![0u8; image.len()];
		for index in 0..image.len() / 2 {
			unpack_word(&mut back, index, pack_word(&image, index));
		}
		prop_assert_eq!(back, image);
	}
}
