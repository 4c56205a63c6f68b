//! Read, write and erase flows against one selected device.
//!
//! Every flow first sizes the device from its type code, so devices without
//! (known) EEPROM are rejected before they get opened. A device is open
//! only while its flow touches hardware and is closed on every exit path.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{
	Duration,
	Instant,
};

use crate::checksum;
use crate::device_types::{
	self,
	DeviceType,
};
use crate::error::EepromError;
use crate::hexdump::hexdump;
use crate::options::Options;
use crate::transport::words;
use crate::transport::{
	DeviceDescriptor,
	EepromHandle,
	ScopedHandle,
	Transport,
};

/// What a confirmation is about, so non-interactive front ends can answer
/// without parsing the message.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ConfirmKind {
	/// a file exists where the read image is going to be saved
	OverwriteTarget,
	/// the EEPROM is about to be overwritten
	WriteCaution,
	/// the EEPROM is about to be erased
	EraseReset,
	/// the image checksum doesn't match; write it anyway?
	ChecksumProceed,
	/// replace the image checksum with the computed one?
	ChecksumCorrect,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Confirmation {
	pub kind: ConfirmKind,
	pub message: String,
}

impl Confirmation {
	pub fn new<S: Into<String>>(kind: ConfirmKind, message: S) -> Self {
		Confirmation {
			kind,
			message: message.into(),
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PortCycle {
	/// device re-enumerated and had time to settle
	Cycled,
	/// cycling failed; the operator has to reconnect the device
	ManualReconnect,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum OperationOutcome {
	/// `port_cycle` is none for flows that don't cycle (read)
	Success { port_cycle: Option<PortCycle> },
	Aborted,
	Failed(String),
}

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

/// Cycle the USB port; failures are downgraded to an operator advisory.
fn cycle_port<H: EepromHandle + ?Sized>(handle: &mut H, index: usize, options: &Options) -> PortCycle {
	if options.verbose {
		info!("Cycling the USB port. Please wait...");
	}
	match handle.cycle_port() {
		Ok(()) => {
			reliable_sleep(options.settle_time);
			PortCycle::Cycled
		},
		Err(e) => {
			let e = EepromError::PortCycleUnsupported { reason: e.to_string() };
			warn!("Device {}: {}", index, e);
			warn!("Disconnect and reconnect the device manually to apply the new EEPROM contents.");
			PortCycle::ManualReconnect
		},
	}
}

fn save_image(path: &Path, image: &[u8]) -> crate::AResult<()> {
	with_context!(("couldn't save EEPROM image to {:?}", path), {
		if let Some(parent) = path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent)?;
			}
		}
		fs::write(path, image)?;
		Ok(())
	})
}

fn load_image(path: &Path) -> crate::AResult<Vec<u8>> {
	with_context!(("couldn't load EEPROM image from {:?}", path), {
		Ok(fs::read(path)?)
	})
}

pub struct Engine<T: Transport> {
	transport: T,
	options: Options,
}

impl<T: Transport> Engine<T> {
	pub fn new(transport: T, options: Options) -> Self {
		Engine {
			transport,
			options,
		}
	}

	pub fn options(&self) -> &Options {
		&self.options
	}

	pub fn enumerate(&mut self) -> crate::AResult<Vec<DeviceDescriptor>> {
		self.transport.enumerate()
	}

	/// Resolve the device's chip type; fails for unknown types and for chips
	/// without EEPROM.
	pub fn size_device(&self, device: &DeviceDescriptor) -> crate::AResult<&'static DeviceType> {
		let device_type = device_types::lookup(device.device_type)?;
		if self.options.verbose {
			info!("Detected FTDI device {} which has an EEPROM size of {}.", device_type.name, device_type.eeprom_size);
		}
		if device_type.eeprom_size.is_absent() {
			return Err(EepromError::NoEeprom { name: device_type.name }.into());
		}
		Ok(device_type)
	}

	/// Run `f` on the opened device; the device is closed afterwards, also
	/// when `f` fails.
	fn with_device<F, R>(&mut self, device: &DeviceDescriptor, f: F) -> crate::AResult<R>
	where
		F: FnOnce(&mut T::Handle, &Options) -> crate::AResult<R>,
	{
		let handle = self.transport.open(device.index).map_err(|e| {
			EepromError::DeviceOpenFailed { index: device.index, reason: e.to_string() }
		})?;
		let mut handle = ScopedHandle::new(handle, device.index);
		let result = f(handle.get(), &self.options)?;
		handle.close()?;
		Ok(result)
	}

	pub fn read_image(&mut self, device: &DeviceDescriptor) -> crate::AResult<Vec<u8>> {
		let size = self.size_device(device)?.eeprom_size;
		let mut image = vec![0u8; size.bytes()];
		self.with_device(device, |h, _| words::read_into(h, &mut image))?;
		Ok(image)
	}

	/// Read the raw EEPROM into `path`; the checksum is not looked at.
	pub fn read_to_file(&mut self, device: &DeviceDescriptor, path: &Path) -> crate::AResult<OperationOutcome> {
		let image = self.read_image(device)?;
		save_image(path, &image)?;
		if self.options.verbose {
			info!("EEPROM contents:\n{}", hexdump(&image));
			let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
			info!("Read done. Saved to {}.", path.display());
		}
		Ok(OperationOutcome::Success { port_cycle: None })
	}

	pub fn write_from_file<C>(&mut self, device: &DeviceDescriptor, path: &Path, confirm: &mut C) -> crate::AResult<OperationOutcome>
	where
		C: FnMut(&Confirmation) -> bool,
	{
		let image = load_image(path)?;
		self.write_image(device, image, confirm)
	}

	/// Write `image` to the device, then cycle the port.
	///
	/// A checksum mismatch is put to `confirm`: declining aborts before the
	/// device is opened; proceeding asks separately whether to fix the
	/// checksum or to write the image as it is.
	pub fn write_image<C>(&mut self, device: &DeviceDescriptor, mut image: Vec<u8>, confirm: &mut C) -> crate::AResult<OperationOutcome>
	where
		C: FnMut(&Confirmation) -> bool,
	{
		let size = self.size_device(device)?.eeprom_size;
		if image.len() != size.bytes() {
			return Err(EepromError::SizeMismatch { expected: size.bytes(), found: image.len() }.into());
		}

		let status = checksum::validate(&image);
		if let (Some(expected), Some(found)) = (status.expected(), status.found()) {
			let mismatch = EepromError::ChecksumMismatch { expected, found };
			warn!("{}", mismatch);
			let proceed = Confirmation::new(ConfirmKind::ChecksumProceed, format!(
				"WARNING: {}.\nWriting an image with an invalid checksum can cause enumeration failures.",
				mismatch,
			));
			if !confirm(&proceed) {
				info!("Write operation aborted.");
				return Ok(OperationOutcome::Aborted);
			}
			let correct = Confirmation::new(ConfirmKind::ChecksumCorrect, format!(
				"Replace the image checksum 0x{:04x} with the computed checksum 0x{:04x}?",
				found, expected,
			));
			if confirm(&correct) {
				checksum::correct(&mut image);
				info!("Checksum corrected to 0x{:04x}.", expected);
			} else {
				warn!("Writing image with mismatching checksum 0x{:04x}.", found);
			}
		}
		let index = device.index;
		let port_cycle = self.with_device(device, |h, options| {
			words::write_from(h, &image)?;
			let back = if options.verify_after_write {
				Some(words::verify(h, &image)?)
			} else {
				None
			};
			if options.verbose {
				let back = match back {
					Some(back) => back,
					None => {
						let mut back = vec![0u8; image.len()];
						words::read_into(h, &mut back)?;
						back
					},
				};
				info!("Write done. Current EEPROM dump:\n{}", hexdump(&back));
			}
			Ok(cycle_port(h, index, options))
		})?;

		Ok(OperationOutcome::Success { port_cycle: Some(port_cycle) })
	}

	/// Erase the whole EEPROM, then cycle the port.
	pub fn erase(&mut self, device: &DeviceDescriptor) -> crate::AResult<OperationOutcome> {
		self.size_device(device)?;
		let index = device.index;
		let port_cycle = self.with_device(device, |h, options| {
			words::erase(h)?;
			Ok(cycle_port(h, index, options))
		})?;
		Ok(OperationOutcome::Success { port_cycle: Some(port_cycle) })
	}
}
