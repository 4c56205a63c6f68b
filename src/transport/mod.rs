//! Capability boundary towards the USB driver stack.
//!
//! The engine only ever talks to devices through [`Transport`] (enumerate,
//! open) and [`EepromHandle`] (word access on an opened device). Access to
//! an opened device goes through [`ScopedHandle`], which closes the device
//! on every exit path.

use std::fmt;

pub mod usb;
pub mod words;

#[cfg(test)]
pub(crate) mod mock;

/// Snapshot of one attached chip, taken at enumeration time.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct DeviceDescriptor {
	/// position in the enumeration; used to open the device
	pub index: usize,
	/// vendor device class identifier, see `device_types`
	pub device_type: u32,
	pub vendor_id: u16,
	pub product_id: u16,
	pub description: String,
	pub serial_number: Option<String>,
}

impl DeviceDescriptor {
	pub fn table_header() -> String {
		format!("  {:<8}{:<32}{:<8}{:<8}{:<15}", "Index", "Description", "VID", "PID", "Serial number")
	}
}

/// One row of the device table, matching `table_header`.
impl fmt::Display for DeviceDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(
			f,
			"  {:<8}{:<32}{:<8}{:<8}{:<15}",
			self.index,
			self.description,
			format!("0x{:04x}", self.vendor_id),
			format!("0x{:04x}", self.product_id),
			self.serial_number.as_ref().map(String::as_str).unwrap_or("<None>"),
		)
	}
}

/// Word-level primitives on an opened device.
///
/// Implementations don't buffer or retry; that policy lives in the engine.
pub trait EepromHandle {
	fn read_word(&mut self, address: u16) -> crate::AResult<u16>;
	fn write_word(&mut self, address: u16, value: u16) -> crate::AResult<()>;
	fn erase_all(&mut self) -> crate::AResult<()>;

	/// Trigger USB re-enumeration; not every platform supports it.
	fn cycle_port(&mut self) -> crate::AResult<()>;

	fn close(&mut self) -> crate::AResult<()>;
}

pub trait Transport {
	type Handle: EepromHandle;

	fn enumerate(&mut self) -> crate::AResult<Vec<DeviceDescriptor>>;
	fn open(&mut self, index: usize) -> crate::AResult<Self::Handle>;
}

/// Opened device that gets closed when dropped.
#[derive(Debug)]
pub struct ScopedHandle<H: EepromHandle> {
	handle: Option<H>, // none once closed
	index: usize,
}

impl<H: EepromHandle> ScopedHandle<H> {
	pub fn new(handle: H, index: usize) -> Self {
		ScopedHandle {
			handle: Some(handle),
			index,
		}
	}

	pub fn get(&mut self) -> &mut H {
		match self.handle.as_mut() {
			Some(h) => h,
			None => unreachable!("handle only taken by close"),
		}
	}

	pub fn close(mut self) -> crate::AResult<()> {
		if let Some(mut h) = self.handle.take() {
			h.close()?;
		}
		Ok(())
	}
}

impl<H: EepromHandle> Drop for ScopedHandle<H> {
	fn drop(&mut self) {
		if let Some(mut h) = self.handle.take() {
			if let Err(e) = h.close() {
				error!("Device {}: failed to close: {}", self.index, e);
			}
		}
	}
}
