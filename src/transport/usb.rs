//! FTDI devices on the local USB bus.
//!
//! EEPROM access uses the chip's vendor control requests; the port cycle is
//! a USB reset, which makes the device re-enumerate with its new settings.

use std::time::Duration;

use nusb::transfer::{
	ControlIn,
	ControlOut,
	ControlType,
	Recipient,
};
use nusb::{
	DeviceInfo,
	MaybeFuture,
};

use super::{
	DeviceDescriptor,
	EepromHandle,
	Transport,
};

pub const FTDI_VID: u16 = 0x0403;

const SIO_READ_EEPROM_REQUEST: u8 = 0x90;
const SIO_WRITE_EEPROM_REQUEST: u8 = 0x91;
const SIO_ERASE_EEPROM_REQUEST: u8 = 0x92;

const CONTROL_TIMEOUT: Duration = Duration::from_secs(5);

/// `FT_DEVICE_UNKNOWN`
pub const DEVICE_TYPE_UNKNOWN: u32 = 3;

/// Map the USB release number (bcdDevice) to the driver's device type code.
pub fn device_type_from_release(bcd_device: u16, has_serial: bool) -> u32 {
	match bcd_device {
		0x0400 => 0,
		// BM chips report 0x0200 when they have no serial number
		0x0200 if !has_serial => 0,
		0x0200 => 1,
		0x0500 => 4,
		0x0600 => 5,
		0x0700 => 6,
		0x0800 => 7,
		0x0900 => 8,
		0x1000 => 9,
		_ => DEVICE_TYPE_UNKNOWN,
	}
}

fn describe(index: usize, info: &DeviceInfo) -> DeviceDescriptor {
	let serial_number = info.serial_number().map(String::from);
	DeviceDescriptor {
		index,
		device_type: device_type_from_release(info.device_version(), serial_number.is_some()),
		vendor_id: info.vendor_id(),
		product_id: info.product_id(),
		description: info.product_string().unwrap_or("").into(),
		serial_number,
	}
}

#[derive(Debug, Default)]
pub struct UsbTransport {
	// result of the last enumeration; indices refer into it
	devices: Vec<DeviceInfo>,
}

impl UsbTransport {
	pub fn new() -> Self {
		Self::default()
	}
}

impl Transport for UsbTransport {
	type Handle = UsbHandle;

	fn enumerate(&mut self) -> crate::AResult<Vec<DeviceDescriptor>> {
		self.devices = with_context!("listing USB devices", {
			Ok(nusb::list_devices().wait()?
				.filter(|d| d.vendor_id() == FTDI_VID)
				.collect::<Vec<_>>())
		})?;
		Ok(self.devices.iter().enumerate().map(|(i, d)| describe(i, d)).collect())
	}

	fn open(&mut self, index: usize) -> crate::AResult<UsbHandle> {
		let info = self.devices.get(index).ok_or_else(|| format_err!("no device with index {} enumerated", index))?;
		let device = info.open().wait()?;
		let interface = device.detach_and_claim_interface(0).wait()?;
		debug!("Device {}: opened {:04x}:{:04x}", index, info.vendor_id(), info.product_id());
		Ok(UsbHandle {
			device,
			interface,
		})
	}
}

/// Claimed FTDI device; released when dropped.
pub struct UsbHandle {
	device: nusb::Device,
	interface: nusb::Interface,
}

impl UsbHandle {
	fn control_out(&self, request: u8, value: u16, index: u16) -> crate::AResult<()> {
		self.interface
			.control_out(
				ControlOut {
					control_type: ControlType::Vendor,
					recipient: Recipient::Device,
					request,
					value,
					index,
					data: &[],
				},
				CONTROL_TIMEOUT,
			)
			.wait()?;
		Ok(())
	}
}

impl EepromHandle for UsbHandle {
	fn read_word(&mut self, address: u16) -> crate::AResult<u16> {
		let data = self
			.interface
			.control_in(
				ControlIn {
					control_type: ControlType::Vendor,
					recipient: Recipient::Device,
					request: SIO_READ_EEPROM_REQUEST,
					value: 0,
					index: address,
					length: 2,
				},
				CONTROL_TIMEOUT,
			)
			.wait()?;
		ensure!(data.len() >= 2, "short EEPROM read ({} bytes)", data.len());
		Ok(u16::from_le_bytes([data[0], data[1]]))
	}

	fn write_word(&mut self, address: u16, value: u16) -> crate::AResult<()> {
		self.control_out(SIO_WRITE_EEPROM_REQUEST, value, address)
	}

	fn erase_all(&mut self) -> crate::AResult<()> {
		self.control_out(SIO_ERASE_EEPROM_REQUEST, 0, 0)
	}

	fn cycle_port(&mut self) -> crate::AResult<()> {
		self.device.reset().wait()?;
		Ok(())
	}

	fn close(&mut self) -> crate::AResult<()> {
		// interface and device are released on drop
		Ok(())
	}
}
