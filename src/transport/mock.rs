//! Scripted transport for tests: one word store shared by all listed
//! devices, a call log and switchable failures.

use std::cell::{
	Ref,
	RefCell,
	RefMut,
};
use std::fs;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use super::{
	DeviceDescriptor,
	EepromHandle,
	Transport,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Call {
	Read(u16),
	Write(u16, u16),
	Erase,
	CyclePort,
	Close,
}

#[derive(Debug, Default)]
pub struct MockState {
	pub devices: Vec<DeviceDescriptor>,
	/// device lists handed out by the first enumerations, before `devices`
	pub enumeration_script: Vec<Vec<DeviceDescriptor>>,
	pub memory: Vec<u16>,
	pub calls: Vec<Call>,
	pub enumerations: usize,
	pub opens: usize,
	pub closes: usize,
	pub fail_open: bool,
	pub fail_read_at: Option<u16>,
	pub fail_write_at: Option<u16>,
	pub fail_erase: bool,
	pub cycle_unsupported: bool,
	/// value forced into the store after every write to this address
	pub stuck_at: Option<(u16, u16)>,
}

impl MockState {
	pub fn writes(&self) -> Vec<(u16, u16)> {
		self.calls.iter().filter_map(|c| match *c {
			Call::Write(a, v) => Some((a, v)),
			_ => None,
		}).collect()
	}

	pub fn count(&self, call: fn(&Call) -> bool) -> usize {
		self.calls.iter().filter(|c| call(c)).count()
	}

	pub fn memory_bytes(&self) -> Vec<u8> {
		self.memory.iter().flat_map(|w| w.to_le_bytes().to_vec()).collect()
	}
}

#[derive(Clone, Debug, Default)]
pub struct MockTransport {
	state: Rc<RefCell<MockState>>,
}

pub fn device(index: usize, device_type: u32) -> DeviceDescriptor {
	DeviceDescriptor {
		index,
		device_type,
		vendor_id: 0x0403,
		product_id: 0x6001,
		description: format!("Mock device {}", index),
		serial_number: Some(format!("MOCK{:04}", index)),
	}
}

impl MockTransport {
	/// One device of `device_type` with an erased EEPROM of `size` bytes.
	pub fn with_device(device_type: u32, size: usize) -> Self {
		let t = MockTransport::default();
		{
			let mut s = t.state_mut();
			s.devices.push(device(0, device_type));
			s.memory = vec![0xffff; size / 2];
		}
		t
	}

	pub fn state(&self) -> Ref<MockState> {
		self.state.borrow()
	}

	pub fn state_mut(&self) -> RefMut<MockState> {
		self.state.borrow_mut()
	}
}

impl Transport for MockTransport {
	type Handle = MockHandle;

	fn enumerate(&mut self) -> crate::AResult<Vec<DeviceDescriptor>> {
		let mut s = self.state_mut();
		s.enumerations += 1;
		if !s.enumeration_script.is_empty() {
			return Ok(s.enumeration_script.remove(0));
		}
		Ok(s.devices.clone())
	}

	fn open(&mut self, index: usize) -> crate::AResult<MockHandle> {
		let mut s = self.state_mut();
		s.opens += 1;
		ensure!(!s.fail_open, "mock device {} refuses to open", index);
		Ok(MockHandle { state: self.state.clone() })
	}
}

#[derive(Debug)]
pub struct MockHandle {
	state: Rc<RefCell<MockState>>,
}

impl EepromHandle for MockHandle {
	fn read_word(&mut self, address: u16) -> crate::AResult<u16> {
		let mut s = self.state.borrow_mut();
		s.calls.push(Call::Read(address));
		ensure!(s.fail_read_at != Some(address), "mock read error");
		s.memory.get(address as usize).cloned().ok_or_else(|| format_err!("address out of range"))
	}

	fn write_word(&mut self, address: u16, value: u16) -> crate::AResult<()> {
		let mut s = self.state.borrow_mut();
		s.calls.push(Call::Write(address, value));
		ensure!(s.fail_write_at != Some(address), "mock write error");
		let value = match s.stuck_at {
			Some((stuck, forced)) if stuck == address => forced,
			_ => value,
		};
		match s.memory.get_mut(address as usize) {
			Some(w) => *w = value,
			None => bail!("address out of range"),
		}
		Ok(())
	}

	fn erase_all(&mut self) -> crate::AResult<()> {
		let mut s = self.state.borrow_mut();
		s.calls.push(Call::Erase);
		ensure!(!s.fail_erase, "mock erase error");
		for w in s.memory.iter_mut() {
			*w = 0xffff;
		}
		Ok(())
	}

	fn cycle_port(&mut self) -> crate::AResult<()> {
		let mut s = self.state.borrow_mut();
		s.calls.push(Call::CyclePort);
		ensure!(!s.cycle_unsupported, "not supported on this platform");
		Ok(())
	}

	fn close(&mut self) -> crate::AResult<()> {
		let mut s = self.state.borrow_mut();
		s.calls.push(Call::Close);
		s.closes += 1;
		Ok(())
	}
}

/// Empty per-test directory below the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
	let dir = std::env::temp_dir().join(format!("ftdi-eeprom-flash-{}-{}", process::id(), name));
	let _ = fs::remove_dir_all(&dir);
	fs::create_dir_all(&dir).unwrap();
	dir
}
