//! One operation cycle: select device, select operation, gather inputs,
//! confirm, execute, report.
//!
//! All decisions come from an [`Operator`], so the same sequencing backs the
//! interactive console, batch mode and scripted tests.

use std::path::{
	Path,
	PathBuf,
};

use crate::engine::Engine;
use crate::error::{
	EepromError,
	find_eeprom_error,
};
use crate::transport::{
	DeviceDescriptor,
	Transport,
};

pub use crate::engine::{
	ConfirmKind,
	Confirmation,
	OperationOutcome,
	PortCycle,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum OperationRequest {
	Read,
	Write,
	Erase,
	Quit,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum DeviceSelection {
	Selected(DeviceDescriptor),
	/// enumerate again and ask again
	Refresh,
	Quit,
}

pub trait Operator {
	/// `candidates` is never empty.
	fn choose_device(&mut self, candidates: &[DeviceDescriptor]) -> DeviceSelection;
	fn choose_operation(&mut self) -> OperationRequest;
	/// Returns whether asking again makes sense, and the entered path.
	///
	/// No path together with no retry means the operator has no answer at
	/// all (e.g. end of input); the running operation is then aborted.
	fn choose_file_path(&mut self, prompt: &str) -> (bool, Option<String>);
	fn confirm(&mut self, confirmation: &Confirmation) -> bool;
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Cycle {
	Completed(OperationOutcome),
	Quit,
}

pub const READ_TARGET_PROMPT: &str = "Specify target binary file on disk.";
pub const WRITE_SOURCE_PROMPT: &str = "Specify source binary file on disk.";

pub const ERASE_WARNING: &str = "NOTE: Erasing the EEPROM will reset the device to all of its default settings (including serial number and port functions).";

fn write_warning(source: &Path) -> String {
	let source = source.canonicalize().unwrap_or_else(|_| source.to_path_buf());
	format!(
		"CAUTION: Writing an invalid EEPROM file can cause enumeration failures and hence brick the device!\n\
		By proceeding, the EEPROM contents will be overwritten with the data of the file located at\n{}",
		source.display(),
	)
}

pub struct Orchestrator<T: Transport> {
	engine: Engine<T>,
}

impl<T: Transport> Orchestrator<T> {
	pub fn new(engine: Engine<T>) -> Self {
		Orchestrator {
			engine,
		}
	}

	/// Run cycles until the operator quits.
	///
	/// Fails only for conditions no further cycle can recover from (no
	/// devices at all, invalid non-retryable input).
	pub fn run<O: Operator>(&mut self, operator: &mut O) -> crate::AResult<()> {
		loop {
			if let Cycle::Quit = self.run_cycle(operator)? {
				info!("Exiting...");
				return Ok(());
			}
		}
	}

	pub fn run_cycle<O: Operator>(&mut self, operator: &mut O) -> crate::AResult<Cycle> {
		let device = match self.select_device(operator)? {
			Some(device) => device,
			None => return Ok(Cycle::Quit),
		};

		let result = match operator.choose_operation() {
			OperationRequest::Quit => return Ok(Cycle::Quit),
			OperationRequest::Read => self.read(&device, operator),
			OperationRequest::Write => self.write(&device, operator),
			OperationRequest::Erase => self.erase(&device, operator),
		};

		let outcome = match result {
			Ok(outcome) => outcome,
			Err(e) => {
				if find_eeprom_error(&e).map_or(false, EepromError::is_process_fatal) {
					return Err(e);
				}
				error!("Device {}: {}", device.index, e);
				OperationOutcome::Failed(e.to_string())
			},
		};

		match outcome {
			OperationOutcome::Success { port_cycle: Some(PortCycle::ManualReconnect) } => {
				info!("Operation completed; reconnect the device to apply the new EEPROM contents.");
			},
			OperationOutcome::Success { .. } => info!("Operation completed."),
			OperationOutcome::Aborted => (),
			OperationOutcome::Failed(_) => warn!("Operation failed."),
		}
		if self.engine.options().verbose {
			info!("Done. Ready for next operation...");
		}
		Ok(Cycle::Completed(outcome))
	}

	/// Returns none if the operator quit.
	fn select_device<O: Operator>(&mut self, operator: &mut O) -> crate::AResult<Option<DeviceDescriptor>> {
		loop {
			let devices = self.engine.enumerate()?;
			if devices.is_empty() {
				return Err(EepromError::EnumerationEmpty.into());
			}
			match operator.choose_device(&devices) {
				DeviceSelection::Selected(device) => return Ok(Some(device)),
				DeviceSelection::Refresh => debug!("Refreshing device list"),
				DeviceSelection::Quit => return Ok(None),
			}
		}
	}

	fn read<O: Operator>(&mut self, device: &DeviceDescriptor, operator: &mut O) -> crate::AResult<OperationOutcome> {
		let target = loop {
			match operator.choose_file_path(READ_TARGET_PROMPT) {
				(_, Some(ref path)) if !path.is_empty() => break PathBuf::from(path),
				(false, None) => {
					info!("Read operation aborted.");
					return Ok(OperationOutcome::Aborted);
				},
				_ => (),
			}
		};

		if target.is_file() {
			let overwrite = Confirmation::new(
				ConfirmKind::OverwriteTarget,
				format!("WARNING: A file already exists at {} and will be overwritten.", target.display()),
			);
			if !operator.confirm(&overwrite) {
				info!("Read operation aborted.");
				return Ok(OperationOutcome::Aborted);
			}
		}

		self.engine.read_to_file(device, &target)
	}

	fn write<O: Operator>(&mut self, device: &DeviceDescriptor, operator: &mut O) -> crate::AResult<OperationOutcome> {
		let source = loop {
			let (can_retry, path) = operator.choose_file_path(WRITE_SOURCE_PROMPT);
			let path = PathBuf::from(path.unwrap_or_default());
			if path.is_file() {
				break path;
			}
			warn!("Invalid source file.");
			if !can_retry {
				return Err(EepromError::InvalidSourceFile { path }.into());
			}
		};

		if !operator.confirm(&Confirmation::new(ConfirmKind::WriteCaution, write_warning(&source))) {
			info!("Write operation aborted.");
			return Ok(OperationOutcome::Aborted);
		}

		self.engine.write_from_file(device, &source, &mut |c: &Confirmation| operator.confirm(c))
	}

	fn erase<O: Operator>(&mut self, device: &DeviceDescriptor, operator: &mut O) -> crate::AResult<OperationOutcome> {
		if !operator.confirm(&Confirmation::new(ConfirmKind::EraseReset, ERASE_WARNING)) {
			info!("Erase operation aborted.");
			return Ok(OperationOutcome::Aborted);
		}

		self.engine.erase(device)
	}
}
