#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate ftdi_eeprom_flash;
use ftdi_eeprom_flash::*;

use std::io::{
	self,
	BufRead,
	Write,
};
use std::process::exit;
use std::time::Duration;

use ftdi_eeprom_flash::engine::Engine;
use ftdi_eeprom_flash::orchestrator::{
	ConfirmKind,
	Confirmation,
	Cycle,
	DeviceSelection,
	OperationOutcome,
	OperationRequest,
	Operator,
	Orchestrator,
};
use ftdi_eeprom_flash::transport::usb::UsbTransport;
use ftdi_eeprom_flash::transport::DeviceDescriptor;

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

/// Parse an index like the original prompt did: decimal, or with a `0x`,
/// `0o` or `0b` prefix.
fn parse_index(input: &str) -> Option<usize> {
	let input = input.replace('_', "");
	let lower = input.to_lowercase();
	let (digits, radix) = if lower.starts_with("0x") {
		(&lower[2..], 16)
	} else if lower.starts_with("0o") {
		(&lower[2..], 8)
	} else if lower.starts_with("0b") {
		(&lower[2..], 2)
	} else {
		(&lower[..], 10)
	};
	usize::from_str_radix(digits, radix).ok()
}

fn print_devices(devices: &[DeviceDescriptor]) {
	if devices.is_empty() {
		println!("No FTDI devices found.");
		return;
	}
	println!("\nConnected FTDI devices:\n");
	println!("{}", DeviceDescriptor::table_header());
	for device in devices {
		println!("{}", device);
	}
}

/// Prompts on stdout, answers from stdin. After EOF every prompt answers
/// quit / no / nothing.
#[derive(Default)]
struct Console {
	eof: bool,
}

impl Console {
	/// Next line from stdin without the line break; none on EOF.
	fn read_line(&mut self) -> Option<String> {
		if self.eof {
			return None;
		}
		let _ = io::stdout().flush();
		let mut line = String::new();
		match io::stdin().lock().read_line(&mut line) {
			Ok(0) | Err(_) => {
				debug!("End of input");
				self.eof = true;
				None
			},
			Ok(_) => Some(line.trim().to_string()),
		}
	}
}

impl Operator for Console {
	fn choose_device(&mut self, candidates: &[DeviceDescriptor]) -> DeviceSelection {
		if self.eof {
			return DeviceSelection::Quit;
		}
		print_devices(candidates);
		loop {
			println!("\nSelect index of target device, (r)efresh (q)uit:");
			let input = match self.read_line() {
				Some(input) => input.to_lowercase(),
				None => return DeviceSelection::Quit,
			};
			match input.as_str() {
				"q" => return DeviceSelection::Quit,
				"r" => return DeviceSelection::Refresh,
				_ => (),
			}
			match parse_index(&input) {
				Some(index) => match candidates.iter().find(|d| d.index == index) {
					Some(device) => return DeviceSelection::Selected(device.clone()),
					None => println!("Please select a valid device index."),
				},
				None => println!("Not a valid number."),
			}
		}
	}

	fn choose_operation(&mut self) -> OperationRequest {
		if self.eof {
			return OperationRequest::Quit;
		}
		loop {
			println!("\nSelect operation on device:");
			println!("  (R)ead EEPROM contents of device");
			println!("  (W)rite EEPROM contents of device");
			println!("  (E)rase EEPROM contents of device");
			println!("  (Q)uit program");
			let input = match self.read_line() {
				Some(input) => input.to_lowercase(),
				None => return OperationRequest::Quit,
			};
			match input.as_str() {
				"r" => return OperationRequest::Read,
				"w" => return OperationRequest::Write,
				"e" => return OperationRequest::Erase,
				"q" => return OperationRequest::Quit,
				_ => println!("Please select a valid option."),
			}
		}
	}

	fn choose_file_path(&mut self, prompt: &str) -> (bool, Option<String>) {
		if self.eof {
			return (false, None);
		}
		println!("{}", prompt);
		println!("Path:");
		match self.read_line() {
			// an empty answer means the operator gave up
			Some(path) => (!path.is_empty(), Some(path)),
			None => (false, None),
		}
	}

	fn confirm(&mut self, confirmation: &Confirmation) -> bool {
		if self.eof {
			return false;
		}
		println!("{}", confirmation.message);
		println!("Continue? (y)es or (n)o:");
		loop {
			let input = match self.read_line() {
				Some(input) => input.to_lowercase(),
				None => return false,
			};
			match input.as_str() {
				"y" | "yes" => return true,
				"n" | "no" => return false,
				_ => println!("Please enter y, yes, n or no:"),
			}
		}
	}
}

/// One operation fully described by the command line.
struct Batch {
	device: usize,
	operation: OperationRequest,
	path: Option<String>,
	force: bool,
	yes: bool,
	/// correct a mismatching checksum before writing
	fix_checksum: bool,
	/// write an image with mismatching checksum as it is
	ignore_checksum: bool,
	device_missing: bool,
}

impl Batch {
	fn new(operation: OperationRequest, sub_m: &clap::ArgMatches) -> AResult<Self> {
		let path = sub_m.value_of("FILE").map(String::from);
		if let Some(ref path) = path {
			ensure!(!path.is_empty(), "empty FILE parameter");
		}
		Ok(Batch {
			device: get_param(sub_m, "DEVICE")?,
			operation,
			path,
			force: sub_m.is_present("force"),
			yes: sub_m.is_present("yes"),
			fix_checksum: sub_m.is_present("fix_checksum"),
			ignore_checksum: sub_m.is_present("ignore_checksum"),
			device_missing: false,
		})
	}
}

impl Operator for Batch {
	fn choose_device(&mut self, candidates: &[DeviceDescriptor]) -> DeviceSelection {
		match candidates.iter().find(|d| d.index == self.device) {
			Some(device) => DeviceSelection::Selected(device.clone()),
			None => {
				self.device_missing = true;
				DeviceSelection::Quit
			},
		}
	}

	fn choose_operation(&mut self) -> OperationRequest {
		self.operation
	}

	fn choose_file_path(&mut self, _prompt: &str) -> (bool, Option<String>) {
		(false, self.path.clone())
	}

	fn confirm(&mut self, confirmation: &Confirmation) -> bool {
		let answer = match confirmation.kind {
			ConfirmKind::OverwriteTarget => self.force,
			ConfirmKind::WriteCaution | ConfirmKind::EraseReset => self.yes,
			ConfirmKind::ChecksumProceed => self.fix_checksum || self.ignore_checksum,
			ConfirmKind::ChecksumCorrect => self.fix_checksum,
		};
		if !answer {
			warn!("{}", confirmation.message);
		}
		answer
	}
}

fn list(engine: &mut Engine<UsbTransport>) -> AResult<()> {
	print_devices(&engine.enumerate()?);
	Ok(())
}

fn interactive(engine: Engine<UsbTransport>) -> AResult<()> {
	println!("FTDI EEPROM Flash Utility");
	println!("=========================");
	Orchestrator::new(engine).run(&mut Console::default())?;
	println!("\nDone.");
	Ok(())
}

fn batch(engine: Engine<UsbTransport>, mut operator: Batch) -> AResult<()> {
	let cycle = Orchestrator::new(engine).run_cycle(&mut operator)?;
	if operator.device_missing {
		bail!("no FTDI device with index {}", operator.device);
	}
	match cycle {
		Cycle::Completed(OperationOutcome::Success { .. }) | Cycle::Quit => Ok(()),
		Cycle::Completed(OperationOutcome::Aborted) => exit(2),
		Cycle::Completed(OperationOutcome::Failed(reason)) => bail!("{}", reason),
	}
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg interactive: -i --interactive "Run the interactive console (default without subcommand)")
		(@arg quiet: -q --quiet "Don't show hexdumps and progress messages")
		(@arg no_verify: --("no-verify") "Don't read the EEPROM back after writing")
		(@arg settle_ms: --("settle-ms") +takes_value "Milliseconds to wait after a USB port cycle (default 3000)")
		(@subcommand list =>
			(about: "list connected FTDI devices")
		)
		(@subcommand read =>
			(about: "save EEPROM contents of a device to a file")
			(@arg force: -f --force "overwrite FILE if it exists")
			(@arg DEVICE: +required "index of the device (see list)")
			(@arg FILE: +required "target binary file")
		)
		(@subcommand write =>
			(about: "write EEPROM contents of a device from a file")
			(@arg yes: -y --yes "don't ask before overwriting the EEPROM")
			(@arg fix_checksum: --("fix-checksum") conflicts_with[ignore_checksum] "write images with invalid checksum, correcting the checksum")
			(@arg ignore_checksum: --("ignore-checksum") "write images with invalid checksum unchanged")
			(@arg DEVICE: +required "index of the device (see list)")
			(@arg FILE: +required "source binary file")
		)
		(@subcommand erase =>
			(about: "erase EEPROM contents of a device")
			(@arg yes: -y --yes "don't ask before erasing the EEPROM")
			(@arg DEVICE: +required "index of the device (see list)")
		)
	).get_matches();

	let mut options = Options::default();
	options.verbose = !matches.is_present("quiet");
	options.verify_after_write = !matches.is_present("no_verify");
	if matches.is_present("settle_ms") {
		options.settle_time = Duration::from_millis(get_param(&matches, "settle_ms")?);
	}
	let mut engine = Engine::new(UsbTransport::new(), options);

	if matches.is_present("interactive") {
		return interactive(engine);
	}

	match matches.subcommand() {
		("list", _) => {
			list(&mut engine)
		},
		("read", Some(sub_m)) => {
			batch(engine, Batch::new(OperationRequest::Read, sub_m)?)
		},
		("write", Some(sub_m)) => {
			batch(engine, Batch::new(OperationRequest::Write, sub_m)?)
		},
		("erase", Some(sub_m)) => {
			batch(engine, Batch::new(OperationRequest::Erase, sub_m)?)
		},
		("", _) => interactive(engine),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
