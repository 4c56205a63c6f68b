use std::fmt::Write;

/// Classic 16 bytes per line dump with an offset column and ASCII gutter.
pub fn hexdump(data: &[u8]) -> String {
	let mut out = String::new();
	for (line, chunk) in data.chunks(16).enumerate() {
		let _ = write!(out, "{:08x} ", line * 16);
		for i in 0..16 {
			if i == 8 {
				out.push(' ');
			}
			match chunk.get(i) {
				Some(b) => { let _ = write!(out, " {:02x}", b); },
				None => out.push_str("   "),
			}
		}
		out.push_str("  |");
		for &b in chunk {
			out.push(if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' });
		}
		out.push_str("|\n");
	}
	let _ = writeln!(out, "{:08x}", data.len());
	out
}
