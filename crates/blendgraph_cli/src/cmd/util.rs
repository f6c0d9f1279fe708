use blendgraph::blend::{Address, BlendError, Result};

/// Parse up-to-4 ASCII block code into padded `[u8; 4]`.
pub(crate) fn parse_block_code(code: &str) -> Result<[u8; 4]> {
	if code.is_empty() || code.len() > 4 || !code.is_ascii() {
		return Err(BlendError::InvalidBlockCode { code: code.to_owned() });
	}

	let mut out = [0_u8; 4];
	out[..code.len()].copy_from_slice(code.as_bytes());
	Ok(out)
}

/// Render an address as fixed-width hex.
pub(crate) fn ptr_hex(address: Address) -> String {
	format!("0x{:016x}", address.0)
}

/// Pretty-print a serializable payload to stdout.
pub(crate) fn emit_json<T: serde::Serialize>(payload: &T) {
	match serde_json::to_string_pretty(payload) {
		Ok(text) => println!("{text}"),
		Err(err) => eprintln!("error: failed to serialize json output: {err}"),
	}
}
