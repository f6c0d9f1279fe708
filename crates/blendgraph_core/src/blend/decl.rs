/// Parsed SDNA field declarator details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldDecl<'a> {
	/// Identifier with pointer, call, and array markers removed.
	pub ident: &'a str,
	/// Pointer nesting depth (`*`, `**`, ...).
	pub ptr_depth: u8,
	/// Whether the declarator is a function pointer such as `(*func)()`.
	pub is_func_ptr: bool,
	/// Whether any `[n]` suffix was present.
	pub is_array: bool,
	/// First two array dimensions; extra dimensions fold into the second.
	pub dims: [usize; 2],
}

impl FieldDecl<'_> {
	/// Total inline element count (`dims[0] * dims[1]`).
	pub fn element_count(&self) -> usize {
		self.dims[0].saturating_mul(self.dims[1])
	}

	/// Whether the stored value is an address of pointer width.
	pub fn is_pointer(&self) -> bool {
		self.ptr_depth > 0 || self.is_func_ptr
	}
}

/// Parse SDNA declarator text (`*next`, `co[3]`, `mat[4][4]`, `(*func)()`).
pub(crate) fn parse_field_decl(raw: &str) -> FieldDecl<'_> {
	let trimmed = raw.trim();
	let mut decl = FieldDecl {
		ident: trimmed,
		ptr_depth: 0,
		is_func_ptr: false,
		is_array: false,
		dims: [1, 1],
	};

	if let Some(start) = trimmed.find("(*") {
		let after = &trimmed[start + 2..];
		if let Some(close_idx) = after.find(')') {
			let inside = &after[..close_idx];
			let stars = inside.chars().take_while(|c| *c == '*').count();
			let ident = inside.trim_start_matches('*').trim();
			if !ident.is_empty() {
				decl.ident = ident;
			}
			decl.ptr_depth = (stars as u8).saturating_add(1);
			decl.is_func_ptr = after[close_idx + 1..].starts_with('(');
			parse_dims(&after[close_idx + 1..], &mut decl);
			return decl;
		}
	}

	let stars = trimmed.chars().take_while(|c| *c == '*').count();
	decl.ptr_depth = stars as u8;
	let tail = &trimmed[stars..];

	let ident_end = tail.find('[').unwrap_or(tail.len());
	let ident = tail[..ident_end].trim();
	if !ident.is_empty() {
		decl.ident = ident;
	}

	parse_dims(&tail[ident_end..], &mut decl);
	decl
}

fn parse_dims(mut tail: &str, decl: &mut FieldDecl<'_>) {
	let mut seen = 0_usize;
	while let Some(start) = tail.find('[') {
		let Some(end) = tail[start + 1..].find(']') else {
			break;
		};
		let end = start + 1 + end;
		let dim = tail[start + 1..end].trim().parse::<usize>().unwrap_or(1);
		if seen == 0 {
			decl.dims[0] = dim;
		} else {
			decl.dims[1] = decl.dims[1].saturating_mul(dim);
		}
		seen += 1;
		tail = &tail[end + 1..];
	}
	decl.is_array = seen > 0;
}
