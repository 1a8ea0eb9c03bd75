//! Short name generation for renamed tokens.
//!
//! Names are produced by an odometer over a 27-symbol alphabet whose first
//! symbol is empty, so the sequence starts with single letters (`a`..`z`) and
//! only grows to two, three or more letters once the shorter names are used up.

use crate::error::RenameError;
use std::fmt;

/// The empty symbol followed by `a`..`z`.
pub const ALPHABET: [&str; 27] = [
	"", "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
	"s", "t", "u", "v", "w", "x", "y", "z",
];

/// Number of digits in a counter.
pub const DIGITS: usize = 5;

/// The kind of token being renamed. Each category owns its own counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
	/// Plain ids such as `id-header`.
	PlainId,
	/// Ids that must keep a hyphen, such as custom element names (`paper-button`).
	LongId,
	/// CSS classes such as `class-main`.
	Class,
}

impl Category {
	/// Parse the `type` tag used in prefix registrations.
	pub fn from_type_name(name: &str) -> Option<Self> {
		match name {
			"id" => Some(Self::PlainId),
			"long-id" => Some(Self::LongId),
			"class" => Some(Self::Class),
			_ => None,
		}
	}

	/// Separator injected after the leading symbol of a name.
	pub fn separator(self) -> &'static str {
		match self {
			Self::LongId => "-",
			Self::PlainId | Self::Class => "",
		}
	}

	/// Starting counter for this category.
	///
	/// Long ids keep a non-empty leading letter so every name has the shape
	/// `x-yyyy`, which stays a valid custom element name.
	fn initial_counter(self) -> Counter {
		match self {
			Self::LongId => Counter::new([1, 0, 0, 0, 0]),
			Self::PlainId | Self::Class => Counter::new([0; DIGITS]),
		}
	}
}

impl fmt::Display for Category {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::PlainId => "id",
			Self::LongId => "long-id",
			Self::Class => "class",
		};
		f.write_str(name)
	}
}

/// Position in the name space, most significant digit first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
	digits: [usize; DIGITS],
}

impl Counter {
	pub fn new(digits: [usize; DIGITS]) -> Self {
		Self { digits }
	}
}

/// Advance `counter` and render the name it now points at.
///
/// Carries run from the last digit towards the first, each digit checked once.
/// An overflowing digit resets to `1` rather than `0`: the empty symbol may only
/// appear in leading positions, which keeps every rendered name distinct.
///
/// Returns `None` (leaving the counter untouched) once the leading digit would
/// run past the alphabet.
pub fn next_name(counter: &mut Counter, alphabet: &[&str], separator: &str) -> Option<String> {
	let radix = alphabet.len();
	let mut digits = counter.digits;

	digits[DIGITS - 1] += 1;
	for pos in (1..DIGITS).rev() {
		if digits[pos] >= radix {
			digits[pos] = 1;
			digits[pos - 1] += 1;
		}
	}
	if digits[0] >= radix {
		return None;
	}
	counter.digits = digits;

	let mut name = String::with_capacity(DIGITS + separator.len());
	name.push_str(alphabet[digits[0]]);
	name.push_str(separator);
	for &digit in &digits[1..] {
		name.push_str(alphabet[digit]);
	}
	Some(name)
}

/// Generator for one category of short names.
#[derive(Debug, Clone)]
pub struct NameGenerator {
	category: Category,
	counter: Counter,
}

impl NameGenerator {
	pub fn new(category: Category) -> Self {
		Self {
			category,
			counter: category.initial_counter(),
		}
	}

	/// Resume a generator from an explicit counter position.
	pub fn with_counter(category: Category, counter: Counter) -> Self {
		Self { category, counter }
	}

	/// Generate the next name in this category.
	pub fn next(&mut self) -> Result<String, RenameError> {
		next_name(&mut self.counter, &ALPHABET, self.category.separator()).ok_or(
			RenameError::CapacityExceeded {
				category: self.category,
			},
		)
	}
}

/// The three independent generators used during a run.
#[derive(Debug, Clone)]
pub struct NameGenerators {
	plain_id: NameGenerator,
	long_id: NameGenerator,
	class: NameGenerator,
}

impl Default for NameGenerators {
	fn default() -> Self {
		Self::new()
	}
}

impl NameGenerators {
	pub fn new() -> Self {
		Self {
			plain_id: NameGenerator::new(Category::PlainId),
			long_id: NameGenerator::new(Category::LongId),
			class: NameGenerator::new(Category::Class),
		}
	}

	/// Swap in `generator` for its category.
	#[cfg(test)]
	pub(crate) fn replace(&mut self, generator: NameGenerator) {
		match generator.category {
			Category::PlainId => self.plain_id = generator,
			Category::LongId => self.long_id = generator,
			Category::Class => self.class = generator,
		}
	}

	/// Generate the next name for `category`, leaving the other counters alone.
	pub fn next(&mut self, category: Category) -> Result<String, RenameError> {
		match category {
			Category::PlainId => self.plain_id.next(),
			Category::LongId => self.long_id.next(),
			Category::Class => self.class.next(),
		}
	}
}
