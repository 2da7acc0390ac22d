// Copyright 2024-2025 Irreducible Inc.

use bytes::{Buf, BufMut};

#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
	#[error("Write buffer is full")]
	WriteBufferFull,
	#[error("Not enough data in read buffer to deserialize")]
	NotEnoughBytes,
	#[error("Unknown enum variant index {name}::{index}")]
	UnknownEnumVariant { name: &'static str, index: u8 },
	#[error("length prefix {len} exceeds the platform word size")]
	LengthOverflow { len: u64 },
	#[error("FromUtf8Error: {0}")]
	FromUtf8Error(#[from] std::string::FromUtf8Error),
}

/// Represents type that can be serialized to a byte buffer.
pub trait SerializeBytes {
	fn serialize(&self, write_buf: impl BufMut) -> Result<(), Error>;
}

/// Represents type that can be deserialized from a byte buffer.
pub trait DeserializeBytes {
	fn deserialize(read_buf: impl Buf) -> Result<Self, Error>
	where
		Self: Sized;
}

fn ensure_writable(write_buf: &impl BufMut, len: usize) -> Result<(), Error> {
	if write_buf.remaining_mut() < len {
		return Err(Error::WriteBufferFull);
	}
	Ok(())
}

fn ensure_readable(read_buf: &impl Buf, len: usize) -> Result<(), Error> {
	if read_buf.remaining() < len {
		return Err(Error::NotEnoughBytes);
	}
	Ok(())
}

macro_rules! impl_serialize_int {
	($($ty:ty => $put:ident, $get:ident);* $(;)?) => {
		$(
			impl SerializeBytes for $ty {
				fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), Error> {
					ensure_writable(&write_buf, std::mem::size_of::<$ty>())?;
					write_buf.$put(*self);
					Ok(())
				}
			}

			impl DeserializeBytes for $ty {
				fn deserialize(mut read_buf: impl Buf) -> Result<Self, Error> {
					ensure_readable(&read_buf, std::mem::size_of::<$ty>())?;
					Ok(read_buf.$get())
				}
			}
		)*
	};
}

impl_serialize_int! {
	u8 => put_u8, get_u8;
	u32 => put_u32_le, get_u32_le;
	u64 => put_u64_le, get_u64_le;
}

impl SerializeBytes for usize {
	fn serialize(&self, write_buf: impl BufMut) -> Result<(), Error> {
		(*self as u64).serialize(write_buf)
	}
}

impl DeserializeBytes for usize {
	fn deserialize(read_buf: impl Buf) -> Result<Self, Error> {
		let len = u64::deserialize(read_buf)?;
		usize::try_from(len).map_err(|_| Error::LengthOverflow { len })
	}
}

impl SerializeBytes for bool {
	fn serialize(&self, write_buf: impl BufMut) -> Result<(), Error> {
		u8::from(*self).serialize(write_buf)
	}
}

impl DeserializeBytes for bool {
	fn deserialize(read_buf: impl Buf) -> Result<Self, Error> {
		match u8::deserialize(read_buf)? {
			0 => Ok(false),
			1 => Ok(true),
			index => Err(Error::UnknownEnumVariant {
				name: "bool",
				index,
			}),
		}
	}
}

impl SerializeBytes for String {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), Error> {
		write_bytes(self.as_bytes(), &mut write_buf)
	}
}

impl DeserializeBytes for String {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, Error> {
		Ok(String::from_utf8(read_bytes(&mut read_buf)?)?)
	}
}

impl<T: SerializeBytes> SerializeBytes for Vec<T> {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), Error> {
		self.len().serialize(&mut write_buf)?;
		self.iter()
			.try_for_each(|item| item.serialize(&mut write_buf))
	}
}

impl<T: DeserializeBytes> DeserializeBytes for Vec<T> {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, Error> {
		let len = usize::deserialize(&mut read_buf)?;
		// Every item takes at least one byte, which bounds the allocation for corrupt prefixes.
		ensure_readable(&read_buf, len)?;
		(0..len)
			.map(|_| T::deserialize(&mut read_buf))
			.collect()
	}
}

/// Writes a length-prefixed byte string.
pub fn write_bytes(bytes: &[u8], mut write_buf: impl BufMut) -> Result<(), Error> {
	bytes.len().serialize(&mut write_buf)?;
	ensure_writable(&write_buf, bytes.len())?;
	write_buf.put_slice(bytes);
	Ok(())
}

/// Reads a length-prefixed byte string written by [`write_bytes`].
pub fn read_bytes(mut read_buf: impl Buf) -> Result<Vec<u8>, Error> {
	let len = usize::deserialize(&mut read_buf)?;
	ensure_readable(&read_buf, len)?;
	let mut bytes = vec![0u8; len];
	read_buf.copy_to_slice(&mut bytes);
	Ok(bytes)
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use rand::{rngs::StdRng, RngCore, SeedableRng};

	use super::*;

	#[test]
	fn test_byte_string_serialize_deserialize() {
		let mut rng = StdRng::seed_from_u64(0);

		let mut data = vec![0u8; 32];
		rng.fill_bytes(&mut data);

		let mut buf = Vec::new();
		write_bytes(&data, &mut buf).unwrap();

		let data_deserialized = read_bytes(buf.as_slice()).unwrap();
		assert_eq!(data_deserialized, data);
	}

	#[test]
	fn test_nested_vec_and_string() {
		let value = vec![vec!["g".to_string(), "h".to_string()], vec![]];
		let mut buf = Vec::new();
		value.serialize(&mut buf).unwrap();
		assert_eq!(Vec::<Vec<String>>::deserialize(buf.as_slice()).unwrap(), value);
	}

	#[test]
	fn test_truncated_input() {
		let mut buf = Vec::new();
		write_bytes(&[1, 2, 3, 4], &mut buf).unwrap();
		buf.truncate(buf.len() - 1);
		assert_matches!(read_bytes(buf.as_slice()), Err(Error::NotEnoughBytes));
	}

	#[test]
	fn test_invalid_bool() {
		assert_matches!(
			bool::deserialize([7u8].as_slice()),
			Err(Error::UnknownEnumVariant { name: "bool", index: 7 })
		);
	}
}
