//! Fixed-header framing for payloads crossing the channel.
//!
//! Wire layout is one type byte, a little-endian u32 payload length, and the
//! payload itself. There is no checksum and no version field.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{BurrowError, Result};

/// Bytes taken by the type code and length field.
pub const HEADER_LEN: usize = 5;

/// Payload kind carried by a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PackageType {
    Command = 0x01,
    Result = 0x02,
    File = 0x03,
    SysInfo = 0x04,
    Error = 0x05,
}

impl PackageType {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(PackageType::Command),
            0x02 => Some(PackageType::Result),
            0x03 => Some(PackageType::File),
            0x04 => Some(PackageType::SysInfo),
            0x05 => Some(PackageType::Error),
            _ => None,
        }
    }
}

/// Frames `payload` under the given type.
pub fn pack(ty: PackageType, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(ty as u8);
    buf.put_u32_le(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}

/// Parses a framed buffer back into its type and payload.
///
/// Rejects buffers shorter than the header, unknown type codes, and declared
/// lengths that overrun the buffer. Bytes past the declared length are
/// ignored. Callers drop the message on failure and keep polling.
pub fn unpack(input: &[u8]) -> Result<(PackageType, Bytes)> {
    if input.len() < HEADER_LEN {
        return Err(BurrowError::MalformedPackage("buffer shorter than header"));
    }

    let mut buf = input;
    let ty = PackageType::from_code(buf.get_u8())
        .ok_or(BurrowError::MalformedPackage("unknown type code"))?;
    let len = buf.get_u32_le() as usize;
    if len > buf.remaining() {
        return Err(BurrowError::MalformedPackage(
            "declared length exceeds buffer",
        ));
    }

    Ok((ty, Bytes::copy_from_slice(&buf[..len])))
}
