//! Length-prefixed bincode frames: a little-endian `u32` length, then the body.

use crate::common::{FaceGateError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

pub fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: Write,
    T: Serialize,
{
    let data = bincode::serialize(message)
        .map_err(|e| FaceGateError::Protocol(format!("Failed to serialize frame: {}", e)))?;
    let len = u32::try_from(data.len())
        .map_err(|_| FaceGateError::Protocol(format!("Frame too large: {} bytes", data.len())))?;

    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&data)?;
    writer.flush()?;
    Ok(())
}

pub fn read_frame<R, T>(reader: &mut R, max_bytes: usize) -> Result<T>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > max_bytes {
        return Err(FaceGateError::Protocol(format!(
            "Frame too large: {} bytes (limit {})", len, max_bytes
        )));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    bincode::deserialize(&buf)
        .map_err(|e| FaceGateError::Protocol(format!("Failed to deserialize frame: {}", e)))
}
