//! Byte-cursor primitives used for the few places a plain big-endian length
//! or integer is read off the wire or off a storage value.

use anyhow::{anyhow, Result};

pub fn encode_u8(v: u8, out: &mut Vec<u8>) {
    out.push(v);
}
pub fn encode_u32(v: u32, out: &mut Vec<u8>) {
    out.extend_from_slice(&v.to_be_bytes());
}
pub fn encode_u64(v: u64, out: &mut Vec<u8>) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn read_u8(data: &mut &[u8]) -> Result<u8> {
    if data.is_empty() {
        return Err(anyhow!("unexpected EOF"));
    }
    let v = data[0];
    *data = &data[1..];
    Ok(v)
}

pub fn read_u32(data: &mut &[u8]) -> Result<u32> {
    if data.len() < 4 {
        return Err(anyhow!("unexpected EOF"));
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[..4]);
    *data = &data[4..];
    Ok(u32::from_be_bytes(buf))
}

pub fn read_u64(data: &mut &[u8]) -> Result<u64> {
    if data.len() < 8 {
        return Err(anyhow!("unexpected EOF"));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[..8]);
    *data = &data[8..];
    Ok(u64::from_be_bytes(buf))
}

pub fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    encode_u32(bytes.len() as u32, out);
    out.extend_from_slice(bytes);
}

pub fn read_vec(data: &mut &[u8]) -> Result<Vec<u8>> {
    let len = read_u32(data)? as usize;
    if data.len() < len {
        return Err(anyhow!("unexpected EOF"));
    }
    let v = data[..len].to_vec();
    *data = &data[len..];
    Ok(v)
}

pub fn read_fixed<const N: usize>(data: &mut &[u8]) -> Result<[u8; N]> {
    if data.len() < N {
        return Err(anyhow!("unexpected EOF"));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&data[..N]);
    *data = &data[N..];
    Ok(out)
}
