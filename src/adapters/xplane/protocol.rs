//! X-Plane 11 UDP dataref 協定編解碼
//!
//! * `RREF` 訂閱: `"RREF\0"` + i32 頻率 + i32 索引 + 400 bytes 路徑
//! * `RREF` 回覆: 5 bytes 標頭 + N 組 (i32 索引, f32 數值)
//! * `DREF` 寫入: `"DREF\0"` + f32 數值 + 500 bytes 路徑
//!
//! 所有數值皆為 little-endian。

use crate::utils::error::{AgentError, Result};

pub const HEADER_LEN: usize = 5;
pub const RREF_PATH_LEN: usize = 400;
pub const DREF_PATH_LEN: usize = 500;
pub const RREF_REQUEST_LEN: usize = HEADER_LEN + 4 + 4 + RREF_PATH_LEN;
pub const DREF_REQUEST_LEN: usize = HEADER_LEN + 4 + DREF_PATH_LEN;
const RREF_VALUE_LEN: usize = 8;

fn write_path(buf: &mut Vec<u8>, path: &str, field_len: usize) -> Result<()> {
    let bytes = path.as_bytes();
    // 至少保留一個 NUL 結尾
    if bytes.is_empty() || bytes.len() >= field_len {
        return Err(AgentError::protocol(format!(
            "dataref path must be 1..{} bytes, got {} ('{}')",
            field_len - 1,
            bytes.len(),
            path
        )));
    }
    if bytes.contains(&0) {
        return Err(AgentError::protocol(format!("dataref path contains NUL: '{}'", path)));
    }
    buf.extend_from_slice(bytes);
    buf.resize(buf.len() + field_len - bytes.len(), 0);
    Ok(())
}

/// 訂閱 (或 `frequency = 0` 取消訂閱) 一個 dataref
pub fn encode_rref_request(frequency: i32, index: i32, path: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(RREF_REQUEST_LEN);
    buf.extend_from_slice(b"RREF\0");
    buf.extend_from_slice(&frequency.to_le_bytes());
    buf.extend_from_slice(&index.to_le_bytes());
    write_path(&mut buf, path, RREF_PATH_LEN)?;
    Ok(buf)
}

pub fn encode_dref(value: f32, path: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(DREF_REQUEST_LEN);
    buf.extend_from_slice(b"DREF\0");
    buf.extend_from_slice(&value.to_le_bytes());
    write_path(&mut buf, path, DREF_PATH_LEN)?;
    Ok(buf)
}

pub fn decode_rref_reply(packet: &[u8]) -> Result<Vec<(i32, f32)>> {
    if packet.len() < HEADER_LEN || &packet[..4] != b"RREF" {
        return Err(AgentError::protocol(format!(
            "not an RREF reply ({} bytes)",
            packet.len()
        )));
    }

    let payload = &packet[HEADER_LEN..];
    if payload.len() % RREF_VALUE_LEN != 0 {
        return Err(AgentError::protocol(format!(
            "RREF payload length {} is not a multiple of {}",
            payload.len(),
            RREF_VALUE_LEN
        )));
    }

    let values = payload
        .chunks_exact(RREF_VALUE_LEN)
        .map(|chunk| {
            let index = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let value = f32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
            (index, value)
        })
        .collect();

    Ok(values)
}

/// 測試與假模擬器使用：組出 RREF 回覆封包
pub fn encode_rref_reply(values: &[(i32, f32)]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + values.len() * RREF_VALUE_LEN);
    buf.extend_from_slice(b"RREF,");
    for (index, value) in values {
        buf.extend_from_slice(&index.to_le_bytes());
        buf.extend_from_slice(&value.to_le_bytes());
    }
    buf
}

/// 解析 RREF 訂閱請求，回傳 (頻率, 索引, 路徑)
pub fn decode_rref_request(packet: &[u8]) -> Result<(i32, i32, String)> {
    if packet.len() != RREF_REQUEST_LEN || &packet[..HEADER_LEN] != b"RREF\0" {
        return Err(AgentError::protocol("not an RREF request"));
    }
    let frequency = i32::from_le_bytes([packet[5], packet[6], packet[7], packet[8]]);
    let index = i32::from_le_bytes([packet[9], packet[10], packet[11], packet[12]]);
    let path = read_path(&packet[13..])?;
    Ok((frequency, index, path))
}

/// 解析 DREF 封包，回傳 (數值, 路徑)
pub fn decode_dref(packet: &[u8]) -> Result<(f32, String)> {
    if packet.len() != DREF_REQUEST_LEN || &packet[..HEADER_LEN] != b"DREF\0" {
        return Err(AgentError::protocol("not a DREF request"));
    }
    let value = f32::from_le_bytes([packet[5], packet[6], packet[7], packet[8]]);
    let path = read_path(&packet[9..])?;
    Ok((value, path))
}

fn read_path(field: &[u8]) -> Result<String> {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    String::from_utf8(field[..end].to_vec())
        .map_err(|e| AgentError::protocol(format!("dataref path is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rref_request_layout() {
        let packet = encode_rref_request(5, 7, "sim/flightmodel/position/elevation").unwrap();

        assert_eq!(packet.len(), RREF_REQUEST_LEN);
        assert_eq!(&packet[..5], b"RREF\0");
        assert_eq!(&packet[5..9], &5i32.to_le_bytes());
        assert_eq!(&packet[9..13], &7i32.to_le_bytes());
        assert_eq!(&packet[13..47], b"sim/flightmodel/position/elevation");
        assert!(packet[47..].iter().all(|b| *b == 0));

        let (frequency, index, path) = decode_rref_request(&packet).unwrap();
        assert_eq!((frequency, index), (5, 7));
        assert_eq!(path, "sim/flightmodel/position/elevation");
    }

    #[test]
    fn test_dref_layout() {
        let packet = encode_dref(1234.5, "sim/flightmodel/weight/m_fuel[0]").unwrap();

        assert_eq!(packet.len(), DREF_REQUEST_LEN);
        assert_eq!(&packet[..5], b"DREF\0");
        assert_eq!(&packet[5..9], &1234.5f32.to_le_bytes());

        let (value, path) = decode_dref(&packet).unwrap();
        assert_eq!(value, 1234.5);
        assert_eq!(path, "sim/flightmodel/weight/m_fuel[0]");
    }

    #[test]
    fn test_path_length_limits() {
        let too_long = "x".repeat(RREF_PATH_LEN);
        assert!(encode_rref_request(1, 0, &too_long).is_err());
        assert!(encode_rref_request(1, 0, &"x".repeat(RREF_PATH_LEN - 1)).is_ok());
        assert!(encode_rref_request(1, 0, "").is_err());
        assert!(encode_dref(0.0, &"y".repeat(DREF_PATH_LEN)).is_err());
        assert!(encode_dref(0.0, "bad\0path").is_err());
    }

    #[test]
    fn test_decode_reply() {
        let packet = encode_rref_reply(&[(0, 1.5), (3, -250.0)]);
        let values = decode_rref_reply(&packet).unwrap();
        assert_eq!(values, vec![(0, 1.5), (3, -250.0)]);
    }

    #[test]
    fn test_decode_reply_rejects_malformed() {
        assert!(decode_rref_reply(b"RRE").is_err());
        assert!(decode_rref_reply(b"DATA*\0\0\0\0").is_err());

        let mut truncated = encode_rref_reply(&[(1, 2.0)]);
        truncated.pop();
        assert!(decode_rref_reply(&truncated).is_err());

        // 空的回覆是合法的
        assert!(decode_rref_reply(b"RREF,").unwrap().is_empty());
    }
}
