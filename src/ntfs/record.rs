//! NT 原生记录编解码
//!
//! 枚举接口返回的是以 `NextEntryOffset` 串起来的定长头 + 变长尾记录。
//! 这里按显式偏移逐字段读取，每次读取前都检查缓冲区边界，不做指针转换。
//!
//! # 布局
//!
//! `FILE_STREAM_INFORMATION`：
//!
//! | 偏移 | 宽度 | 字段 |
//! |---|---|---|
//! | 0 | 4 | NextEntryOffset |
//! | 4 | 4 | StreamNameLength（字节） |
//! | 8 | 8 | StreamSize |
//! | 16 | 8 | StreamAllocationSize |
//! | 24 | n | StreamName（UTF-16） |
//!
//! `FILE_FULL_EA_INFORMATION`：
//!
//! | 偏移 | 宽度 | 字段 |
//! |---|---|---|
//! | 0 | 4 | NextEntryOffset |
//! | 4 | 1 | Flags |
//! | 5 | 1 | EaNameLength |
//! | 6 | 2 | EaValueLength |
//! | 8 | n+1+m | EaName, NUL, 值 |
//!
//! `FILE_GET_EA_INFORMATION`：
//!
//! | 偏移 | 宽度 | 字段 |
//! |---|---|---|
//! | 0 | 4 | NextEntryOffset |
//! | 4 | 1 | EaNameLength |
//! | 5 | n+1 | EaName, NUL |

use byteorder::{ByteOrder, LittleEndian};

use crate::consts::{EA_DATA_MAX, EA_NAME_MAX};
use crate::error::{Error, ErrorKind, Result};

/// `FILE_STREAM_INFORMATION` 定长头大小
pub const STREAM_HEADER_LEN: usize = 24;

/// `FILE_FULL_EA_INFORMATION` 定长头大小
pub const FULL_EA_HEADER_LEN: usize = 8;

/// `FILE_GET_EA_INFORMATION` 定长头大小
pub const GET_EA_HEADER_LEN: usize = 5;

/// 一条流信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    /// 原始流名称（UTF-16，形如 `:name:$DATA`）
    pub name: Vec<u16>,
    /// 流长度
    pub size: u64,
}

/// 一条 EA 信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EaRecord<'a> {
    /// 标志（FILE_NEED_EA 等）
    pub flags: u8,
    /// EA 名称（不含 NUL）
    pub name: &'a [u8],
    /// EA 值
    pub value: &'a [u8],
}

fn malformed(what: &'static str) -> Error {
    Error::new(ErrorKind::PlatformCallFailed, what)
}

fn read_u32_at(buf: &[u8], offset: usize) -> Result<u32> {
    buf.get(offset..offset + 4)
        .map(LittleEndian::read_u32)
        .ok_or_else(|| malformed("native record field out of bounds"))
}

fn read_u16_at(buf: &[u8], offset: usize) -> Result<u16> {
    buf.get(offset..offset + 2)
        .map(LittleEndian::read_u16)
        .ok_or_else(|| malformed("native record field out of bounds"))
}

fn read_u64_at(buf: &[u8], offset: usize) -> Result<u64> {
    buf.get(offset..offset + 8)
        .map(LittleEndian::read_u64)
        .ok_or_else(|| malformed("native record field out of bounds"))
}

fn read_u8_at(buf: &[u8], offset: usize) -> Result<u8> {
    buf.get(offset)
        .copied()
        .ok_or_else(|| malformed("native record field out of bounds"))
}

/// 沿 `NextEntryOffset` 链遍历记录，返回每条记录的起始偏移
fn walk_chain(buf: &[u8]) -> Result<Vec<usize>> {
    let mut offsets = Vec::new();
    let mut offset = 0usize;

    loop {
        offsets.push(offset);
        let next = read_u32_at(buf, offset)? as usize;
        if next == 0 {
            break;
        }
        offset = offset
            .checked_add(next)
            .filter(|&o| o < buf.len())
            .ok_or_else(|| malformed("NextEntryOffset points past the buffer"))?;
    }

    Ok(offsets)
}

/// 解码 `FILE_STREAM_INFORMATION` 链
pub fn decode_streams(buf: &[u8]) -> Result<Vec<StreamRecord>> {
    if buf.is_empty() {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for offset in walk_chain(buf)? {
        let name_len = read_u32_at(buf, offset + 4)? as usize;
        let size = read_u64_at(buf, offset + 8)?;
        let name_start = offset + STREAM_HEADER_LEN;
        let name_bytes = buf
            .get(name_start..name_start + name_len)
            .ok_or_else(|| malformed("stream name out of bounds"))?;
        if name_len % 2 != 0 {
            log::warn!("[record] odd stream name length {} at offset {}", name_len, offset);
        }
        let name = name_bytes
            .chunks_exact(2)
            .map(LittleEndian::read_u16)
            .collect();
        records.push(StreamRecord { name, size });
    }

    Ok(records)
}

/// 解码单条 `FILE_FULL_EA_INFORMATION`
pub fn decode_full_ea(buf: &[u8], offset: usize) -> Result<EaRecord<'_>> {
    let flags = read_u8_at(buf, offset + 4)?;
    let name_len = read_u8_at(buf, offset + 5)? as usize;
    let value_len = read_u16_at(buf, offset + 6)? as usize;

    let name_start = offset + FULL_EA_HEADER_LEN;
    let value_start = name_start + name_len + 1;
    let name = buf
        .get(name_start..name_start + name_len)
        .ok_or_else(|| malformed("EA name out of bounds"))?;
    let value = buf
        .get(value_start..value_start + value_len)
        .ok_or_else(|| malformed("EA value out of bounds"))?;

    Ok(EaRecord { flags, name, value })
}

/// 解码 `FILE_FULL_EA_INFORMATION` 链
pub fn decode_full_eas(buf: &[u8]) -> Result<Vec<EaRecord<'_>>> {
    if buf.is_empty() {
        return Ok(Vec::new());
    }

    walk_chain(buf)?
        .into_iter()
        .map(|offset| decode_full_ea(buf, offset))
        .collect()
}

fn check_ea_name(name: &[u8]) -> Result<()> {
    if name.len() > EA_NAME_MAX {
        return Err(Error::new(ErrorKind::NameTooLong, "EA name too long").with_name(name));
    }
    Ok(())
}

/// 编码单条 `FILE_FULL_EA_INFORMATION`（用于 NtSetEaFile）
///
/// 值为空时，NT 会删除这条 EA。
pub fn encode_full_ea(name: &[u8], value: &[u8]) -> Result<Vec<u8>> {
    check_ea_name(name)?;
    if value.len() > EA_DATA_MAX {
        return Err(Error::new(ErrorKind::ValueTooLarge, "EA value too large").with_name(name));
    }

    let mut header = [0u8; FULL_EA_HEADER_LEN];
    header[5] = name.len() as u8;
    LittleEndian::write_u16(&mut header[6..8], value.len() as u16);

    let mut buf = Vec::with_capacity(FULL_EA_HEADER_LEN + name.len() + 1 + value.len());
    buf.extend_from_slice(&header);
    buf.extend_from_slice(name);
    buf.push(0);
    buf.extend_from_slice(value);
    Ok(buf)
}

/// 编码单条 `FILE_GET_EA_INFORMATION`（用于 NtQueryEaFile 的 EaList）
pub fn encode_get_ea(name: &[u8]) -> Result<Vec<u8>> {
    check_ea_name(name)?;

    let mut header = [0u8; GET_EA_HEADER_LEN];
    header[4] = name.len() as u8;

    let mut buf = Vec::with_capacity(GET_EA_HEADER_LEN + name.len() + 1);
    buf.extend_from_slice(&header);
    buf.extend_from_slice(name);
    buf.push(0);
    Ok(buf)
}

/// 单条 EA 查询所需的最大缓冲区大小
pub fn full_ea_capacity(name_len: usize) -> usize {
    FULL_EA_HEADER_LEN + name_len + 1 + EA_DATA_MAX
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn stream_record(next: u32, name: &str, size: u64) -> Vec<u8> {
        let wide: Vec<u16> = name.encode_utf16().collect();
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(next).unwrap();
        buf.write_u32::<LittleEndian>((wide.len() * 2) as u32).unwrap();
        buf.write_u64::<LittleEndian>(size).unwrap();
        buf.write_u64::<LittleEndian>(size).unwrap();
        for unit in wide {
            buf.write_u16::<LittleEndian>(unit).unwrap();
        }
        while buf.len() % 8 != 0 {
            buf.push(0);
        }
        buf
    }

    #[test]
    fn test_decode_streams_chain() {
        let first = stream_record(0, "::$DATA", 10);
        let second = stream_record(0, ":comment:$DATA", 5);
        let mut buf = first.clone();
        LittleEndian::write_u32(&mut buf[0..4], first.len() as u32);
        buf.extend_from_slice(&second);

        let records = decode_streams(&buf).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(String::from_utf16_lossy(&records[0].name), "::$DATA");
        assert_eq!(records[1].size, 5);
        assert_eq!(String::from_utf16_lossy(&records[1].name), ":comment:$DATA");
    }

    #[test]
    fn test_decode_streams_rejects_bad_offset() {
        let mut buf = stream_record(0, ":a:$DATA", 1);
        LittleEndian::write_u32(&mut buf[0..4], 4096);
        assert_eq!(decode_streams(&buf).unwrap_err().kind(), ErrorKind::PlatformCallFailed);
    }

    #[test]
    fn test_decode_streams_rejects_name_overrun() {
        let mut buf = stream_record(0, ":a:$DATA", 1);
        LittleEndian::write_u32(&mut buf[4..8], 1000);
        assert!(decode_streams(&buf).is_err());
    }

    #[test]
    fn test_full_ea_encode_decode() {
        let buf = encode_full_ea(b"COMMENT", b"hello").unwrap();
        assert_eq!(buf.len(), FULL_EA_HEADER_LEN + 7 + 1 + 5);
        let record = decode_full_ea(&buf, 0).unwrap();
        assert_eq!(record.name, b"COMMENT");
        assert_eq!(record.value, b"hello");
        assert_eq!(record.flags, 0);
    }

    #[test]
    fn test_full_ea_chain() {
        let mut first = encode_full_ea(b"A", b"1").unwrap();
        while first.len() % 4 != 0 {
            first.push(0);
        }
        let len = first.len() as u32;
        LittleEndian::write_u32(&mut first[0..4], len);
        first.extend_from_slice(&encode_full_ea(b"BB", b"").unwrap());

        let records = decode_full_eas(&first).unwrap();
        let names: Vec<&[u8]> = records.iter().map(|r| r.name).collect();
        assert_eq!(names, vec![&b"A"[..], &b"BB"[..]]);
        assert!(records[1].value.is_empty());
    }

    #[test]
    fn test_full_ea_truncated_value() {
        let mut buf = encode_full_ea(b"NAME", b"value").unwrap();
        buf.truncate(buf.len() - 2);
        assert!(decode_full_ea(&buf, 0).is_err());
    }

    #[test]
    fn test_encode_limits() {
        let long_name = vec![b'a'; EA_NAME_MAX + 1];
        assert_eq!(encode_get_ea(&long_name).unwrap_err().kind(), ErrorKind::NameTooLong);
        let big = vec![0u8; EA_DATA_MAX + 1];
        assert_eq!(encode_full_ea(b"x", &big).unwrap_err().kind(), ErrorKind::ValueTooLarge);
        assert!(encode_full_ea(b"x", &big[..EA_DATA_MAX]).is_ok());
    }

    #[test]
    fn test_full_ea_header_layout() {
        let buf = encode_full_ea(b"AB", &[7u8; 300]).unwrap();
        // NextEntryOffset = 0, Flags = 0, EaNameLength = 2, EaValueLength = 300
        assert_eq!(&buf[..8], &[0, 0, 0, 0, 0, 2, 0x2c, 0x01]);
        assert_eq!(&buf[8..11], b"AB\0");
        assert_eq!(buf.len(), FULL_EA_HEADER_LEN + 2 + 1 + 300);
    }

    #[test]
    fn test_encode_get_ea() {
        let buf = encode_get_ea(b"NAME").unwrap();
        assert_eq!(buf, b"\0\0\0\0\x04NAME\0".to_vec());
    }
}
