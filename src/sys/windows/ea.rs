//! System 命名空间：NT 扩展属性

use std::os::windows::io::{AsRawHandle, BorrowedHandle};

use byteorder::{ByteOrder, LittleEndian};
use windows_sys::Wdk::Storage::FileSystem::{
    FileEaInformation, NtQueryEaFile, NtQueryInformationFile, NtSetEaFile,
};
use windows_sys::Win32::System::IO::IO_STATUS_BLOCK;

use super::{ntstatus_error, Outcome, Request};
use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};
use crate::growth::{BufferGrowth, Fill, Growth};
use crate::ntfs::record::{decode_full_ea, decode_full_eas, encode_full_ea, encode_get_ea, full_ea_capacity};

/// 文件上 EA 的总大小（`FILE_EA_INFORMATION.EaSize`）
fn ea_total(handle: BorrowedHandle<'_>) -> Result<usize> {
    let mut info = [0u8; 4];
    // SAFETY: IO_STATUS_BLOCK 全零是合法初值
    let mut iosb: IO_STATUS_BLOCK = unsafe { core::mem::zeroed() };
    // SAFETY: info 可写 4 字节
    let status = unsafe {
        NtQueryInformationFile(
            handle.as_raw_handle(),
            &mut iosb,
            info.as_mut_ptr().cast(),
            info.len() as u32,
            FileEaInformation,
        )
    };
    if status != STATUS_SUCCESS {
        return Err(ntstatus_error(status, "NtQueryInformationFile(FileEaInformation) failed"));
    }
    Ok(LittleEndian::read_u32(&info) as usize)
}

pub(super) fn list_eas(handle: BorrowedHandle<'_>, _: &Request<'_>) -> Result<Outcome> {
    if ea_total(handle)? == 0 {
        return Ok(Outcome::Names(Vec::new()));
    }

    let buf = BufferGrowth::new(Growth::Double).fill(
        || ea_total(handle).map(|total| total.max(EA_LIST_INITIAL)),
        |buf| {
            // SAFETY: IO_STATUS_BLOCK 全零是合法初值
            let mut iosb: IO_STATUS_BLOCK = unsafe { core::mem::zeroed() };
            // SAFETY: buf 可写 buf.len() 字节；不传 EaList，从头枚举
            let status = unsafe {
                NtQueryEaFile(
                    handle.as_raw_handle(),
                    &mut iosb,
                    buf.as_mut_ptr().cast(),
                    buf.len() as u32,
                    0,
                    core::ptr::null(),
                    0,
                    core::ptr::null(),
                    1,
                )
            };
            match status {
                STATUS_SUCCESS => Ok(Fill::Done(iosb.Information)),
                STATUS_NO_MORE_EAS | STATUS_NO_EAS_ON_FILE => Ok(Fill::Done(0)),
                STATUS_BUFFER_OVERFLOW | STATUS_BUFFER_TOO_SMALL => Ok(Fill::TooSmall(None)),
                status => Err(ntstatus_error(status, "NtQueryEaFile failed")),
            }
        },
    )?;

    let names = decode_full_eas(&buf)?
        .into_iter()
        .filter(|record| !record.name.is_empty())
        .map(|record| {
            log::trace!(
                "[windows::ea] {} flags={:#x} ({} bytes)",
                String::from_utf8_lossy(record.name),
                record.flags,
                record.value.len()
            );
            record.name.to_vec()
        })
        .collect();
    Ok(Outcome::Names(names))
}

/// 读取单条 EA
///
/// 空值与不存在无法区分，一律视为不存在。
fn query_ea(handle: BorrowedHandle<'_>, name: &[u8]) -> Result<Vec<u8>> {
    let query = encode_get_ea(name)?;
    let mut buf = vec![0u8; full_ea_capacity(name.len())];
    // SAFETY: IO_STATUS_BLOCK 全零是合法初值
    let mut iosb: IO_STATUS_BLOCK = unsafe { core::mem::zeroed() };
    // SAFETY: buf 可写，query 在调用期间有效
    let status = unsafe {
        NtQueryEaFile(
            handle.as_raw_handle(),
            &mut iosb,
            buf.as_mut_ptr().cast(),
            buf.len() as u32,
            1,
            query.as_ptr().cast(),
            query.len() as u32,
            core::ptr::null(),
            1,
        )
    };
    match status {
        STATUS_SUCCESS => match decode_full_ea(&buf, 0)?.value {
            // NT 对不存在的名称返回一条空值记录
            [] => Err(ea_not_found(STATUS_NONEXISTENT_EA_ENTRY)),
            value => Ok(value.to_vec()),
        },
        STATUS_NONEXISTENT_EA_ENTRY | STATUS_NO_EAS_ON_FILE | STATUS_NO_MORE_EAS => {
            Err(ea_not_found(status))
        }
        status => Err(ntstatus_error(status, "NtQueryEaFile failed")),
    }
}

fn ea_not_found(status: i32) -> Error {
    Error::new(ErrorKind::AttributeNotFound, "extended attribute not found").with_os_code(status)
}

pub(super) fn read_ea(handle: BorrowedHandle<'_>, request: &Request<'_>) -> Result<Outcome> {
    query_ea(handle, request.name).map(Outcome::Value)
}

pub(super) fn ea_size(handle: BorrowedHandle<'_>, request: &Request<'_>) -> Result<Outcome> {
    query_ea(handle, request.name).map(|value| Outcome::Size(value.len() as u64))
}

fn set_ea(handle: BorrowedHandle<'_>, name: &[u8], value: &[u8]) -> Result<()> {
    let record = encode_full_ea(name, value)?;
    // SAFETY: IO_STATUS_BLOCK 全零是合法初值
    let mut iosb: IO_STATUS_BLOCK = unsafe { core::mem::zeroed() };
    // SAFETY: record 在调用期间有效
    let status = unsafe {
        NtSetEaFile(
            handle.as_raw_handle(),
            &mut iosb,
            record.as_ptr().cast(),
            record.len() as u32,
        )
    };
    if status != STATUS_SUCCESS {
        return Err(ntstatus_error(status, "NtSetEaFile failed"));
    }
    Ok(())
}

pub(super) fn write_ea(handle: BorrowedHandle<'_>, request: &Request<'_>) -> Result<Outcome> {
    set_ea(handle, request.name, request.value).map(|_| Outcome::Done)
}

/// 写入空值即删除；名称不存在时同样成功
pub(super) fn clear_ea(handle: BorrowedHandle<'_>, request: &Request<'_>) -> Result<Outcome> {
    set_ea(handle, request.name, &[]).map(|_| Outcome::Done)
}
