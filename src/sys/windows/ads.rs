//! User 命名空间：NTFS 备用数据流
//!
//! 每个属性是文件上的一个命名流 `path:name`。句柄由调用方按操作
//! 特性打开，这里只在句柄上读写。

use std::os::windows::io::{AsRawHandle, BorrowedHandle};

use windows_sys::Wdk::Storage::FileSystem::{FileStreamInformation, NtQueryInformationFile};
use windows_sys::Win32::Storage::FileSystem::{
    GetFileInformationByHandle, ReadFile, SetFilePointerEx, WriteFile, BY_HANDLE_FILE_INFORMATION,
    FILE_BEGIN,
};
use windows_sys::Win32::System::IO::IO_STATUS_BLOCK;

use super::{last_win32_error, ntstatus_error, Outcome, Request};
use crate::consts::{ADS_DATA_MAX, STATUS_BUFFER_OVERFLOW, STATUS_BUFFER_TOO_SMALL, STATUS_SUCCESS, STREAM_LIST_INITIAL};
use crate::error::{Error, ErrorKind, Result};
use crate::growth::{BufferGrowth, Fill, Growth};
use crate::ntfs::record::decode_streams;
use crate::ntfs::wide::stream_attr_name;

/// 枚举文件上的命名流
pub(super) fn list_streams(handle: BorrowedHandle<'_>, _: &Request<'_>) -> Result<Outcome> {
    let buf = BufferGrowth::new(Growth::Double).fill(
        || Ok(STREAM_LIST_INITIAL),
        |buf| {
            // SAFETY: IO_STATUS_BLOCK 全零是合法初值
            let mut iosb: IO_STATUS_BLOCK = unsafe { core::mem::zeroed() };
            // SAFETY: buf 可写 buf.len() 字节
            let status = unsafe {
                NtQueryInformationFile(
                    handle.as_raw_handle(),
                    &mut iosb,
                    buf.as_mut_ptr().cast(),
                    buf.len() as u32,
                    FileStreamInformation,
                )
            };
            match status {
                STATUS_SUCCESS => Ok(Fill::Done(iosb.Information)),
                STATUS_BUFFER_OVERFLOW | STATUS_BUFFER_TOO_SMALL => Ok(Fill::TooSmall(None)),
                status => Err(ntstatus_error(status, "NtQueryInformationFile(FileStreamInformation) failed")),
            }
        },
    )?;

    let names = decode_streams(&buf)?
        .into_iter()
        .filter_map(|record| {
            let name = stream_attr_name(&record.name)?;
            log::trace!(
                "[windows::ads] stream {} ({} bytes)",
                String::from_utf8_lossy(&name),
                record.size
            );
            Some(name)
        })
        .collect();
    Ok(Outcome::Names(names))
}

fn stream_len(handle: BorrowedHandle<'_>) -> Result<u64> {
    // SAFETY: 全零是合法初值
    let mut info: BY_HANDLE_FILE_INFORMATION = unsafe { core::mem::zeroed() };
    // SAFETY: info 是有效的输出缓冲区
    if unsafe { GetFileInformationByHandle(handle.as_raw_handle(), &mut info) } == 0 {
        return Err(last_win32_error("GetFileInformationByHandle failed"));
    }
    Ok(((info.nFileSizeHigh as u64) << 32) | info.nFileSizeLow as u64)
}

pub(super) fn stream_size(handle: BorrowedHandle<'_>, _: &Request<'_>) -> Result<Outcome> {
    stream_len(handle).map(Outcome::Size)
}

/// 流长度；超过 ADS 上限时报错
fn bounded_stream_len(handle: BorrowedHandle<'_>) -> Result<usize> {
    match stream_len(handle)? {
        len if len > ADS_DATA_MAX as u64 => {
            Err(Error::new(ErrorKind::ValueTooLarge, "alternate data stream too large"))
        }
        len => Ok(len as usize),
    }
}

fn rewind(handle: BorrowedHandle<'_>) -> Result<()> {
    // SAFETY: 只移动文件指针
    if unsafe { SetFilePointerEx(handle.as_raw_handle(), 0, core::ptr::null_mut(), FILE_BEGIN) } == 0 {
        return Err(last_win32_error("SetFilePointerEx failed"));
    }
    Ok(())
}

pub(super) fn read_stream(handle: BorrowedHandle<'_>, _: &Request<'_>) -> Result<Outcome> {
    let value = BufferGrowth::new(Growth::Reprobe).fill(
        || bounded_stream_len(handle),
        |buf| {
            rewind(handle)?;
            let mut total = 0usize;
            while total < buf.len() {
                let mut read = 0u32;
                let chunk = &mut buf[total..];
                // SAFETY: chunk 可写 chunk.len() 字节
                let ok = unsafe {
                    ReadFile(
                        handle.as_raw_handle(),
                        chunk.as_mut_ptr(),
                        chunk.len() as u32,
                        &mut read,
                        core::ptr::null_mut(),
                    )
                };
                if ok == 0 {
                    return Err(last_win32_error("ReadFile failed"));
                }
                if read == 0 {
                    break;
                }
                total += read as usize;
            }
            // 读满了：流可能在探测之后变长，再探测一次
            if total == buf.len() {
                let now = bounded_stream_len(handle)?;
                if now > buf.len() {
                    return Ok(Fill::TooSmall(Some(now)));
                }
            }
            Ok(Fill::Done(total))
        },
    )?;
    Ok(Outcome::Value(value))
}

/// 句柄以 CREATE_ALWAYS 打开，旧内容已被截断
pub(super) fn write_stream(handle: BorrowedHandle<'_>, request: &Request<'_>) -> Result<Outcome> {
    let mut rest = request.value;
    while !rest.is_empty() {
        let mut written = 0u32;
        // SAFETY: rest 在调用期间有效
        let ok = unsafe {
            WriteFile(
                handle.as_raw_handle(),
                rest.as_ptr(),
                rest.len() as u32,
                &mut written,
                core::ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(last_win32_error("WriteFile failed"));
        }
        if written == 0 {
            return Err(Error::new(ErrorKind::PlatformCallFailed, "WriteFile made no progress"));
        }
        rest = &rest[written as usize..];
    }
    Ok(Outcome::Done)
}

/// 句柄带 DELETE_ON_CLOSE 打开，关闭时流被删除
pub(super) fn delete_stream(_: BorrowedHandle<'_>, request: &Request<'_>) -> Result<Outcome> {
    log::debug!(
        "[windows::ads] stream {} removed on close",
        String::from_utf8_lossy(request.name)
    );
    Ok(Outcome::Done)
}
