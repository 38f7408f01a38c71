//! Windows 驱动：属性存储选择
//!
//! Windows 上没有原生的扩展属性命名空间，两个命名空间分别落到两种
//! 不同的存储：
//!
//! - User → NTFS 备用数据流（ADS），每个属性一个流，`path:name`
//! - System → NT 扩展属性（EA），文件上独立的属性表
//!
//! 每个 (操作, 存储) 组合对应一条 [`OpTraits`]：打开方式、创建方式、
//! 以及在句柄上执行的处理函数。调用时查表一次，不做虚分派。

mod ads;
mod ea;

use std::os::windows::ffi::OsStrExt;
use std::os::windows::io::{AsHandle, AsRawHandle, BorrowedHandle, FromRawHandle, OwnedHandle};
use std::path::Path;

use bitflags::bitflags;
use windows_sys::Win32::Foundation::{
    GetLastError, RtlNtStatusToDosError, ERROR_ACCESS_DENIED, ERROR_FILENAME_EXCED_RANGE,
    ERROR_FILE_NOT_FOUND, ERROR_INVALID_NAME, ERROR_PATH_NOT_FOUND, GENERIC_READ, GENERIC_WRITE,
    INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, GetFinalPathNameByHandleW, CREATE_ALWAYS, DELETE as DELETE_ACCESS,
    FILE_FLAG_BACKUP_SEMANTICS,
    FILE_FLAG_DELETE_ON_CLOSE, FILE_FLAG_OPEN_REPARSE_POINT, FILE_NAME_NORMALIZED,
    FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING, VOLUME_NAME_DOS,
};

use super::AttrDriver;
use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};
use crate::namespace::{check_name, Namespace};
use crate::ntfs::wide;
use crate::target::Target;

/// 属性存储
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Store {
    /// NTFS 备用数据流
    Ads,
    /// NT 扩展属性
    Ea,
}

impl Store {
    /// (名称上限, 值上限)
    fn limits(self) -> (usize, usize) {
        match self {
            Store::Ads => (ADS_NAME_MAX, ADS_DATA_MAX),
            Store::Ea => (EA_NAME_MAX, EA_DATA_MAX),
        }
    }
}

/// 命名空间到存储的固定映射
pub(crate) fn route(namespace: Namespace) -> Store {
    match namespace {
        Namespace::User => Store::Ads,
        Namespace::System => Store::Ea,
    }
}

/// 操作种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    List,
    Size,
    Get,
    Set,
    Delete,
}

bitflags! {
    /// 打开句柄时请求的访问权限
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Access: u32 {
        const READ   = GENERIC_READ;
        const WRITE  = GENERIC_WRITE;
        const DELETE = DELETE_ACCESS;
    }
}

bitflags! {
    /// 打开句柄时附加的标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct OpenFlags: u32 {
        /// 总是带上，目录也能打开
        const BACKUP_SEMANTICS   = FILE_FLAG_BACKUP_SEMANTICS;
        /// 操作链接本身
        const OPEN_REPARSE_POINT = FILE_FLAG_OPEN_REPARSE_POINT;
        /// 关闭句柄时删除（用于删除 ADS）
        const DELETE_ON_CLOSE    = FILE_FLAG_DELETE_ON_CLOSE;
    }
}

/// 创建方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    OpenExisting,
    CreateAlways,
}

impl Disposition {
    fn native(self) -> u32 {
        match self {
            Disposition::OpenExisting => OPEN_EXISTING,
            Disposition::CreateAlways => CREATE_ALWAYS,
        }
    }
}

/// 处理函数的输入
pub(crate) struct Request<'a> {
    pub name: &'a [u8],
    pub value: &'a [u8],
}

/// 处理函数的输出
#[derive(Debug)]
pub(crate) enum Outcome {
    Names(Vec<Vec<u8>>),
    Size(u64),
    Value(Vec<u8>),
    Done,
}

type Handler = fn(BorrowedHandle<'_>, &Request<'_>) -> Result<Outcome>;

/// 一个 (操作, 存储) 组合的打开方式和处理函数
#[derive(Clone, Copy)]
pub(crate) struct OpTraits {
    access: Access,
    disposition: Disposition,
    flags: OpenFlags,
    handler: Handler,
}

/// 查表得到操作特性
pub(crate) fn op_traits(op: Op, store: Store) -> OpTraits {
    use Disposition::*;

    fn entry(access: Access, disposition: Disposition, flags: OpenFlags, handler: Handler) -> OpTraits {
        OpTraits {
            access,
            disposition,
            flags: flags | OpenFlags::BACKUP_SEMANTICS,
            handler,
        }
    }
    let none = OpenFlags::empty();

    match (store, op) {
        (Store::Ads, Op::List) => entry(Access::READ, OpenExisting, none, ads::list_streams),
        (Store::Ads, Op::Size) => entry(Access::READ, OpenExisting, none, ads::stream_size),
        (Store::Ads, Op::Get) => entry(Access::READ, OpenExisting, none, ads::read_stream),
        (Store::Ads, Op::Set) => entry(Access::WRITE, CreateAlways, none, ads::write_stream),
        (Store::Ads, Op::Delete) => entry(Access::DELETE, OpenExisting, OpenFlags::DELETE_ON_CLOSE, ads::delete_stream),
        (Store::Ea, Op::List) => entry(Access::READ, OpenExisting, none, ea::list_eas),
        (Store::Ea, Op::Size) => entry(Access::READ, OpenExisting, none, ea::ea_size),
        (Store::Ea, Op::Get) => entry(Access::READ, OpenExisting, none, ea::read_ea),
        (Store::Ea, Op::Set) => entry(Access::WRITE, OpenExisting, none, ea::write_ea),
        // NT EA 没有删除接口：写入空值
        (Store::Ea, Op::Delete) => entry(Access::WRITE, OpenExisting, none, ea::clear_ea),
    }
}

/// Win32 错误码映射为错误
pub(crate) fn win32_error(code: u32, message: &'static str) -> Error {
    let kind = match code {
        ERROR_PATH_NOT_FOUND | ERROR_ACCESS_DENIED | ERROR_INVALID_NAME | ERROR_FILE_NOT_FOUND => {
            ErrorKind::TargetUnavailable
        }
        ERROR_FILENAME_EXCED_RANGE => ErrorKind::NameTooLong,
        _ => ErrorKind::PlatformCallFailed,
    };
    Error::new(kind, message).with_os_code(code as i32)
}

/// 最近一次 Win32 调用的错误
pub(crate) fn last_win32_error(message: &'static str) -> Error {
    // SAFETY: 无参数的线程局部查询
    let code = unsafe { GetLastError() };
    win32_error(code, message)
}

/// NTSTATUS 映射为错误
pub(crate) fn ntstatus_error(status: i32, message: &'static str) -> Error {
    if status == STATUS_EA_TOO_LARGE {
        return Error::new(ErrorKind::ValueTooLarge, message).with_os_code(status);
    }
    // SAFETY: 纯转换函数
    let code = unsafe { RtlNtStatusToDosError(status) };
    win32_error(code, message)
}

/// 路径转为原生宽字符（分隔符规范化，NUL 结尾）
fn path_to_wide(path: &Path) -> Vec<u16> {
    if let Some(text) = path.to_str() {
        return wide::to_wide_path(text);
    }
    // 不是合法 Unicode 的路径按原始 UTF-16 传递
    let mut wide: Vec<u16> = path.as_os_str().encode_wide().collect();
    wide::normalize_separators(&mut wide);
    wide.push(0);
    wide
}

/// 取得句柄对应文件的完整路径（`\\?\C:\...` 形式）
fn final_path(handle: BorrowedHandle<'_>) -> Result<Vec<u16>> {
    let mut buf = vec![0u16; WIDE_PATH_MAX];
    // SAFETY: buf 可写 WIDE_PATH_MAX 个单元
    let len = unsafe {
        GetFinalPathNameByHandleW(
            handle.as_raw_handle(),
            buf.as_mut_ptr(),
            buf.len() as u32,
            FILE_NAME_NORMALIZED | VOLUME_NAME_DOS,
        )
    } as usize;
    if len == 0 {
        return Err(last_win32_error("GetFinalPathNameByHandleW failed"));
    }
    if len >= buf.len() {
        return Err(Error::new(ErrorKind::TargetUnavailable, "file path too long"));
    }
    buf.truncate(len);
    buf.push(0);
    log::trace!("[windows] handle resolved to {}", wide::from_wide_path(&buf));
    Ok(buf)
}

/// 按操作特性打开一个临时句柄，离开作用域时关闭
fn open(path: &[u16], traits: &OpTraits, follow_symlinks: bool) -> Result<OwnedHandle> {
    let mut flags = traits.flags;
    if !follow_symlinks {
        flags |= OpenFlags::OPEN_REPARSE_POINT;
    }

    // SAFETY: path 以 NUL 结尾
    let raw = unsafe {
        CreateFileW(
            path.as_ptr(),
            traits.access.bits(),
            FILE_SHARE_DELETE | FILE_SHARE_READ | FILE_SHARE_WRITE,
            core::ptr::null(),
            traits.disposition.native(),
            flags.bits(),
            core::ptr::null_mut(),
        )
    };
    if raw == INVALID_HANDLE_VALUE {
        return Err(last_win32_error("CreateFileW failed"));
    }
    // SAFETY: raw 是刚打开的有效句柄，所有权转交给 OwnedHandle
    Ok(unsafe { OwnedHandle::from_raw_handle(raw) })
}

/// 目标文件本身是否存在
fn base_exists(target: &Target<'_>) -> bool {
    match target {
        Target::File(_) => true,
        Target::Path { path, follow_symlinks: true } => path.metadata().is_ok(),
        Target::Path { path, follow_symlinks: false } => path.symlink_metadata().is_ok(),
    }
}

/// 执行一次操作
fn run(target: &Target<'_>, namespace: Namespace, op: Op, name: &[u8], value: &[u8]) -> Result<Outcome> {
    let store = route(namespace);
    let traits = op_traits(op, store);

    if op != Op::List {
        check_name(name)?;
        let (name_max, data_max) = store.limits();
        if name.len() > name_max {
            return Err(Error::new(ErrorKind::NameTooLong, "attribute name too long").with_name(name));
        }
        // 在打开（可能截断）之前检查，保证旧值不变
        if op == Op::Set && value.len() > data_max {
            return Err(Error::new(ErrorKind::ValueTooLarge, "attribute value too large").with_name(name));
        }
    }

    let request = Request { name, value };
    let follow = target.follow_symlinks();

    match (store, target) {
        (Store::Ads, _) => {
            let base = match target {
                Target::File(file) => final_path(file.as_handle())?,
                Target::Path { path, .. } => path_to_wide(path),
            };
            let path = if op == Op::List {
                base
            } else {
                wide::join_stream_path(&base, name)
            };
            let handle = open(&path, &traits, follow).map_err(|e| {
                // 文件本身存在时，找不到的是流
                let stream_missing = op != Op::List
                    && e.os_code() == Some(ERROR_FILE_NOT_FOUND as i32)
                    && base_exists(target);
                if stream_missing {
                    Error::new(ErrorKind::AttributeNotFound, "alternate data stream not found")
                        .with_os_code(ERROR_FILE_NOT_FOUND as i32)
                } else {
                    e
                }
            })?;
            (traits.handler)(handle.as_handle(), &request)
        }
        (Store::Ea, Target::File(file)) => (traits.handler)(file.as_handle(), &request),
        (Store::Ea, Target::Path { path, .. }) => {
            let handle = open(&path_to_wide(path), &traits, follow)?;
            (traits.handler)(handle.as_handle(), &request)
        }
    }
}

fn unexpected(outcome: Outcome) -> Error {
    log::warn!("[windows] unexpected handler outcome {:?}", outcome);
    Error::new(ErrorKind::PlatformCallFailed, "unexpected handler outcome")
}

/// Windows 驱动（ADS + EA）
pub(crate) struct NtStores;

impl AttrDriver for NtStores {
    const IMPLEMENTATION: &'static str = "windows";

    fn list(target: &Target<'_>, namespace: Namespace) -> Result<Vec<Vec<u8>>> {
        log::trace!("[windows::list] {} namespace={}", target, namespace);
        match run(target, namespace, Op::List, &[], &[]).map_err(|e| e.with_target(target))? {
            Outcome::Names(names) => Ok(names),
            other => Err(unexpected(other)),
        }
    }

    fn size(target: &Target<'_>, namespace: Namespace, name: &[u8]) -> Result<u64> {
        log::trace!("[windows::size] {} {}:{}", target, namespace, String::from_utf8_lossy(name));
        match run(target, namespace, Op::Size, name, &[])
            .map_err(|e| e.with_target(target).with_name(name))?
        {
            Outcome::Size(size) => Ok(size),
            other => Err(unexpected(other)),
        }
    }

    fn get(target: &Target<'_>, namespace: Namespace, name: &[u8]) -> Result<Vec<u8>> {
        log::trace!("[windows::get] {} {}:{}", target, namespace, String::from_utf8_lossy(name));
        match run(target, namespace, Op::Get, name, &[])
            .map_err(|e| e.with_target(target).with_name(name))?
        {
            Outcome::Value(value) => Ok(value),
            other => Err(unexpected(other)),
        }
    }

    fn set(target: &Target<'_>, namespace: Namespace, name: &[u8], value: &[u8]) -> Result<()> {
        log::trace!(
            "[windows::set] {} {}:{} ({} bytes)",
            target,
            namespace,
            String::from_utf8_lossy(name),
            value.len()
        );
        run(target, namespace, Op::Set, name, value)
            .map_err(|e| e.with_target(target).with_name(name))
            .map(|_| ())
    }

    fn delete(target: &Target<'_>, namespace: Namespace, name: &[u8]) -> Result<()> {
        log::trace!("[windows::delete] {} {}:{}", target, namespace, String::from_utf8_lossy(name));
        run(target, namespace, Op::Delete, name, &[])
            .map_err(|e| e.with_target(target).with_name(name))
            .map(|_| ())
    }
}
