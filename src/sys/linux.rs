//! POSIX xattr 驱动（Linux / Android）
//!
//! 原生名称空间是扁平的，命名空间通过 `user.` / `system.` 前缀模拟：
//! 调用前加前缀，列表时按前缀过滤并去掉前缀。
//!
//! 三种寻址方式共用一套操作，由 [`Address`] 在调用点选择
//! `f*xattr`、`*xattr` 或 `l*xattr`。

use std::ffi::{CStr, CString};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, RawFd};

use libc::{c_void, size_t, ssize_t};

use super::{errno_error, last_errno, set_errno_error, AttrDriver};
use crate::consts::XATTR_NAME_MAX;
use crate::error::{Error, ErrorKind, Result};
use crate::growth::{BufferGrowth, Fill, Growth};
use crate::listing::decode_flat;
use crate::namespace::{check_name, prefixed_name, Namespace};
use crate::target::Target;

/// 原生调用的寻址方式
enum Address {
    /// 文件描述符
    Fd(RawFd),
    /// 路径；`follow` 为 false 时使用 `l*` 系列
    Path { path: CString, follow: bool },
}

impl Address {
    fn resolve(target: &Target<'_>) -> Result<Self> {
        match target {
            Target::File(file) => Ok(Address::Fd(file.as_raw_fd())),
            Target::Path { path, follow_symlinks } => {
                let path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
                    Error::new(ErrorKind::TargetUnavailable, "path contains NUL byte")
                        .with_target(target)
                })?;
                Ok(Address::Path {
                    path,
                    follow: *follow_symlinks,
                })
            }
        }
    }

    fn buf_parts(buf: &mut [u8]) -> (*mut c_void, size_t) {
        if buf.is_empty() {
            (core::ptr::null_mut(), 0)
        } else {
            (buf.as_mut_ptr().cast(), buf.len())
        }
    }

    /// getxattr；`buf` 为空时只探测大小
    fn get(&self, name: &CStr, buf: &mut [u8]) -> ssize_t {
        let (ptr, len) = Self::buf_parts(buf);
        // SAFETY: name 和 path 是有效的 C 字符串，ptr/len 描述一块可写缓冲区（或为空）
        unsafe {
            match self {
                Address::Fd(fd) => libc::fgetxattr(*fd, name.as_ptr(), ptr, len),
                Address::Path { path, follow: true } => {
                    libc::getxattr(path.as_ptr(), name.as_ptr(), ptr, len)
                }
                Address::Path { path, follow: false } => {
                    libc::lgetxattr(path.as_ptr(), name.as_ptr(), ptr, len)
                }
            }
        }
    }

    /// listxattr；`buf` 为空时只探测大小
    fn list(&self, buf: &mut [u8]) -> ssize_t {
        let (ptr, len) = Self::buf_parts(buf);
        let ptr = ptr.cast::<libc::c_char>();
        // SAFETY: 同上
        unsafe {
            match self {
                Address::Fd(fd) => libc::flistxattr(*fd, ptr, len),
                Address::Path { path, follow: true } => libc::listxattr(path.as_ptr(), ptr, len),
                Address::Path { path, follow: false } => libc::llistxattr(path.as_ptr(), ptr, len),
            }
        }
    }

    /// setxattr，flags 为 0：不存在则创建，存在则替换
    fn set(&self, name: &CStr, value: &[u8]) -> libc::c_int {
        let ptr = value.as_ptr().cast::<c_void>();
        let len = value.len();
        // SAFETY: value 在调用期间有效，原生调用只读它
        unsafe {
            match self {
                Address::Fd(fd) => libc::fsetxattr(*fd, name.as_ptr(), ptr, len, 0),
                Address::Path { path, follow: true } => {
                    libc::setxattr(path.as_ptr(), name.as_ptr(), ptr, len, 0)
                }
                Address::Path { path, follow: false } => {
                    libc::lsetxattr(path.as_ptr(), name.as_ptr(), ptr, len, 0)
                }
            }
        }
    }

    fn remove(&self, name: &CStr) -> libc::c_int {
        // SAFETY: name 和 path 是有效的 C 字符串
        unsafe {
            match self {
                Address::Fd(fd) => libc::fremovexattr(*fd, name.as_ptr()),
                Address::Path { path, follow: true } => libc::removexattr(path.as_ptr(), name.as_ptr()),
                Address::Path { path, follow: false } => {
                    libc::lremovexattr(path.as_ptr(), name.as_ptr())
                }
            }
        }
    }
}

/// 构造带前缀的原生名称
fn native_name(namespace: Namespace, name: &[u8]) -> Result<CString> {
    check_name(name)?;
    let full = prefixed_name(namespace, name);
    if full.len() > XATTR_NAME_MAX {
        return Err(Error::new(ErrorKind::NameTooLong, "xattr name too long").with_name(name));
    }
    CString::new(full)
        .map_err(|_| Error::new(ErrorKind::InvalidName, "attribute name contains NUL").with_name(name))
}

/// POSIX xattr 驱动
pub(crate) struct Xattr;

impl Xattr {
    fn read_value(addr: &Address, name: &CStr) -> Result<Vec<u8>> {
        BufferGrowth::new(Growth::Reprobe).fill(
            || match addr.get(name, &mut []) {
                n if n >= 0 => Ok(n as usize),
                _ => Err(errno_error(last_errno(), "getxattr size probe failed")),
            },
            |buf| match addr.get(name, buf) {
                // 空缓冲区时原生调用只返回大小
                n if n >= 0 && n as usize > buf.len() => Ok(Fill::TooSmall(Some(n as usize))),
                n if n >= 0 => Ok(Fill::Done(n as usize)),
                _ => match last_errno() {
                    libc::ERANGE => Ok(Fill::TooSmall(None)),
                    errno => Err(errno_error(errno, "getxattr failed")),
                },
            },
        )
    }
}

impl AttrDriver for Xattr {
    const IMPLEMENTATION: &'static str = "xattr";

    fn list(target: &Target<'_>, namespace: Namespace) -> Result<Vec<Vec<u8>>> {
        log::trace!("[xattr::list] {} namespace={}", target, namespace);
        let addr = Address::resolve(target)?;
        let buf = BufferGrowth::new(Growth::Reprobe)
            .fill(
                || match addr.list(&mut []) {
                    n if n >= 0 => Ok(n as usize),
                    _ => Err(errno_error(last_errno(), "listxattr size probe failed")),
                },
                |buf| match addr.list(buf) {
                    n if n >= 0 && n as usize > buf.len() => Ok(Fill::TooSmall(Some(n as usize))),
                    n if n >= 0 => Ok(Fill::Done(n as usize)),
                    _ => match last_errno() {
                        libc::ERANGE => Ok(Fill::TooSmall(None)),
                        errno => Err(errno_error(errno, "listxattr failed")),
                    },
                },
            )
            .map_err(|e| e.with_target(target))?;
        Ok(decode_flat(&buf, namespace))
    }

    fn size(target: &Target<'_>, namespace: Namespace, name: &[u8]) -> Result<u64> {
        log::trace!(
            "[xattr::size] {} {}.{}",
            target,
            namespace,
            String::from_utf8_lossy(name)
        );
        let full = native_name(namespace, name)?;
        let addr = Address::resolve(target)?;
        match addr.get(&full, &mut []) {
            n if n >= 0 => Ok(n as u64),
            _ => Err(errno_error(last_errno(), "getxattr size probe failed")
                .with_target(target)
                .with_name(name)),
        }
    }

    fn get(target: &Target<'_>, namespace: Namespace, name: &[u8]) -> Result<Vec<u8>> {
        log::trace!(
            "[xattr::get] {} {}.{}",
            target,
            namespace,
            String::from_utf8_lossy(name)
        );
        let full = native_name(namespace, name)?;
        let addr = Address::resolve(target)?;
        Self::read_value(&addr, &full).map_err(|e| e.with_target(target).with_name(name))
    }

    fn set(target: &Target<'_>, namespace: Namespace, name: &[u8], value: &[u8]) -> Result<()> {
        log::trace!(
            "[xattr::set] {} {}.{} ({} bytes)",
            target,
            namespace,
            String::from_utf8_lossy(name),
            value.len()
        );
        let full = native_name(namespace, name)?;
        let addr = Address::resolve(target)?;
        if addr.set(&full, value) < 0 {
            return Err(set_errno_error(last_errno(), "setxattr failed")
                .with_target(target)
                .with_name(name));
        }
        Ok(())
    }

    fn delete(target: &Target<'_>, namespace: Namespace, name: &[u8]) -> Result<()> {
        log::trace!(
            "[xattr::delete] {} {}.{}",
            target,
            namespace,
            String::from_utf8_lossy(name)
        );
        let full = native_name(namespace, name)?;
        let addr = Address::resolve(target)?;
        if addr.remove(&full) < 0 {
            return Err(errno_error(last_errno(), "removexattr failed")
                .with_target(target)
                .with_name(name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_name_prefixes() {
        let name = native_name(Namespace::User, b"comment").unwrap();
        assert_eq!(name.as_bytes(), b"user.comment");
        let name = native_name(Namespace::System, b"posix_acl_access").unwrap();
        assert_eq!(name.as_bytes(), b"system.posix_acl_access");
    }

    #[test]
    fn test_native_name_limits() {
        // "user." 占 5 字节
        let ok = vec![b'a'; XATTR_NAME_MAX - 5];
        assert!(native_name(Namespace::User, &ok).is_ok());
        let long = vec![b'a'; XATTR_NAME_MAX - 4];
        assert_eq!(
            native_name(Namespace::User, &long).unwrap_err().kind(),
            ErrorKind::NameTooLong
        );
        assert_eq!(native_name(Namespace::User, b"").unwrap_err().kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn test_missing_path_is_target_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let err = Xattr::list(&Target::path(&missing), Namespace::User).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TargetUnavailable);
        assert_eq!(err.os_code(), Some(libc::ENOENT));
    }
}
