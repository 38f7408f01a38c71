//! BSD extattr 驱动（FreeBSD / DragonFly / NetBSD）
//!
//! 原生接口自带命名空间编号，可移植编号与原生编号一致
//! （user = 1，system = 2），名称不加前缀。
//!
//! `extattr_get_*` 在缓冲区不够时不会报错而是静默截断，所以读满
//! 缓冲区时要再探测一次大小，确认属性没有变大。

use std::ffi::{CStr, CString};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, RawFd};

use libc::{c_int, c_void, size_t};

use super::{errno_error, last_errno, set_errno_error, AttrDriver};
use crate::error::{Error, ErrorKind, Result};
use crate::growth::{BufferGrowth, Fill, Growth};
use crate::listing::decode_counted;
use crate::namespace::{check_name, Namespace};
use crate::target::Target;

/// 原生调用的寻址方式
enum Address {
    /// 文件描述符（`*_fd`）
    Fd(RawFd),
    /// 路径；`follow` 为 false 时使用 `*_link`
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

    /// extattr_get；`buf` 为空时只探测大小
    fn get(&self, ns: c_int, name: &CStr, buf: &mut [u8]) -> isize {
        let (ptr, len) = Self::buf_parts(buf);
        // SAFETY: name 和 path 是有效的 C 字符串，ptr/len 描述一块可写缓冲区（或为空）
        unsafe {
            match self {
                Address::Fd(fd) => libc::extattr_get_fd(*fd, ns, name.as_ptr(), ptr, len) as isize,
                Address::Path { path, follow: true } => {
                    libc::extattr_get_file(path.as_ptr(), ns, name.as_ptr(), ptr, len) as isize
                }
                Address::Path { path, follow: false } => {
                    libc::extattr_get_link(path.as_ptr(), ns, name.as_ptr(), ptr, len) as isize
                }
            }
        }
    }

    /// extattr_list；`buf` 为空时只探测大小
    fn list(&self, ns: c_int, buf: &mut [u8]) -> isize {
        let (ptr, len) = Self::buf_parts(buf);
        // SAFETY: 同上
        unsafe {
            match self {
                Address::Fd(fd) => libc::extattr_list_fd(*fd, ns, ptr, len) as isize,
                Address::Path { path, follow: true } => {
                    libc::extattr_list_file(path.as_ptr(), ns, ptr, len) as isize
                }
                Address::Path { path, follow: false } => {
                    libc::extattr_list_link(path.as_ptr(), ns, ptr, len) as isize
                }
            }
        }
    }

    fn set(&self, ns: c_int, name: &CStr, value: &[u8]) -> isize {
        let ptr = value.as_ptr().cast::<c_void>();
        let len = value.len();
        // SAFETY: value 在调用期间有效，原生调用只读它
        unsafe {
            match self {
                Address::Fd(fd) => libc::extattr_set_fd(*fd, ns, name.as_ptr(), ptr, len) as isize,
                Address::Path { path, follow: true } => {
                    libc::extattr_set_file(path.as_ptr(), ns, name.as_ptr(), ptr, len) as isize
                }
                Address::Path { path, follow: false } => {
                    libc::extattr_set_link(path.as_ptr(), ns, name.as_ptr(), ptr, len) as isize
                }
            }
        }
    }

    fn delete(&self, ns: c_int, name: &CStr) -> isize {
        // SAFETY: name 和 path 是有效的 C 字符串
        unsafe {
            match self {
                Address::Fd(fd) => libc::extattr_delete_fd(*fd, ns, name.as_ptr()) as isize,
                Address::Path { path, follow: true } => {
                    libc::extattr_delete_file(path.as_ptr(), ns, name.as_ptr()) as isize
                }
                Address::Path { path, follow: false } => {
                    libc::extattr_delete_link(path.as_ptr(), ns, name.as_ptr()) as isize
                }
            }
        }
    }
}

fn native_namespace(namespace: Namespace) -> c_int {
    namespace.code() as c_int
}

fn native_name(name: &[u8]) -> Result<CString> {
    check_name(name)?;
    CString::new(name)
        .map_err(|_| Error::new(ErrorKind::InvalidName, "attribute name contains NUL").with_name(name))
}

/// BSD extattr 驱动
pub(crate) struct ExtAttr;

impl ExtAttr {
    fn probe_value(addr: &Address, ns: c_int, name: &CStr) -> Result<usize> {
        match addr.get(ns, name, &mut []) {
            n if n >= 0 => Ok(n as usize),
            _ => Err(errno_error(last_errno(), "extattr_get size probe failed")),
        }
    }
}

impl AttrDriver for ExtAttr {
    const IMPLEMENTATION: &'static str = "extattr";

    fn list(target: &Target<'_>, namespace: Namespace) -> Result<Vec<Vec<u8>>> {
        log::trace!("[extattr::list] {} namespace={}", target, namespace);
        let addr = Address::resolve(target)?;
        let ns = native_namespace(namespace);
        let probe = || match addr.list(ns, &mut []) {
            n if n >= 0 => Ok(n as usize),
            _ => Err(errno_error(last_errno(), "extattr_list size probe failed")),
        };
        let buf = BufferGrowth::new(Growth::Reprobe)
            .fill(probe, |buf| match addr.list(ns, buf) {
                n if n < 0 => Err(errno_error(last_errno(), "extattr_list failed")),
                n if n as usize > buf.len() => Ok(Fill::TooSmall(Some(n as usize))),
                n if n as usize == buf.len() => match probe()? {
                    now if now > buf.len() => Ok(Fill::TooSmall(Some(now))),
                    _ => Ok(Fill::Done(n as usize)),
                },
                n => Ok(Fill::Done(n as usize)),
            })
            .map_err(|e| e.with_target(target))?;
        Ok(decode_counted(&buf))
    }

    fn size(target: &Target<'_>, namespace: Namespace, name: &[u8]) -> Result<u64> {
        log::trace!(
            "[extattr::size] {} {}:{}",
            target,
            namespace,
            String::from_utf8_lossy(name)
        );
        let cname = native_name(name)?;
        let addr = Address::resolve(target)?;
        Self::probe_value(&addr, native_namespace(namespace), &cname)
            .map(|n| n as u64)
            .map_err(|e| e.with_target(target).with_name(name))
    }

    fn get(target: &Target<'_>, namespace: Namespace, name: &[u8]) -> Result<Vec<u8>> {
        log::trace!(
            "[extattr::get] {} {}:{}",
            target,
            namespace,
            String::from_utf8_lossy(name)
        );
        let cname = native_name(name)?;
        let addr = Address::resolve(target)?;
        let ns = native_namespace(namespace);
        BufferGrowth::new(Growth::Reprobe)
            .fill(
                || Self::probe_value(&addr, ns, &cname),
                |buf| match addr.get(ns, &cname, buf) {
                    n if n < 0 => Err(errno_error(last_errno(), "extattr_get failed")),
                    // 空缓冲区时原生调用只返回大小
                    n if n as usize > buf.len() => Ok(Fill::TooSmall(Some(n as usize))),
                    // 读满了：可能被截断，再探测一次
                    n if n as usize == buf.len() => match Self::probe_value(&addr, ns, &cname)? {
                        now if now > buf.len() => Ok(Fill::TooSmall(Some(now))),
                        _ => Ok(Fill::Done(n as usize)),
                    },
                    n => Ok(Fill::Done(n as usize)),
                },
            )
            .map_err(|e| e.with_target(target).with_name(name))
    }

    fn set(target: &Target<'_>, namespace: Namespace, name: &[u8], value: &[u8]) -> Result<()> {
        log::trace!(
            "[extattr::set] {} {}:{} ({} bytes)",
            target,
            namespace,
            String::from_utf8_lossy(name),
            value.len()
        );
        let cname = native_name(name)?;
        let addr = Address::resolve(target)?;
        if addr.set(native_namespace(namespace), &cname, value) < 0 {
            return Err(set_errno_error(last_errno(), "extattr_set failed")
                .with_target(target)
                .with_name(name));
        }
        Ok(())
    }

    fn delete(target: &Target<'_>, namespace: Namespace, name: &[u8]) -> Result<()> {
        log::trace!(
            "[extattr::delete] {} {}:{}",
            target,
            namespace,
            String::from_utf8_lossy(name)
        );
        let cname = native_name(name)?;
        let addr = Address::resolve(target)?;
        if addr.delete(native_namespace(namespace), &cname) < 0 {
            return Err(errno_error(last_errno(), "extattr_delete failed")
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
    fn test_native_namespace_codes() {
        assert_eq!(native_namespace(Namespace::User), libc::EXTATTR_NAMESPACE_USER);
        assert_eq!(native_namespace(Namespace::System), libc::EXTATTR_NAMESPACE_SYSTEM);
    }

    #[test]
    fn test_native_name_rejects_empty() {
        assert_eq!(native_name(b"").unwrap_err().kind(), ErrorKind::InvalidName);
        assert_eq!(native_name(b"comment").unwrap().as_bytes(), b"comment");
    }
}
