//! 平台扩展属性驱动
//!
//! 每个平台一个驱动，实现同一组五个操作：
//!
//! - `linux` - POSIX xattr（扁平名称空间，用 `user.`/`system.` 前缀模拟命名空间）
//! - `bsd` - BSD extattr（原生命名空间编号）
//! - `windows` - NTFS ADS（User）与 NT EA（System）
//! - `unsupported` - 其他平台，所有操作返回 [`ErrorKind::Unsupported`]
//!
//! [`ErrorKind::Unsupported`]: crate::ErrorKind::Unsupported

use crate::error::Result;
use crate::namespace::Namespace;
use crate::target::Target;

/// 扩展属性驱动接口
///
/// 驱动不持有状态，所有操作都是关联函数。对于相同输入，各驱动的
/// 行为必须一致（Windows EA 的删除语义除外）。
pub(crate) trait AttrDriver {
    /// 实现名称
    const IMPLEMENTATION: &'static str;

    /// 列出命名空间下的所有属性名
    fn list(target: &Target<'_>, namespace: Namespace) -> Result<Vec<Vec<u8>>>;

    /// 属性值长度
    fn size(target: &Target<'_>, namespace: Namespace, name: &[u8]) -> Result<u64>;

    /// 读取属性值
    fn get(target: &Target<'_>, namespace: Namespace, name: &[u8]) -> Result<Vec<u8>>;

    /// 创建或替换属性值
    fn set(target: &Target<'_>, namespace: Namespace, name: &[u8], value: &[u8]) -> Result<()>;

    /// 删除属性
    fn delete(target: &Target<'_>, namespace: Namespace, name: &[u8]) -> Result<()>;
}

#[cfg(any(target_os = "linux", target_os = "android"))]
mod linux;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) use linux::Xattr as Native;

#[cfg(any(target_os = "freebsd", target_os = "dragonfly", target_os = "netbsd"))]
mod bsd;
#[cfg(any(target_os = "freebsd", target_os = "dragonfly", target_os = "netbsd"))]
pub(crate) use bsd::ExtAttr as Native;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub(crate) use windows::NtStores as Native;

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    windows
)))]
mod unsupported;
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    windows
)))]
pub(crate) use unsupported::Unsupported as Native;

/// 把 errno 映射为错误
#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd"
))]
pub(crate) fn errno_error(errno: i32, message: &'static str) -> crate::Error {
    use crate::ErrorKind;

    #[cfg(any(target_os = "linux", target_os = "android"))]
    const ENOATTR: i32 = libc::ENODATA;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    const ENOATTR: i32 = libc::ENOATTR;

    let kind = match errno {
        ENOATTR => ErrorKind::AttributeNotFound,
        libc::E2BIG => ErrorKind::ValueTooLarge,
        libc::ENAMETOOLONG => ErrorKind::NameTooLong,
        libc::ENOENT | libc::ENOTDIR | libc::EACCES | libc::ELOOP | libc::EBADF => {
            ErrorKind::TargetUnavailable
        }
        _ => ErrorKind::PlatformCallFailed,
    };
    crate::Error::new(kind, message).with_os_code(errno)
}

/// 写入失败时的 errno 映射
///
/// 存储放不下新值（ext4 inode 内/属性块空间不足）报告为 `ENOSPC`，
/// 归为 `ValueTooLarge`。
#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd"
))]
pub(crate) fn set_errno_error(errno: i32, message: &'static str) -> crate::Error {
    match errno {
        libc::ENOSPC => crate::Error::new(crate::ErrorKind::ValueTooLarge, message).with_os_code(errno),
        _ => errno_error(errno, message),
    }
}

/// 当前线程最近一次的 errno
#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd"
))]
pub(crate) fn last_errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

#[cfg(all(
    test,
    any(
        target_os = "linux",
        target_os = "android",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "netbsd"
    )
))]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(errno_error(libc::E2BIG, "x").kind(), ErrorKind::ValueTooLarge);
        assert_eq!(errno_error(libc::ENOENT, "x").kind(), ErrorKind::TargetUnavailable);
        assert_eq!(errno_error(libc::ENOSPC, "x").kind(), ErrorKind::PlatformCallFailed);
    }

    #[test]
    fn test_set_errno_mapping() {
        let err = set_errno_error(libc::ENOSPC, "setxattr failed");
        assert_eq!(err.kind(), ErrorKind::ValueTooLarge);
        assert_eq!(err.os_code(), Some(libc::ENOSPC));
        assert_eq!(set_errno_error(libc::E2BIG, "x").kind(), ErrorKind::ValueTooLarge);
        assert_eq!(set_errno_error(libc::EACCES, "x").kind(), ErrorKind::TargetUnavailable);
    }
}
