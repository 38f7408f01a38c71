//! 操作目标
//!
//! 描述扩展属性操作的对象：一个已打开的文件句柄，或一个路径加上
//! 是否跟随符号链接的标志。

use core::fmt;
use std::fs::File;
use std::path::Path;

/// 扩展属性操作目标
///
/// 每次调用时构造，不会被持久保存。
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// 已打开的文件，直接在句柄上操作
    File(&'a File),
    /// 文件系统路径
    Path {
        /// 路径
        path: &'a Path,
        /// `true` 时穿过符号链接；`false` 时操作链接本身
        follow_symlinks: bool,
    },
}

impl<'a> Target<'a> {
    /// 以已打开的文件为目标
    pub fn file(file: &'a File) -> Self {
        Target::File(file)
    }

    /// 以路径为目标，跟随符号链接
    pub fn path(path: &'a (impl AsRef<Path> + ?Sized)) -> Self {
        Target::Path {
            path: path.as_ref(),
            follow_symlinks: true,
        }
    }

    /// 以路径为目标，操作符号链接本身
    pub fn link(path: &'a (impl AsRef<Path> + ?Sized)) -> Self {
        Target::Path {
            path: path.as_ref(),
            follow_symlinks: false,
        }
    }

    /// 是否跟随符号链接
    ///
    /// 对句柄目标没有意义，总是返回 `true`（句柄指向已解析的对象）。
    pub fn follow_symlinks(&self) -> bool {
        match self {
            Target::File(_) => true,
            Target::Path { follow_symlinks, .. } => *follow_symlinks,
        }
    }
}

impl<'a> From<&'a File> for Target<'a> {
    fn from(file: &'a File) -> Self {
        Target::File(file)
    }
}

impl<'a> From<&'a Path> for Target<'a> {
    fn from(path: &'a Path) -> Self {
        Target::path(path)
    }
}

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(unix)]
            Target::File(file) => {
                use std::os::unix::io::AsRawFd;
                write!(f, "<fd {}>", file.as_raw_fd())
            }
            #[cfg(not(unix))]
            Target::File(_) => f.write_str("<handle>"),
            Target::Path { path, follow_symlinks: true } => write!(f, "{}", path.display()),
            Target::Path { path, follow_symlinks: false } => write!(f, "{} (link)", path.display()),
        }
    }
}
