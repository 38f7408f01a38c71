//! extattr: 跨平台扩展属性库
//!
//! 为三种结构不同的原生扩展属性机制提供统一的、区分命名空间的接口：
//! - **POSIX xattr**（Linux / Android）：扁平名称空间，用 `user.` / `system.` 前缀模拟命名空间
//! - **BSD extattr**（FreeBSD / DragonFly / NetBSD）：原生命名空间
//! - **Windows**：User 命名空间映射到 NTFS 备用数据流，System 映射到 NT 扩展属性
//!
//! 其他平台上所有操作返回 [`ErrorKind::Unsupported`]。
//!
//! # 示例
//!
//! ```rust,no_run
//! use extattr::{api, resolve, Target};
//!
//! fn main() -> extattr::Result<()> {
//!     let namespace = resolve("user")?;
//!     let target = Target::path("/tmp/demo");
//!
//!     api::set(&target, namespace, "comment", "hello")?;
//!     for name in api::list(&target, namespace)? {
//!         let value = api::get(&target, namespace, &name)?;
//!         println!("{} = {:?}", String::from_utf8_lossy(&name), value);
//!     }
//!     api::delete(&target, namespace, "comment")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`consts`] - 常量定义
//! - [`namespace`] - 命名空间解析
//! - [`target`] - 操作目标（文件句柄 / 路径）
//! - [`growth`] - 缓冲区增长协议
//! - [`api`] - 扩展属性操作
//! - [`Accessor`] / [`ExtAttrExt`] - 绑定目标的便捷接口

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 常量定义
pub mod consts;

/// 命名空间
pub mod namespace;

/// 操作目标
pub mod target;

/// 缓冲区增长协议
pub mod growth;

/// 扩展属性操作
pub mod api;

mod accessor;
mod listing;
#[cfg_attr(not(windows), allow(dead_code))]
mod ntfs;
mod sys;

// ===== 公共导出 =====

pub use accessor::{Accessor, ExtAttrExt};
pub use error::{Error, ErrorKind, Result};
pub use growth::{BufferGrowth, Fill, Growth};
pub use listing::Listing;
pub use namespace::{resolve, Namespace, NamespaceInput};
pub use target::Target;

/// 当前平台使用的实现：`"xattr"`、`"extattr"`、`"windows"` 或 `"unsupported"`
pub const IMPLEMENTATION: &str = <sys::Native as sys::AttrDriver>::IMPLEMENTATION;
