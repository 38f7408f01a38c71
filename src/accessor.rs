//! 绑定到目标和命名空间的属性访问器
//!
//! ```no_run
//! use std::path::Path;
//! use extattr::{ExtAttrExt, Namespace};
//!
//! let attrs = Path::new("/tmp/demo").extattr(Namespace::User);
//! attrs.assign("comment", Some(b"hello"))?;
//! for name in attrs.list()? {
//!     println!("{}", String::from_utf8_lossy(&name));
//! }
//! attrs.assign("comment", None::<&[u8]>)?;
//! # Ok::<(), extattr::Error>(())
//! ```

use std::fs::File;
use std::path::Path;

use crate::api;
use crate::error::Result;
use crate::listing::Listing;
use crate::namespace::Namespace;
use crate::target::Target;

/// 一个 (目标, 命名空间) 上的属性访问器
#[derive(Debug, Clone, Copy)]
pub struct Accessor<'a> {
    target: Target<'a>,
    namespace: Namespace,
}

impl<'a> Accessor<'a> {
    /// 创建访问器
    pub fn new(target: Target<'a>, namespace: Namespace) -> Self {
        Self { target, namespace }
    }

    /// 操作目标
    pub fn target(&self) -> Target<'a> {
        self.target
    }

    /// 命名空间
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// 见 [`api::list`]
    pub fn list(&self) -> Result<Listing> {
        api::list(&self.target, self.namespace)
    }

    /// 见 [`api::size`]
    pub fn size(&self, name: impl AsRef<[u8]>) -> Result<u64> {
        api::size(&self.target, self.namespace, name)
    }

    /// 见 [`api::get`]
    pub fn get(&self, name: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        api::get(&self.target, self.namespace, name)
    }

    /// 见 [`api::set`]
    pub fn set(&self, name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        api::set(&self.target, self.namespace, name, value)
    }

    /// 见 [`api::delete`]
    pub fn delete(&self, name: impl AsRef<[u8]>) -> Result<()> {
        api::delete(&self.target, self.namespace, name)
    }

    /// 见 [`api::each`]
    pub fn each<F>(&self, visit: F) -> Result<()>
    where
        F: FnMut(&[u8], Vec<u8>),
    {
        api::each(&self.target, self.namespace, visit)
    }

    /// 赋值：`Some` 写入，`None` 删除
    pub fn assign<V: AsRef<[u8]>>(&self, name: impl AsRef<[u8]>, value: Option<V>) -> Result<()> {
        match value {
            Some(value) => self.set(name, value),
            None => self.delete(name),
        }
    }
}

/// 为文件和路径提供扩展属性访问器
pub trait ExtAttrExt {
    /// 访问器；路径目标跟随符号链接
    fn extattr(&self, namespace: Namespace) -> Accessor<'_>;

    /// 访问器；路径目标操作符号链接本身
    ///
    /// 对已打开的文件与 [`extattr`](ExtAttrExt::extattr) 相同。
    fn extattr_link(&self, namespace: Namespace) -> Accessor<'_>;
}

impl ExtAttrExt for File {
    fn extattr(&self, namespace: Namespace) -> Accessor<'_> {
        Accessor::new(Target::file(self), namespace)
    }

    fn extattr_link(&self, namespace: Namespace) -> Accessor<'_> {
        Accessor::new(Target::file(self), namespace)
    }
}

impl ExtAttrExt for Path {
    fn extattr(&self, namespace: Namespace) -> Accessor<'_> {
        Accessor::new(Target::path(self), namespace)
    }

    fn extattr_link(&self, namespace: Namespace) -> Accessor<'_> {
        Accessor::new(Target::link(self), namespace)
    }
}
