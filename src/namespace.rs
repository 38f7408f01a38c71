//! 命名空间解析
//!
//! 把调用方给出的命名空间（数字编号或不区分大小写的名字）解析为
//! [`Namespace`]，并提供扁平模型（POSIX xattr）下的前缀处理。

use core::fmt;
use core::str::FromStr;

use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};

/// 扩展属性命名空间
///
/// 可移植契约只保证 User 和 System 两个命名空间。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Namespace {
    /// 用户属性
    #[default]
    User,
    /// 系统属性
    System,
}

/// 调用方给出的、尚未解析的命名空间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceInput<'a> {
    /// 数字编号（见 [`NAMESPACE_USER`]、[`NAMESPACE_SYSTEM`]）
    Code(i64),
    /// 名字，如 `"user"`、`"SYSTEM"`
    Alias(&'a str),
    /// 未指定，使用默认值 User
    Omitted,
}

/// 命名空间前缀表条目
struct NamespacePrefix {
    prefix: &'static str,
    namespace: Namespace,
}

/// 命名空间前缀表
static PREFIX_TABLE: &[NamespacePrefix] = &[
    NamespacePrefix {
        prefix: XATTR_PREFIX_USER,
        namespace: Namespace::User,
    },
    NamespacePrefix {
        prefix: XATTR_PREFIX_SYSTEM,
        namespace: Namespace::System,
    },
];

impl Namespace {
    /// 从数字编号解析
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            NAMESPACE_USER => Ok(Namespace::User),
            NAMESPACE_SYSTEM => Ok(Namespace::System),
            _ => Err(Error::new(
                ErrorKind::UnsupportedNamespace,
                "wrong namespace value (expected 1 or 2)",
            )),
        }
    }

    /// 可移植数字编号
    pub const fn code(self) -> i64 {
        match self {
            Namespace::User => NAMESPACE_USER,
            Namespace::System => NAMESPACE_SYSTEM,
        }
    }

    /// 名字（小写）
    pub const fn as_str(self) -> &'static str {
        match self {
            Namespace::User => "user",
            Namespace::System => "system",
        }
    }

    /// 扁平模型下的名称前缀，如 `"user."`
    pub fn prefix(self) -> &'static str {
        PREFIX_TABLE
            .iter()
            .find(|entry| entry.namespace == self)
            .map(|entry| entry.prefix)
            .unwrap_or(XATTR_PREFIX_USER)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("user") {
            Ok(Namespace::User)
        } else if s.eq_ignore_ascii_case("system") {
            Ok(Namespace::System)
        } else {
            Err(Error::new(
                ErrorKind::UnsupportedNamespace,
                "wrong namespace (expected user or system)",
            )
            .with_name(s.as_bytes()))
        }
    }
}

impl TryFrom<i64> for Namespace {
    type Error = Error;

    fn try_from(code: i64) -> Result<Self> {
        Namespace::from_code(code)
    }
}

impl<'a> From<&'a str> for NamespaceInput<'a> {
    fn from(alias: &'a str) -> Self {
        NamespaceInput::Alias(alias)
    }
}

impl From<i64> for NamespaceInput<'_> {
    fn from(code: i64) -> Self {
        NamespaceInput::Code(code)
    }
}

impl<'a> From<Option<&'a str>> for NamespaceInput<'a> {
    fn from(alias: Option<&'a str>) -> Self {
        alias.map_or(NamespaceInput::Omitted, NamespaceInput::Alias)
    }
}

/// 解析调用方给出的命名空间
///
/// 未知编号或名字一律返回 [`ErrorKind::UnsupportedNamespace`]，
/// 只有 [`NamespaceInput::Omitted`] 会落到默认值 User。
pub fn resolve<'a>(input: impl Into<NamespaceInput<'a>>) -> Result<Namespace> {
    match input.into() {
        NamespaceInput::Code(code) => Namespace::from_code(code),
        NamespaceInput::Alias(alias) => alias.parse(),
        NamespaceInput::Omitted => Ok(Namespace::default()),
    }
}

/// 在属性名前加上命名空间前缀
///
/// # 示例
///
/// ```ignore
/// assert_eq!(prefixed_name(Namespace::User, b"comment"), b"user.comment");
/// ```
#[cfg_attr(not(any(target_os = "linux", target_os = "android")), allow(dead_code))]
pub(crate) fn prefixed_name(namespace: Namespace, name: &[u8]) -> Vec<u8> {
    let prefix = namespace.prefix().as_bytes();
    let mut full = Vec::with_capacity(prefix.len() + name.len());
    full.extend_from_slice(prefix);
    full.extend_from_slice(name);
    full
}

/// 若完整名称属于给定命名空间，返回去除前缀后的部分
///
/// 前缀之后必须至少还有一个字节，否则视为不属于该命名空间。
#[cfg_attr(not(any(target_os = "linux", target_os = "android")), allow(dead_code))]
pub(crate) fn strip_namespace(namespace: Namespace, full_name: &[u8]) -> Option<&[u8]> {
    let prefix = namespace.prefix().as_bytes();
    match full_name.strip_prefix(prefix) {
        Some(rest) if !rest.is_empty() => Some(rest),
        _ => None,
    }
}

/// 校验属性名：非空且不含 NUL
pub(crate) fn check_name(name: &[u8]) -> Result<()> {
    if name.is_empty() {
        return Err(Error::new(ErrorKind::InvalidName, "attribute name is empty"));
    }
    if name.contains(&0) {
        return Err(Error::new(ErrorKind::InvalidName, "attribute name contains NUL").with_name(name));
    }
    Ok(())
}
