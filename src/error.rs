//! 错误类型定义
//!
//! 提供扩展属性操作的错误类型。每个错误都携带足够的上下文
//! （目标、属性名、原生错误码）用于诊断。

use core::fmt;
use std::io;

/// 扩展属性操作错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
    target: Option<String>,
    name: Option<Vec<u8>>,
    os_code: Option<i32>,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// 命名空间不在 {User, System} 之内
    UnsupportedNamespace,
    /// 属性不存在
    AttributeNotFound,
    /// 属性值超过平台/存储上限
    ValueTooLarge,
    /// 属性名超过平台上限
    NameTooLong,
    /// 属性名为空或含有 NUL
    InvalidName,
    /// 探测与读取之间属性反复变化，超出重试上限
    AttributeRace,
    /// 句柄/路径无法打开或解析
    TargetUnavailable,
    /// 其他原生调用失败
    PlatformCallFailed,
    /// 当前平台没有扩展属性驱动
    Unsupported,
}

impl Error {
    /// 创建新错误
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self {
            kind,
            message,
            target: None,
            name: None,
            os_code: None,
        }
    }

    /// 附加目标描述
    pub fn with_target(mut self, target: impl fmt::Display) -> Self {
        self.target = Some(target.to_string());
        self
    }

    /// 附加属性名
    pub fn with_name(mut self, name: &[u8]) -> Self {
        self.name = Some(name.to_vec());
        self
    }

    /// 附加原生错误码（errno / Win32 错误码）
    pub fn with_os_code(mut self, code: i32) -> Self {
        self.os_code = Some(code);
        self
    }

    /// 获取错误类型
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误消息
    pub const fn message(&self) -> &'static str {
        self.message
    }

    /// 出错的目标（路径、`<fd N>` 或 `<handle>`）
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// 出错的属性名
    pub fn name(&self) -> Option<&[u8]> {
        self.name.as_deref()
    }

    /// 原生错误码
    pub fn os_code(&self) -> Option<i32> {
        self.os_code
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(target) = &self.target {
            write!(f, " (target {})", target)?;
        }
        if let Some(name) = &self.name {
            write!(f, " [{}]", String::from_utf8_lossy(name))?;
        }
        if let Some(code) = self.os_code {
            write!(f, " (os error {})", code)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match (err.kind, err.os_code) {
            (ErrorKind::PlatformCallFailed | ErrorKind::TargetUnavailable, Some(code)) => {
                io::Error::from_raw_os_error(code).kind()
            }
            (ErrorKind::AttributeNotFound | ErrorKind::TargetUnavailable, _) => io::ErrorKind::NotFound,
            (ErrorKind::UnsupportedNamespace | ErrorKind::InvalidName | ErrorKind::NameTooLong, _) => {
                io::ErrorKind::InvalidInput
            }
            (ErrorKind::Unsupported, _) => io::ErrorKind::Unsupported,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Result 类型别名
pub type Result<T> = core::result::Result<T, Error>;
