//! extattr 常量定义
//!
//! 这个模块包含了所有进程级的只读常量，包括：
//! - 可移植的命名空间编号
//! - 各平台的名称/数据长度上限
//! - 缓冲区增长协议的重试上限
//! - Windows NT 状态码

//=============================================================================
// 命名空间
//=============================================================================

/// user 命名空间的可移植编号
pub const NAMESPACE_USER: i64 = 1;

/// system 命名空间的可移植编号
pub const NAMESPACE_SYSTEM: i64 = 2;

/// 扁平模型（POSIX xattr）下 user 命名空间的前缀
pub const XATTR_PREFIX_USER: &str = "user.";

/// 扁平模型（POSIX xattr）下 system 命名空间的前缀
pub const XATTR_PREFIX_SYSTEM: &str = "system.";

//=============================================================================
// 长度上限
//=============================================================================

/// POSIX xattr 完整名称（含前缀）的最大字节数
pub const XATTR_NAME_MAX: usize = 255;

/// POSIX xattr 属性值最大字节数（内核在调用文件系统之前检查）
pub const XATTR_SIZE_MAX: usize = 65536;

/// NTFS ADS 属性值最大字节数
///
/// ADS 本身可以像普通文件一样任意大，这里人为限制为扩展属性的尺度
pub const ADS_DATA_MAX: usize = 65535;

/// NTFS ADS 流名称最大长度
pub const ADS_NAME_MAX: usize = 255;

/// NT EA 属性值最大字节数
pub const EA_DATA_MAX: usize = 65535;

/// NT EA 名称最大字节数（EaNameLength 是 u8）
pub const EA_NAME_MAX: usize = 255;

//=============================================================================
// 缓冲区增长协议
//=============================================================================

/// 所有平台统一的重试上限（超过后报告 AttributeRace）
pub const GROWTH_RETRY_LIMIT: usize = 8;

/// EA 列表查询的初始缓冲区大小
pub const EA_LIST_INITIAL: usize = 4096;

/// ADS 流列表查询的初始缓冲区大小
pub const STREAM_LIST_INITIAL: usize = 4096;

/// 完整路径查询的缓冲区大小（UTF-16 单元数）
pub const WIDE_PATH_MAX: usize = 32768;

//=============================================================================
// Windows NT 状态码
//=============================================================================

/// STATUS_SUCCESS
pub const STATUS_SUCCESS: i32 = 0;

/// STATUS_BUFFER_OVERFLOW（警告级，数据被截断）
pub const STATUS_BUFFER_OVERFLOW: i32 = 0x8000_0005_u32 as i32;

/// STATUS_NO_MORE_EAS
pub const STATUS_NO_MORE_EAS: i32 = 0x8000_0012_u32 as i32;

/// STATUS_BUFFER_TOO_SMALL
pub const STATUS_BUFFER_TOO_SMALL: i32 = 0xC000_0023_u32 as i32;

/// STATUS_NONEXISTENT_EA_ENTRY
pub const STATUS_NONEXISTENT_EA_ENTRY: i32 = 0xC000_0051_u32 as i32;

/// STATUS_NO_EAS_ON_FILE
pub const STATUS_NO_EAS_ON_FILE: i32 = 0xC000_0052_u32 as i32;

/// STATUS_EA_TOO_LARGE
pub const STATUS_EA_TOO_LARGE: i32 = 0xC000_0050_u32 as i32;
