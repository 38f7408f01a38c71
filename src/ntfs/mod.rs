//! NTFS 辅助：名称转码与原生记录编解码
//!
//! 这两部分只被 Windows 驱动调用，但本身是纯计算，在所有平台上编译并测试。

pub(crate) mod record;
pub(crate) mod wide;
