//! 属性名列表
//!
//! [`Listing`] 是一次 list 调用的结果；以及把各平台原生列表缓冲区
//! 解码为属性名的函数。

use crate::namespace::{strip_namespace, Namespace};

/// 一次 list 调用得到的属性名序列
///
/// 顺序即原生接口返回的顺序，不保证跨调用稳定；消费后不可重来。
#[derive(Debug)]
pub struct Listing {
    names: std::vec::IntoIter<Vec<u8>>,
}

impl Listing {
    pub(crate) fn new(names: Vec<Vec<u8>>) -> Self {
        Self {
            names: names.into_iter(),
        }
    }

    /// 一个空列表
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// 剩余属性名个数
    pub fn remaining(&self) -> usize {
        self.names.len()
    }
}

impl Iterator for Listing {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        self.names.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.names.size_hint()
    }
}

impl ExactSizeIterator for Listing {}

/// 解码扁平模型（listxattr）的列表：以 NUL 结尾的完整名称依次排列
///
/// 只保留属于 `namespace` 的名称，并去掉前缀。不属于该命名空间
/// 或前缀无法识别的名称被跳过。末尾缺少 NUL 的名称按缓冲区结尾截止。
#[cfg_attr(not(any(target_os = "linux", target_os = "android")), allow(dead_code))]
pub(crate) fn decode_flat(buf: &[u8], namespace: Namespace) -> Vec<Vec<u8>> {
    let mut names = Vec::new();
    for full_name in buf.split(|&b| b == 0) {
        if full_name.is_empty() {
            continue;
        }
        match strip_namespace(namespace, full_name) {
            Some(name) => names.push(name.to_vec()),
            None => log::debug!(
                "[listing] skip {} (not in namespace {})",
                String::from_utf8_lossy(full_name),
                namespace
            ),
        }
    }
    names
}

/// 解码 BSD extattr 列表：每项是一个长度字节加上不以 NUL 结尾的名称
///
/// 长度超出缓冲区的项视为截断，解码到此为止。
#[cfg_attr(
    not(any(target_os = "freebsd", target_os = "dragonfly", target_os = "netbsd")),
    allow(dead_code)
)]
pub(crate) fn decode_counted(buf: &[u8]) -> Vec<Vec<u8>> {
    let mut names = Vec::new();
    let mut offset = 0;

    while offset < buf.len() {
        let len = buf[offset] as usize;
        offset += 1;
        if offset + len > buf.len() {
            log::warn!(
                "[listing] truncated extattr entry at offset {} (len {}, buffer {})",
                offset - 1,
                len,
                buf.len()
            );
            break;
        }
        if len > 0 {
            names.push(buf[offset..offset + len].to_vec());
        }
        offset += len;
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_iterator() {
        let mut listing = Listing::new(vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.next(), Some(b"a".to_vec()));
        assert_eq!(listing.remaining(), 1);
        assert_eq!(listing.next(), Some(b"b".to_vec()));
        assert_eq!(listing.next(), None);
        assert_eq!(Listing::empty().count(), 0);
    }

    #[test]
    fn test_decode_flat_filters_namespace() {
        let buf = b"user.comment\0security.selinux\0system.posix_acl_access\0user.mime_type\0";
        assert_eq!(
            decode_flat(buf, Namespace::User),
            vec![b"comment".to_vec(), b"mime_type".to_vec()]
        );
        assert_eq!(
            decode_flat(buf, Namespace::System),
            vec![b"posix_acl_access".to_vec()]
        );
    }

    #[test]
    fn test_decode_flat_edge_cases() {
        assert!(decode_flat(b"", Namespace::User).is_empty());
        // 只有前缀的名称不算
        assert!(decode_flat(b"user.\0", Namespace::User).is_empty());
        // 缺少结尾 NUL
        assert_eq!(decode_flat(b"user.tail", Namespace::User), vec![b"tail".to_vec()]);
    }

    #[test]
    fn test_decode_counted() {
        let buf = b"\x07comment\x03foo";
        assert_eq!(decode_counted(buf), vec![b"comment".to_vec(), b"foo".to_vec()]);
    }

    #[test]
    fn test_decode_counted_truncated() {
        // 第二项声明 10 字节，但缓冲区只剩 3 字节
        let buf = b"\x03abc\x0adef";
        assert_eq!(decode_counted(buf), vec![b"abc".to_vec()]);
    }
}
