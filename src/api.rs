//! 扩展属性公共 API
//!
//! 所有操作都是同步、阻塞的，由当前平台的驱动执行。名称在进入驱动前
//! 统一校验（非空、不含 NUL）。
//!
//! # 示例
//!
//! ```no_run
//! use extattr::{api, Namespace, Target};
//!
//! let file = std::fs::File::create("/tmp/demo")?;
//! let target = Target::file(&file);
//! api::set(&target, Namespace::User, "comment", b"hello")?;
//! assert_eq!(api::get(&target, Namespace::User, "comment")?, b"hello");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{ErrorKind, Result};
use crate::listing::Listing;
use crate::namespace::{check_name, Namespace};
use crate::sys::{AttrDriver, Native};
use crate::target::Target;

fn checked<'n>(target: &Target<'_>, name: &'n [u8]) -> Result<&'n [u8]> {
    check_name(name).map_err(|e| e.with_target(target))?;
    Ok(name)
}

/// 列出命名空间下的所有属性名
///
/// 只返回属于 `namespace` 的名称（不带前缀），顺序只在本次调用内有意义。
pub fn list(target: &Target<'_>, namespace: Namespace) -> Result<Listing> {
    Native::list(target, namespace).map(Listing::new)
}

/// 列出属性名，逐个交给 `sink` 而不是收集
pub fn list_each<F>(target: &Target<'_>, namespace: Namespace, mut sink: F) -> Result<()>
where
    F: FnMut(&[u8]),
{
    for name in Native::list(target, namespace)? {
        sink(&name);
    }
    Ok(())
}

/// 属性值的字节长度
///
/// # 错误
///
/// * `AttributeNotFound` - 属性不存在（Windows EA 的空值同样如此，见 [`get`]）
pub fn size(target: &Target<'_>, namespace: Namespace, name: impl AsRef<[u8]>) -> Result<u64> {
    let name = checked(target, name.as_ref())?;
    Native::size(target, namespace, name)
}

/// 读取属性值
///
/// 返回的值长度就是实际读到的长度。读取期间属性被并发修改时，按
/// [`BufferGrowth`](crate::BufferGrowth) 的策略重试，超过上限返回
/// `AttributeRace`。
///
/// Windows 的 System 命名空间（NT EA）无法区分“不存在”和“空值”，
/// 空值同样返回 `AttributeNotFound`。
pub fn get(target: &Target<'_>, namespace: Namespace, name: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    let name = checked(target, name.as_ref())?;
    Native::get(target, namespace, name)
}

/// 创建或替换属性值
///
/// 失败时原有值保持不变。
///
/// # 错误
///
/// * `InvalidName` - 名称为空或含 NUL
/// * `NameTooLong` / `ValueTooLarge` - 超过平台上限
pub fn set(
    target: &Target<'_>,
    namespace: Namespace,
    name: impl AsRef<[u8]>,
    value: impl AsRef<[u8]>,
) -> Result<()> {
    let name = checked(target, name.as_ref())?;
    Native::set(target, namespace, name, value.as_ref())
}

/// 删除属性
///
/// 属性不存在时返回 `AttributeNotFound`；Windows EA 上删除等价于写入
/// 空值，对不存在的名称同样成功。
pub fn delete(target: &Target<'_>, namespace: Namespace, name: impl AsRef<[u8]>) -> Result<()> {
    let name = checked(target, name.as_ref())?;
    Native::delete(target, namespace, name)
}

/// 遍历命名空间下的所有属性及其值
///
/// 列表与读取之间被删除的属性会被跳过。
pub fn each<F>(target: &Target<'_>, namespace: Namespace, mut visit: F) -> Result<()>
where
    F: FnMut(&[u8], Vec<u8>),
{
    for name in Native::list(target, namespace)? {
        match Native::get(target, namespace, &name) {
            Ok(value) => visit(&name, value),
            Err(e) if e.kind() == ErrorKind::AttributeNotFound => {
                log::debug!(
                    "[api::each] {} vanished before it could be read",
                    String::from_utf8_lossy(&name)
                );
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs::File;

    /// 文件系统不支持 user 属性时跳过测试
    pub(crate) fn user_xattrs_supported(file: &File) -> bool {
        let target = Target::file(file);
        match set(&target, Namespace::User, "seed", b"") {
            Ok(()) => {
                delete(&target, Namespace::User, "seed").unwrap();
                true
            }
            Err(e) if matches!(e.kind(), ErrorKind::PlatformCallFailed | ErrorKind::Unsupported) => {
                eprintln!("skipping: {}", e);
                false
            }
            Err(e) => panic!("unexpected failure: {}", e),
        }
    }

    fn sorted(listing: Listing) -> Vec<Vec<u8>> {
        let mut names: Vec<_> = listing.collect();
        names.sort();
        names
    }

    #[test]
    fn test_end_to_end() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = tmp.as_file();
        if !user_xattrs_supported(file) {
            return;
        }
        let target = Target::file(file);

        set(&target, Namespace::User, "comment", "hello").unwrap();
        let names: Vec<_> = list(&target, Namespace::User).unwrap().collect();
        assert_eq!(names, vec![b"comment".to_vec()]);
        assert_eq!(get(&target, Namespace::User, "comment").unwrap(), b"hello");
        delete(&target, Namespace::User, "comment").unwrap();
        assert_eq!(list(&target, Namespace::User).unwrap().count(), 0);
    }

    #[test]
    fn test_set_replaces_value() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = tmp.as_file();
        if !user_xattrs_supported(file) {
            return;
        }
        let target = Target::file(file);

        set(&target, Namespace::User, "k", b"first value").unwrap();
        set(&target, Namespace::User, "k", b"2nd").unwrap();
        assert_eq!(get(&target, Namespace::User, "k").unwrap(), b"2nd");
        assert_eq!(size(&target, Namespace::User, "k").unwrap(), 3);

        set(&target, Namespace::User, "empty", b"").unwrap();
        assert_eq!(get(&target, Namespace::User, "empty").unwrap(), b"");
        assert_eq!(size(&target, Namespace::User, "empty").unwrap(), 0);

        let blob: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        set(&target, Namespace::User, "blob", &blob).unwrap();
        assert_eq!(get(&target, Namespace::User, "blob").unwrap(), blob);
    }

    #[cfg(any(target_os = "linux", target_os = "android", windows))]
    #[test]
    fn test_oversized_value_keeps_prior() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = tmp.as_file();
        if !user_xattrs_supported(file) {
            return;
        }
        let target = Target::file(file);
        let value_max = if cfg!(windows) {
            crate::consts::ADS_DATA_MAX
        } else {
            crate::consts::XATTR_SIZE_MAX
        };

        set(&target, Namespace::User, "k", b"prior").unwrap();
        let err = set(&target, Namespace::User, "k", vec![0u8; value_max + 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueTooLarge);
        assert_eq!(get(&target, Namespace::User, "k").unwrap(), b"prior");
    }

    #[test]
    fn test_missing_attribute() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = tmp.as_file();
        if !user_xattrs_supported(file) {
            return;
        }
        let target = Target::file(file);

        let err = get(&target, Namespace::User, "absent").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeNotFound);
        assert_eq!(err.name(), Some(&b"absent"[..]));
        assert!(err.os_code().is_some());

        assert_eq!(
            size(&target, Namespace::User, "absent").unwrap_err().kind(),
            ErrorKind::AttributeNotFound
        );
        assert_eq!(
            delete(&target, Namespace::User, "absent").unwrap_err().kind(),
            ErrorKind::AttributeNotFound
        );
    }

    #[test]
    fn test_list_is_exact_and_namespaced() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = tmp.as_file();
        if !user_xattrs_supported(file) {
            return;
        }
        let target = Target::file(file);

        for name in ["a", "bb", "ccc"] {
            set(&target, Namespace::User, name, name).unwrap();
        }
        assert_eq!(
            sorted(list(&target, Namespace::User).unwrap()),
            vec![b"a".to_vec(), b"bb".to_vec(), b"ccc".to_vec()]
        );

        let system: Vec<_> = list(&target, Namespace::System).unwrap().collect();
        assert!(!system.iter().any(|name| name.as_slice() == b"a"));

        let mut seen = Vec::new();
        list_each(&target, Namespace::User, |name| seen.push(name.to_vec())).unwrap();
        seen.sort();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], b"ccc");
    }

    #[test]
    fn test_each_visits_values() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = tmp.as_file();
        if !user_xattrs_supported(file) {
            return;
        }
        let target = Target::file(file);

        set(&target, Namespace::User, "one", b"1").unwrap();
        set(&target, Namespace::User, "two", b"22").unwrap();

        let mut pairs = Vec::new();
        each(&target, Namespace::User, |name, value| pairs.push((name.to_vec(), value))).unwrap();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                (b"one".to_vec(), b"1".to_vec()),
                (b"two".to_vec(), b"22".to_vec())
            ]
        );
    }

    #[test]
    fn test_path_target_matches_handle() {
        let file = tempfile::NamedTempFile::new().unwrap();
        if !user_xattrs_supported(file.as_file()) {
            return;
        }

        set(&Target::path(file.path()), Namespace::User, "via_path", b"p").unwrap();
        assert_eq!(
            get(&Target::file(file.as_file()), Namespace::User, "via_path").unwrap(),
            b"p"
        );
        assert_eq!(
            get(&Target::link(file.path()), Namespace::User, "via_path").unwrap(),
            b"p"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_follow_flag() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        let link = dir.path().join("link");
        let file = File::create(&real).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();
        if !user_xattrs_supported(&file) {
            return;
        }

        set(&Target::path(&link), Namespace::User, "through", b"yes").unwrap();
        assert_eq!(get(&Target::path(&real), Namespace::User, "through").unwrap(), b"yes");
        // 链接本身没有这个属性
        assert!(get(&Target::link(&link), Namespace::User, "through").is_err());
    }

    #[test]
    fn test_invalid_names_rejected_before_native_call() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = tmp.as_file();
        let target = Target::file(file);

        let err: Error = set(&target, Namespace::User, "", b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
        assert!(err.target().is_some());
        assert_eq!(
            get(&target, Namespace::User, b"a\0b").unwrap_err().kind(),
            ErrorKind::InvalidName
        );
    }

    #[test]
    fn test_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = list(&Target::path(&missing), Namespace::User).unwrap_err();
        if err.kind() == ErrorKind::Unsupported {
            return;
        }
        assert_eq!(err.kind(), ErrorKind::TargetUnavailable);
        assert!(err.target().unwrap().contains("nope"));
    }
}
