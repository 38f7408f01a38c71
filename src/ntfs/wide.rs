//! 名称/路径转码
//!
//! Windows 原生接口使用 UTF-16，可移植接口使用字节串。这里负责：
//! - 文本 ↔ UTF-16 的转换（非法序列以 U+FFFD 替换，不报错）
//! - 路径分隔符规范化（进入时 `/` → `\`，返回时 `\` → `/`）
//! - ADS 流名称的还原（去掉开头的 `:` 和结尾的 `:$DATA`）

const COLON: u16 = b':' as u16;
const SLASH: u16 = b'/' as u16;
const BACKSLASH: u16 = b'\\' as u16;

/// 文本转为以 NUL 结尾的 UTF-16
pub fn to_wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(core::iter::once(0)).collect()
}

/// 路径转为以 NUL 结尾的 UTF-16，`/` 改写为 `\`
pub fn to_wide_path(path: &str) -> Vec<u16> {
    let mut wide = to_wide(path);
    normalize_separators(&mut wide);
    wide
}

/// 字节串属性名转为以 NUL 结尾的 UTF-16
///
/// 字节按 UTF-8 解释，非法序列替换为 U+FFFD。
pub fn name_to_wide(name: &[u8]) -> Vec<u16> {
    to_wide(&String::from_utf8_lossy(name))
}

/// 把 UTF-16 缓冲区中的 `/` 改写为 `\`
pub fn normalize_separators(wide: &mut [u16]) {
    for unit in wide.iter_mut() {
        if *unit == SLASH {
            *unit = BACKSLASH;
        }
    }
}

/// UTF-16 转为文本，遇到 NUL 截止，非法代理对替换为 U+FFFD
pub fn from_wide(wide: &[u16]) -> String {
    let end = wide.iter().position(|&unit| unit == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..end])
}

/// UTF-16 路径转为文本，`\` 改写为 `/`
pub fn from_wide_path(wide: &[u16]) -> String {
    from_wide(wide).replace('\\', "/")
}

/// 还原 ADS 流名称
///
/// 原生枚举返回的名称形如 `:name:$DATA`。去掉开头的 `:` 和结尾的
/// `:<类型>` 标记。默认数据流（`::$DATA`）还原后为空，它不是扩展属性，
/// 返回 `None`。
pub fn demangle_stream_name(raw: &[u16]) -> Option<Vec<u16>> {
    let mut name = raw;
    if let Some((&COLON, rest)) = name.split_first() {
        name = rest;
        if let Some(tag) = name.iter().rposition(|&unit| unit == COLON) {
            name = &name[..tag];
        }
    }

    if name.is_empty() {
        None
    } else {
        Some(name.to_vec())
    }
}

/// 原生流名称转为属性名
///
/// 还原后按路径文本转换（`\` → `/`）；默认数据流返回 `None`。
pub fn stream_attr_name(raw: &[u16]) -> Option<Vec<u8>> {
    demangle_stream_name(raw).map(|name| from_wide_path(&name).into_bytes())
}

/// 拼出 `base:name` 形式的流路径（NUL 结尾）
pub fn join_stream_path(base: &[u16], name: &[u8]) -> Vec<u16> {
    let base_end = base.iter().position(|&unit| unit == 0).unwrap_or(base.len());
    let name = name_to_wide(name);
    let mut path = Vec::with_capacity(base_end + 1 + name.len());
    path.extend_from_slice(&base[..base_end]);
    path.push(COLON);
    path.extend_from_slice(&name);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(text: &str) -> Vec<u16> {
        text.encode_utf16().collect()
    }

    #[test]
    fn test_to_wide_is_nul_terminated() {
        let wide = to_wide("ab");
        assert_eq!(wide, vec![b'a' as u16, b'b' as u16, 0]);
        assert_eq!(from_wide(&wide), "ab");
    }

    #[test]
    fn test_round_trip_non_ascii() {
        let text = "属性-ü-😀";
        assert_eq!(from_wide(&to_wide(text)), text);
    }

    #[test]
    fn test_invalid_input_is_replaced() {
        // 0xFF 不是合法 UTF-8
        let wide = name_to_wide(b"a\xffb");
        assert_eq!(from_wide(&wide), "a\u{FFFD}b");
        // 孤立的高位代理
        assert_eq!(from_wide(&[0xD800, b'x' as u16]), "\u{FFFD}x");
    }

    #[test]
    fn test_separator_normalization() {
        let wide = to_wide_path("C:/dir/file.txt");
        assert_eq!(from_wide(&wide), "C:\\dir\\file.txt");
        assert_eq!(from_wide_path(&wide), "C:/dir/file.txt");
    }

    #[test]
    fn test_demangle_stream_name() {
        assert_eq!(demangle_stream_name(&w(":comment:$DATA")), Some(w("comment")));
        // 只有类型标记：默认数据流
        assert_eq!(demangle_stream_name(&w("::$DATA")), None);
        assert_eq!(demangle_stream_name(&w(":")), None);
        // 没有冒号前缀的名称原样返回
        assert_eq!(demangle_stream_name(&w("plain")), Some(w("plain")));
    }

    #[test]
    fn test_stream_attr_name() {
        assert_eq!(stream_attr_name(&w(":comment:$DATA")), Some(b"comment".to_vec()));
        assert_eq!(stream_attr_name(&w(":dir\\name:$DATA")), Some(b"dir/name".to_vec()));
        assert_eq!(stream_attr_name(&w("::$DATA")), None);
    }

    #[test]
    fn test_join_stream_path() {
        let base = to_wide_path("C:/dir/file");
        let joined = join_stream_path(&base, b"comment");
        assert_eq!(from_wide(&joined), "C:\\dir\\file:comment");
        assert_eq!(joined.last(), Some(&0));
    }
}
