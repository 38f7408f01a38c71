//! 缓冲区增长协议
//!
//! 原生接口通常需要先探测所需大小、分配、再真正读取。探测和读取之间
//! 属性可能变大、变小或消失：
//!
//! - 读到的比分配的少：接受，截断到实际长度
//! - 缓冲区不够（ERANGE / STATUS_BUFFER_OVERFLOW）：重新探测或加倍后重试
//! - 重试超过上限：报告 [`ErrorKind::AttributeRace`]
//! - 读取阶段属性消失：由 `read` 回调返回 `AttributeNotFound`，原样传播

use crate::consts::GROWTH_RETRY_LIMIT;
use crate::error::{Error, ErrorKind, Result};

/// 缓冲区不够时如何得到新的容量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    /// 重新调用探测函数
    Reprobe,
    /// 在上一次容量基础上加倍（探测结果更大时取探测结果）
    Double,
}

/// 一次读取的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// 读取完成，写入了这么多字节
    Done(usize),
    /// 缓冲区太小；可选地给出平台报告的所需大小
    TooSmall(Option<usize>),
}

/// 缓冲区增长协议配置
#[derive(Debug, Clone, Copy)]
pub struct BufferGrowth {
    strategy: Growth,
    max_retries: usize,
}

impl Default for BufferGrowth {
    fn default() -> Self {
        Self {
            strategy: Growth::Reprobe,
            max_retries: GROWTH_RETRY_LIMIT,
        }
    }
}

impl BufferGrowth {
    /// 使用给定策略和默认重试上限
    pub fn new(strategy: Growth) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// 设置重试上限
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// 当前策略
    pub fn strategy(&self) -> Growth {
        self.strategy
    }

    /// 执行 探测 → 分配 → 读取 循环
    ///
    /// # 参数
    ///
    /// * `probe` - 返回当前所需字节数
    /// * `read` - 读入给定缓冲区
    ///
    /// # 返回
    ///
    /// 截断到实际长度的缓冲区
    pub fn fill<P, R>(&self, mut probe: P, mut read: R) -> Result<Vec<u8>>
    where
        P: FnMut() -> Result<usize>,
        R: FnMut(&mut [u8]) -> Result<Fill>,
    {
        let mut capacity = probe()?;
        let mut attempt = 0;

        loop {
            let mut buf = vec![0u8; capacity];
            match read(&mut buf)? {
                Fill::Done(len) => {
                    buf.truncate(len.min(capacity));
                    return Ok(buf);
                }
                Fill::TooSmall(hint) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(Error::new(
                            ErrorKind::AttributeRace,
                            "attribute kept changing size while being read",
                        ));
                    }

                    let previous = capacity;
                    capacity = match self.strategy {
                        Growth::Reprobe => probe()?,
                        Growth::Double => previous.saturating_mul(2).max(1),
                    };
                    if let Some(hint) = hint {
                        capacity = capacity.max(hint);
                    }
                    log::debug!(
                        "[growth] buffer too small ({} bytes), retry {}/{} with {} bytes",
                        previous,
                        attempt,
                        self.max_retries,
                        capacity
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[test]
    fn test_exact_fit() {
        let value = b"hello".to_vec();
        let buf = BufferGrowth::default()
            .fill(
                || Ok(value.len()),
                |buf| {
                    buf.copy_from_slice(&value);
                    Ok(Fill::Done(value.len()))
                },
            )
            .unwrap();
        assert_eq!(buf, value);
    }

    #[test]
    fn test_short_read_is_truncated() {
        // 探测之后属性变短
        let buf = BufferGrowth::default()
            .fill(
                || Ok(16),
                |buf| {
                    buf[..3].copy_from_slice(b"abc");
                    Ok(Fill::Done(3))
                },
            )
            .unwrap();
        assert_eq!(buf, b"abc");
    }

    #[test]
    fn test_reprobe_after_growth() {
        // 第一次探测得到 2，读取时已经变成 6
        let size = Cell::new(2usize);
        let probes = Cell::new(0);
        let buf = BufferGrowth::new(Growth::Reprobe)
            .fill(
                || {
                    probes.set(probes.get() + 1);
                    let current = size.get();
                    size.set(6);
                    Ok(current)
                },
                |buf| {
                    if buf.len() < 6 {
                        return Ok(Fill::TooSmall(None));
                    }
                    buf[..6].copy_from_slice(b"grown!");
                    Ok(Fill::Done(6))
                },
            )
            .unwrap();
        assert_eq!(buf, b"grown!");
        assert_eq!(probes.get(), 2);
    }

    #[test]
    fn test_double_strategy() {
        let seen = core::cell::RefCell::new(Vec::new());
        let buf = BufferGrowth::new(Growth::Double)
            .fill(
                || Ok(4),
                |buf| {
                    seen.borrow_mut().push(buf.len());
                    if buf.len() < 20 {
                        Ok(Fill::TooSmall(None))
                    } else {
                        Ok(Fill::Done(20))
                    }
                },
            )
            .unwrap();
        assert_eq!(buf.len(), 20);
        assert_eq!(*seen.borrow(), vec![4, 8, 16, 32]);
    }

    #[test]
    fn test_hint_raises_capacity() {
        let seen = core::cell::RefCell::new(Vec::new());
        BufferGrowth::new(Growth::Double)
            .fill(
                || Ok(0),
                |buf| {
                    seen.borrow_mut().push(buf.len());
                    if buf.len() < 100 {
                        Ok(Fill::TooSmall(Some(100)))
                    } else {
                        Ok(Fill::Done(100))
                    }
                },
            )
            .unwrap();
        assert_eq!(*seen.borrow(), vec![0, 100]);
    }

    #[test]
    fn test_race_after_retry_limit() {
        let reads = Cell::new(0);
        let err = BufferGrowth::default()
            .max_retries(3)
            .fill(
                || Ok(1),
                |_| {
                    reads.set(reads.get() + 1);
                    Ok(Fill::TooSmall(None))
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeRace);
        assert_eq!(reads.get(), 4);
    }

    #[test]
    fn test_missing_at_read_propagates() {
        let err = BufferGrowth::default()
            .fill(
                || Ok(8),
                |_| Err(Error::new(ErrorKind::AttributeNotFound, "gone")),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeNotFound);
    }
}
