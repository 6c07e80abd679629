//! 协作式停止信号
//!
//! 所有线程共享一个原子标志；长时间等待被切成小片，
//! 因此停止延迟最多为一个切片。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 默认睡眠切片
pub const DEFAULT_SLEEP_SLICE: Duration = Duration::from_millis(100);

/// 共享停止标志
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求停止 (幂等)
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// 可中断睡眠
    ///
    /// 返回 `true` 表示睡满，`false` 表示中途收到停止请求。
    pub fn sleep(&self, duration: Duration) -> bool {
        self.sleep_sliced(duration, DEFAULT_SLEEP_SLICE)
    }

    /// 按指定切片的可中断睡眠
    pub fn sleep_sliced(&self, duration: Duration, slice: Duration) -> bool {
        let slice = slice.max(Duration::from_millis(1));
        let deadline = Instant::now() + duration;
        loop {
            if self.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(slice.min(deadline - now));
        }
    }
}
