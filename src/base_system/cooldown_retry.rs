//! 固定间隔重试。
//!
//! 只有 `is_transient()` 为真的错误才会重试；次数由计数器封顶，保证一定终止。

use std::fmt::Display;
use std::time::Duration;

use tracing::warn;

pub trait Transient {
    fn is_transient(&self) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    /// 总尝试次数（含第一次）
    pub max_attempts: u32,
    pub delay: Duration,
}

impl FixedDelay {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

#[derive(Debug)]
pub enum RetryError<E> {
    /// 不可重试的错误，原样上抛
    Fatal(E),
    Exhausted { attempts: u32, last: E },
}

/// `op` 收到当前是第几次尝试（从 0 开始）。最后一次失败后不再等待。
pub fn with_fixed_delay<T, E, F>(
    policy: FixedDelay,
    label: &str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Result<T, E>,
    E: Transient + Display,
{
    let mut attempt = 0;
    loop {
        match op(attempt) {
            Ok(v) => return Ok(v),
            Err(e) if !e.is_transient() => return Err(RetryError::Fatal(e)),
            Err(e) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return Err(RetryError::Exhausted { attempts: attempt, last: e });
                }
                warn!(
                    target: "resolver",
                    attempt,
                    max_attempts = policy.max_attempts,
                    "{label}: {e}，{}s 后重试",
                    policy.delay.as_secs()
                );
                std::thread::sleep(policy.delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    enum E {
        Flaky,
        Broken,
    }

    impl fmt::Display for E {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Transient for E {
        fn is_transient(&self) -> bool {
            matches!(self, E::Flaky)
        }
    }

    fn policy(n: u32) -> FixedDelay {
        FixedDelay::new(n, Duration::ZERO)
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let out = with_fixed_delay(policy(5), "t", |attempt| {
            if attempt < 2 { Err(E::Flaky) } else { Ok(attempt) }
        });
        assert_eq!(out.unwrap(), 2);
    }

    #[test]
    fn fatal_error_stops_immediately() {
        let mut calls = 0;
        let out: Result<(), _> = with_fixed_delay(policy(5), "t", |_| {
            calls += 1;
            Err(E::Broken)
        });
        assert!(matches!(out, Err(RetryError::Fatal(E::Broken))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn budget_caps_attempts() {
        let mut calls = 0;
        let out: Result<(), _> = with_fixed_delay(policy(3), "t", |_| {
            calls += 1;
            Err(E::Flaky)
        });
        assert!(matches!(
            out,
            Err(RetryError::Exhausted {
                attempts: 3,
                last: E::Flaky
            })
        ));
        assert_eq!(calls, 3);
    }
}
