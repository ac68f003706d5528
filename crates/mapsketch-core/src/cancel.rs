//! Cooperative cancellation shared between a session and its pending work.
//!
//! Everything here is single-threaded: sessions, engine callbacks and the
//! futures awaiting engine handshakes all run on one logical thread.

use futures::future::{self, Either};
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

#[derive(Debug, Default)]
struct TokenState {
    cancelled: bool,
    /// Tasks parked in [`Cancelled`] futures, keyed by waiter.
    wakers: Vec<(u64, Waker)>,
    next_key: u64,
}

/// A one-shot cancellation signal.
///
/// Clones share the same signal. Each session allocates a fresh token and
/// never resets it; once tripped it stays tripped.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Rc<RefCell<TokenState>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.borrow().cancelled
    }

    /// Trip the signal and wake everything waiting on it.
    /// Returns `false` if it was already tripped.
    pub fn cancel(&self) -> bool {
        let wakers = {
            let mut state = self.state.borrow_mut();
            if state.cancelled {
                return false;
            }
            state.cancelled = true;
            std::mem::take(&mut state.wakers)
        };
        for (_, waker) in wakers {
            waker.wake();
        }
        true
    }

    /// Whether both tokens are clones of the same signal.
    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Future that resolves once the token is tripped.
    pub fn cancelled(&self) -> Cancelled {
        Cancelled {
            token: self.clone(),
            key: None,
        }
    }

    /// Drive `work` until it finishes or the token trips.
    ///
    /// Returns `None` when cancelled, including the case where `work`
    /// finished but the token tripped before this continuation resumed.
    pub async fn run_until_cancelled<F: Future>(&self, work: F) -> Option<F::Output> {
        if self.is_cancelled() {
            return None;
        }

        let work = std::pin::pin!(work);
        match future::select(work, self.cancelled()).await {
            Either::Left((output, _)) if !self.is_cancelled() => Some(output),
            _ => None,
        }
    }
}

/// Future returned by [`CancellationToken::cancelled`].
///
/// Registers at most one waker with the token and withdraws it when
/// dropped, so abandoned waits do not accumulate on a long-lived token.
#[derive(Debug)]
pub struct Cancelled {
    token: CancellationToken,
    key: Option<u64>,
}

impl Future for Cancelled {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = &mut *self;
        let mut state = this.token.state.borrow_mut();
        if state.cancelled {
            return Poll::Ready(());
        }
        let waker = cx.waker();
        match this.key {
            Some(key) => {
                if let Some((_, slot)) = state.wakers.iter_mut().find(|(k, _)| *k == key) {
                    if !slot.will_wake(waker) {
                        *slot = waker.clone();
                    }
                }
            }
            None => {
                let key = state.next_key;
                state.next_key += 1;
                state.wakers.push((key, waker.clone()));
                this.key = Some(key);
            }
        }
        Poll::Pending
    }
}

impl Drop for Cancelled {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.token.state.borrow_mut().wakers.retain(|(k, _)| *k != key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;

    #[test]
    fn test_cancel_is_one_shot() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        assert!(token.cancel());
        assert!(token.is_cancelled());
        assert!(!token.cancel());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_clones_share_signal() {
        let token = CancellationToken::new();
        let clone = token.clone();
        let other = CancellationToken::new();

        clone.cancel();
        assert!(token.is_cancelled());
        assert!(token.same_as(&clone));
        assert!(!token.same_as(&other));
        assert!(!other.is_cancelled());
    }

    #[test]
    fn test_run_until_cancelled_completes() {
        let token = CancellationToken::new();
        let output = pollster::block_on(token.run_until_cancelled(async { 42 }));
        assert_eq!(output, Some(42));
    }

    #[test]
    fn test_run_until_cancelled_short_circuits_when_tripped() {
        let token = CancellationToken::new();
        token.cancel();
        let output = pollster::block_on(token.run_until_cancelled(async { 42 }));
        assert_eq!(output, None);
    }

    #[test]
    fn test_pending_work_is_abandoned_on_cancel() {
        let token = CancellationToken::new();
        let (sender, receiver) = oneshot::channel::<u32>();

        let output = pollster::block_on(async {
            let mut work = std::pin::pin!(token.run_until_cancelled(receiver));
            assert!(futures::poll!(work.as_mut()).is_pending());

            token.cancel();
            // Completing the work after the trip must not leak through.
            let _ = sender.send(7);
            work.await
        });

        assert_eq!(output, None);
    }

    #[test]
    fn test_finished_work_withdraws_its_waker() {
        let token = CancellationToken::new();

        for value in 0..3 {
            let (sender, receiver) = oneshot::channel::<u32>();
            let output = pollster::block_on(async {
                let mut work = std::pin::pin!(token.run_until_cancelled(receiver));
                assert!(futures::poll!(work.as_mut()).is_pending());
                assert_eq!(token.state.borrow().wakers.len(), 1);

                let _ = sender.send(value);
                work.await
            });
            assert_eq!(output, Some(Ok(value)));
            assert!(token.state.borrow().wakers.is_empty());
        }
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_concurrent_waits_register_separately() {
        let token = CancellationToken::new();

        pollster::block_on(async {
            let mut first = std::pin::pin!(token.cancelled());
            let mut second = std::pin::pin!(token.cancelled());
            assert!(futures::poll!(first.as_mut()).is_pending());
            assert!(futures::poll!(second.as_mut()).is_pending());
            assert!(futures::poll!(first.as_mut()).is_pending());
            assert_eq!(token.state.borrow().wakers.len(), 2);

            token.cancel();
            first.await;
            second.await;
        });
        assert!(token.state.borrow().wakers.is_empty());
    }
}
