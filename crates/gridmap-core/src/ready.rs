//! One-time "map surface is ready" broadcast.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};

type Initializer = Box<dyn FnOnce()>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReadyState {
    #[default]
    Pending,
    Ready,
    Failed(String),
}

#[derive(Default)]
struct Inner {
    state: ReadyState,
    queue: Vec<Initializer>,
}

/// Shared registry of initializers waiting for the map surface.
///
/// Clones share state. Every initializer runs at most once: registrations before
/// [`mark_ready`](Self::mark_ready) run in registration order when it is called, later
/// registrations run synchronously inside [`register`](Self::register). Callbacks are invoked
/// with no internal borrow held, so they may register further initializers.
#[derive(Clone, Default)]
pub struct MapReadyRegistry {
    inner: Rc<RefCell<Inner>>,
}

impl std::fmt::Debug for MapReadyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MapReadyRegistry")
            .field("state", &inner.state)
            .field("queued", &inner.queue.len())
            .finish()
    }
}

impl MapReadyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReadyState {
        self.inner.borrow().state.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ReadyState::Ready
    }

    pub fn pending_count(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Runs `init` now if ready, queues it if pending. After a load failure the initializer is
    /// dropped unrun and `ResourceLoadFailed` is returned.
    pub fn register<F>(&self, init: F) -> Result<()>
    where
        F: FnOnce() + 'static,
    {
        let state = {
            let mut inner = self.inner.borrow_mut();
            let state = inner.state.clone();
            if state == ReadyState::Pending {
                inner.queue.push(Box::new(init));
                return Ok(());
            }
            state
        };
        match state {
            ReadyState::Ready => {
                init();
                Ok(())
            }
            ReadyState::Failed(message) => Err(Error::ResourceLoadFailed { message }),
            ReadyState::Pending => Ok(()),
        }
    }

    /// Flips to ready and drains the queue. Returns the number of initializers run; `0` on
    /// every call after the first.
    pub fn mark_ready(&self) -> usize {
        let queued = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != ReadyState::Pending {
                return 0;
            }
            inner.state = ReadyState::Ready;
            std::mem::take(&mut inner.queue)
        };
        let count = queued.len();
        tracing::debug!(initializers = count, "map ready");
        for init in queued {
            init();
        }
        count
    }

    /// Records a load failure. Queued initializers are discarded without running.
    pub fn mark_failed(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        let dropped = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != ReadyState::Pending {
                return false;
            }
            tracing::warn!(%message, "map resource failed to load");
            inner.state = ReadyState::Failed(message);
            std::mem::take(&mut inner.queue)
        };
        drop(dropped);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl Fn(u32) -> Box<dyn FnOnce()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        let make = move |n: u32| -> Box<dyn FnOnce()> {
            let l = l.clone();
            Box::new(move || l.borrow_mut().push(n))
        };
        (log, make)
    }

    #[test]
    fn queued_initializers_run_once_in_order() {
        let reg = MapReadyRegistry::new();
        let (log, make) = recorder();
        for n in 1..=3 {
            reg.register(make(n)).unwrap();
        }
        assert!(log.borrow().is_empty());
        assert_eq!(reg.pending_count(), 3);

        assert_eq!(reg.mark_ready(), 3);
        assert_eq!(*log.borrow(), vec![1, 2, 3]);

        reg.register(make(4)).unwrap();
        assert_eq!(*log.borrow(), vec![1, 2, 3, 4]);

        assert_eq!(reg.mark_ready(), 0);
        assert_eq!(*log.borrow(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn initializers_may_register_during_broadcast() {
        let reg = MapReadyRegistry::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (reg2, log2) = (reg.clone(), log.clone());
        reg.register(move || {
            log2.borrow_mut().push("outer");
            let log3 = log2.clone();
            reg2.register(move || log3.borrow_mut().push("inner")).unwrap();
        })
        .unwrap();
        reg.mark_ready();
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn failure_discards_queue_and_rejects_later_registrations() {
        let reg = MapReadyRegistry::new();
        let (log, make) = recorder();
        reg.register(make(1)).unwrap();
        assert!(reg.mark_failed("script error"));
        assert!(!reg.mark_failed("again"));
        assert_eq!(reg.mark_ready(), 0);

        let err = reg.register(make(2)).unwrap_err();
        assert_eq!(
            err,
            Error::ResourceLoadFailed {
                message: "script error".to_string()
            }
        );
        assert!(log.borrow().is_empty());
        assert_eq!(reg.state(), ReadyState::Failed("script error".to_string()));
    }
}
