//! Scheduling primitives: spawning local tasks, timers and animation frames.
//!
//! Everything in this crate runs on a single thread. Components receive a
//! [`SharedRuntime`] so the same code drives the browser event loop and the
//! deterministic clock used by tests.

use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub trait Runtime {
    /// Run `task` to completion in the background.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);

    /// Resolve after `ms` milliseconds. The deadline is taken when this is
    /// called, not when the future is first polled.
    fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()>;

    /// Resolve on the next animation frame.
    fn next_frame(&self) -> LocalBoxFuture<'static, ()>;
}

pub type SharedRuntime = Rc<dyn Runtime>;

/// Browser runtime backed by the page's event loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebRuntime;

impl WebRuntime {
    pub fn shared() -> SharedRuntime {
        Rc::new(WebRuntime)
    }
}

impl Runtime for WebRuntime {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()> {
        gloo_timers::future::TimeoutFuture::new(ms).boxed_local()
    }

    fn next_frame(&self) -> LocalBoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel::<()>();
        let callback = Closure::once_into_js(move |_ts: f64| {
            let _ = tx.send(());
        });
        match gloo_utils::window().request_animation_frame(callback.unchecked_ref()) {
            Ok(_) => async move {
                let _ = rx.await;
            }
            .boxed_local(),
            Err(_) => {
                log::warn!("requestAnimationFrame unavailable, ticking immediately");
                futures::future::ready(()).boxed_local()
            }
        }
    }
}

/// Current unix time in seconds.
#[cfg(target_arch = "wasm32")]
pub fn now() -> u64 {
    (js_sys::Date::now() / 1000.0) as u64
}

/// Current unix time in seconds.
#[cfg(not(target_arch = "wasm32"))]
pub fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic runtime: time only moves when a test calls `advance`.

    use super::Runtime;
    use futures::channel::oneshot;
    use futures::executor::{LocalPool, LocalSpawner};
    use futures::future::LocalBoxFuture;
    use futures::task::LocalSpawnExt;
    use futures::FutureExt;
    use std::cell::{Cell, RefCell};

    pub struct ManualRuntime {
        pool: RefCell<LocalPool>,
        spawner: LocalSpawner,
        now: Cell<u64>,
        timers: RefCell<Vec<(u64, oneshot::Sender<()>)>>,
        frames: Cell<usize>,
    }

    impl ManualRuntime {
        pub fn new() -> Self {
            let pool = LocalPool::new();
            let spawner = pool.spawner();
            Self {
                pool: RefCell::new(pool),
                spawner,
                now: Cell::new(0),
                timers: RefCell::new(Vec::new()),
                frames: Cell::new(0),
            }
        }

        pub fn now(&self) -> u64 {
            self.now.get()
        }

        /// Number of animation frames requested so far.
        pub fn frames_requested(&self) -> usize {
            self.frames.get()
        }

        pub fn run_until_stalled(&self) {
            self.pool.borrow_mut().run_until_stalled();
        }

        /// Move the clock forward, firing timers in deadline order and
        /// letting woken tasks run in between.
        pub fn advance(&self, ms: u64) {
            let target = self.now.get() + ms;
            loop {
                self.run_until_stalled();
                let next = self
                    .timers
                    .borrow()
                    .iter()
                    .map(|(deadline, _)| *deadline)
                    .filter(|deadline| *deadline <= target)
                    .min();
                let Some(deadline) = next else { break };
                self.now.set(deadline.max(self.now.get()));
                let due: Vec<_> = {
                    let mut timers = self.timers.borrow_mut();
                    let (due, pending): (Vec<_>, Vec<_>) = timers
                        .drain(..)
                        .partition(|(deadline, _)| *deadline <= self.now.get());
                    *timers = pending;
                    due
                };
                for (_, tx) in due {
                    let _ = tx.send(());
                }
            }
            self.now.set(target);
            self.run_until_stalled();
        }

        fn timer(&self, ms: u32) -> LocalBoxFuture<'static, ()> {
            let (tx, rx) = oneshot::channel();
            self.timers
                .borrow_mut()
                .push((self.now.get() + u64::from(ms), tx));
            async move {
                let _ = rx.await;
            }
            .boxed_local()
        }
    }

    impl Runtime for ManualRuntime {
        fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
            self.spawner
                .spawn_local(task)
                .expect("local pool accepts tasks");
        }

        fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()> {
            self.timer(ms)
        }

        fn next_frame(&self) -> LocalBoxFuture<'static, ()> {
            self.frames.set(self.frames.get() + 1);
            self.timer(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ManualRuntime;
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn sleeps_fire_in_deadline_order() {
        let rt = Rc::new(ManualRuntime::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        for ms in [300u32, 100, 200] {
            let log = Rc::clone(&log);
            let sleep = rt.sleep(ms);
            rt.spawn(Box::pin(async move {
                sleep.await;
                log.borrow_mut().push(ms);
            }));
        }

        rt.advance(150);
        assert_eq!(*log.borrow(), vec![100]);
        rt.advance(150);
        assert_eq!(*log.borrow(), vec![100, 200, 300]);
        assert_eq!(rt.now(), 300);
    }

    #[test]
    fn frames_are_counted_and_fire_on_advance() {
        let rt = Rc::new(ManualRuntime::new());
        let fired = Rc::new(RefCell::new(false));
        let frame = rt.next_frame();
        {
            let fired = Rc::clone(&fired);
            rt.spawn(Box::pin(async move {
                frame.await;
                *fired.borrow_mut() = true;
            }));
        }
        rt.run_until_stalled();
        assert!(!*fired.borrow());
        rt.advance(0);
        assert!(*fired.borrow());
        assert_eq!(rt.frames_requested(), 1);
    }

    #[test]
    fn now_is_past_2020() {
        assert!(now() > 1_577_836_800);
    }
}
