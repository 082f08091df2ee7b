//! Timer-window accumulator.
//!
//! The first item pushed after a flush opens a window; every item pushed
//! before the window closes is handed to the flush callback in one call.

use crate::runtime::SharedRuntime;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

struct BatcherInner<T> {
    window_ms: u32,
    runtime: SharedRuntime,
    pending: RefCell<Vec<T>>,
    scheduled: Cell<bool>,
    flush: Box<dyn Fn(Vec<T>)>,
}

/// Collects items for `window_ms` and flushes them as one batch.
pub struct Batcher<T> {
    inner: Rc<BatcherInner<T>>,
}

impl<T> Clone for Batcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Batcher<T> {
    pub fn new(
        window_ms: u32,
        runtime: SharedRuntime,
        flush: impl Fn(Vec<T>) + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(BatcherInner {
                window_ms,
                runtime,
                pending: RefCell::new(Vec::new()),
                scheduled: Cell::new(false),
                flush: Box::new(flush),
            }),
        }
    }

    pub fn push(&self, item: T) {
        self.inner.pending.borrow_mut().push(item);
        if self.inner.scheduled.replace(true) {
            return;
        }

        let inner = Rc::clone(&self.inner);
        let window = inner.runtime.sleep(inner.window_ms);
        self.inner.runtime.spawn(Box::pin(async move {
            window.await;
            inner.scheduled.set(false);
            let items = std::mem::take(&mut *inner.pending.borrow_mut());
            if !items.is_empty() {
                (inner.flush)(items);
            }
        }));
    }

    /// Items waiting for the current window to close.
    pub fn pending_len(&self) -> usize {
        self.inner.pending.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::ManualRuntime;

    fn recording_batcher(rt: &Rc<ManualRuntime>, window_ms: u32) -> (Batcher<u32>, Rc<RefCell<Vec<Vec<u32>>>>) {
        let flushed = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&flushed);
        let runtime: SharedRuntime = rt.clone();
        let batcher = Batcher::new(window_ms, runtime, move |items| sink.borrow_mut().push(items));
        (batcher, flushed)
    }

    #[test]
    fn items_in_one_window_flush_together() {
        let rt = Rc::new(ManualRuntime::new());
        let (batcher, flushed) = recording_batcher(&rt, 500);

        batcher.push(1);
        rt.advance(200);
        batcher.push(2);
        batcher.push(3);
        rt.advance(299);
        assert!(flushed.borrow().is_empty());
        assert_eq!(batcher.pending_len(), 3);

        rt.advance(1);
        assert_eq!(*flushed.borrow(), vec![vec![1, 2, 3]]);
        assert_eq!(batcher.pending_len(), 0);
    }

    #[test]
    fn next_push_opens_a_new_window() {
        let rt = Rc::new(ManualRuntime::new());
        let (batcher, flushed) = recording_batcher(&rt, 300);

        batcher.push(1);
        rt.advance(300);
        batcher.push(2);
        rt.advance(100);
        assert_eq!(flushed.borrow().len(), 1);
        rt.advance(200);
        assert_eq!(*flushed.borrow(), vec![vec![1], vec![2]]);
    }

    #[test]
    fn flush_may_push_again() {
        let rt = Rc::new(ManualRuntime::new());
        let flushed = Rc::new(RefCell::new(Vec::new()));
        let slot: Rc<RefCell<Option<Batcher<u32>>>> = Rc::new(RefCell::new(None));

        let batcher = {
            let flushed = Rc::clone(&flushed);
            let slot = Rc::clone(&slot);
            let runtime: SharedRuntime = rt.clone();
            Batcher::new(100, runtime, move |items: Vec<u32>| {
                flushed.borrow_mut().push(items.clone());
                if items == vec![1] {
                    if let Some(b) = slot.borrow().as_ref() {
                        b.push(2);
                    }
                }
            })
        };
        *slot.borrow_mut() = Some(batcher.clone());

        batcher.push(1);
        rt.advance(200);
        assert_eq!(*flushed.borrow(), vec![vec![1], vec![2]]);
    }
}
