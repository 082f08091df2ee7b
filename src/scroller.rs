//! Infinite-scroll trigger.
//!
//! A [`Scroller`] polls the scroll position once per animation frame (with a
//! cooldown between checks) and calls `load_more` whenever the viewport gets
//! within `threshold` pixels of the end of the content. At most one
//! `load_more` runs at a time: the loop awaits it before sleeping.

use crate::config::{SCROLL_DELAY_MS, SCROLL_THRESHOLD_PX};
use crate::runtime::SharedRuntime;
use futures::future::LocalBoxFuture;
use log::{debug, error};
use std::cell::Cell;
use std::rc::Rc;
use web_sys::Element;

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollerOptions {
    /// Cooldown between two checks.
    pub delay_ms: u32,
    /// Distance from the end of the content that counts as "near the end".
    pub threshold: f64,
    /// The container grows upwards (`column-reverse`): its `scrollTop` runs
    /// negative and is always read from the container.
    pub reverse: bool,
}

impl Default for ScrollerOptions {
    fn default() -> Self {
        Self {
            delay_ms: SCROLL_DELAY_MS,
            threshold: SCROLL_THRESHOLD_PX,
            reverse: false,
        }
    }
}

/// One reading of the scroll geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub offset: f64,
    pub viewport_height: f64,
    pub scroll_height: f64,
}

impl ScrollMetrics {
    pub fn near_end(&self, threshold: f64) -> bool {
        self.offset.abs() + self.viewport_height + threshold > self.scroll_height
    }
}

pub trait ScrollSource {
    /// `reverse` asks for the container's own offset even when it is zero.
    fn metrics(&self, reverse: bool) -> ScrollMetrics;
}

/// Reads the window, or a scroll container when one is given.
pub struct WebScrollSource {
    element: Option<Element>,
}

impl WebScrollSource {
    pub fn new(element: Option<Element>) -> Self {
        Self { element }
    }
}

impl ScrollSource for WebScrollSource {
    fn metrics(&self, reverse: bool) -> ScrollMetrics {
        let window = gloo_utils::window();
        let scroll_y = window.scroll_y().unwrap_or(0.0);
        let viewport_height = window
            .inner_height()
            .ok()
            .and_then(|h| h.as_f64())
            .unwrap_or(0.0);

        let scroll_top = self.element.as_ref().map(|el| f64::from(el.scroll_top()));
        let scroll_height = match &self.element {
            Some(el) => f64::from(el.scroll_height()),
            None => gloo_utils::document()
                .document_element()
                .map(|el| f64::from(el.scroll_height()))
                .unwrap_or(0.0),
        };

        ScrollMetrics {
            offset: select_offset(scroll_top, scroll_y, reverse),
            viewport_height,
            scroll_height,
        }
    }
}

/// Absolute scroll offset from the container's `scrollTop`, if there is a
/// container, and the window's `scrollY`.
///
/// An unscrolled container reports 0, in which case the window offset is used
/// unless the container scrolls upwards.
pub fn select_offset(scroll_top: Option<f64>, scroll_y: f64, reverse: bool) -> f64 {
    let offset = match scroll_top {
        Some(top) if reverse || top != 0.0 => top,
        _ => scroll_y,
    };
    offset.abs()
}

pub type LoadMore = Rc<dyn Fn() -> LocalBoxFuture<'static, Result<(), String>>>;

struct ScrollerState {
    stopped: Cell<bool>,
    options: ScrollerOptions,
    source: Rc<dyn ScrollSource>,
    load_more: LoadMore,
    runtime: SharedRuntime,
}

impl ScrollerState {
    async fn check(&self) -> Result<bool, String> {
        let metrics = self.source.metrics(self.options.reverse);
        if !metrics.near_end(self.options.threshold) {
            return Ok(false);
        }
        debug!("Near end of content ({:?}), loading more", metrics);
        (self.load_more)().await?;
        Ok(true)
    }
}

async fn run(state: Rc<ScrollerState>) {
    loop {
        state.runtime.next_frame().await;
        if let Err(err) = state.check().await {
            error!("Infinite scroll stopped, load_more failed: {}", err);
            state.stopped.set(true);
            return;
        }
        state.runtime.sleep(state.options.delay_ms).await;
        if state.stopped.get() {
            debug!("Scroller stopped");
            return;
        }
    }
}

/// Handle to a running scroll loop. Running → Stopped is one-way.
#[derive(Clone)]
pub struct Scroller {
    state: Rc<ScrollerState>,
}

impl Scroller {
    /// Schedule the first check on the next animation frame and keep
    /// checking until [`Scroller::stop`].
    pub fn start(
        runtime: SharedRuntime,
        source: Rc<dyn ScrollSource>,
        options: ScrollerOptions,
        load_more: LoadMore,
    ) -> Self {
        let state = Rc::new(ScrollerState {
            stopped: Cell::new(false),
            options,
            source,
            load_more,
            runtime,
        });
        state.runtime.spawn(Box::pin(run(Rc::clone(&state))));
        Self { state }
    }

    /// One check outside the loop's schedule. Returns whether `load_more` ran.
    pub async fn check(&self) -> Result<bool, String> {
        self.state.check().await
    }

    /// No further checks are scheduled; one already in flight still finishes.
    pub fn stop(&self) {
        self.state.stopped.set(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.state.stopped.get()
    }
}
