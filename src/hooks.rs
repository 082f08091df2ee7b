use crate::cache::{profiles, Profile};
use crate::loaders::ProfileLoader;
use crate::runtime::WebRuntime;
use crate::scroller::{LoadMore, Scroller, ScrollerOptions, WebScrollSource};
use std::rc::Rc;
use web_sys::Element;
use yew::prelude::*;

/// Profile for `pubkey`, re-rendering the caller whenever the cache changes.
///
/// The lookup goes through the `ProfileLoader` from context, so many
/// components asking at once share a single relay round trip. Without a
/// loader in context this only reads the page-wide cache.
#[hook]
pub fn use_profile(pubkey: String) -> Option<Profile> {
    let loader = use_context::<ProfileLoader>();
    let redraw = use_force_update();
    let store = loader
        .as_ref()
        .map(|l| l.store().clone())
        .unwrap_or_else(profiles);

    {
        let store = store.clone();
        use_effect_with(pubkey.clone(), move |pubkey| {
            if let Some(loader) = loader {
                loader.request_profile(pubkey.clone());
            }
            let subscription = store.subscribe(move || redraw.force_update());
            move || drop(subscription)
        });
    }

    store.get(&pubkey)
}

/// Run a [`Scroller`] against `container` for as long as the caller is mounted.
///
/// `load_more` may change between renders; the running loop always calls the
/// latest one.
#[hook]
pub fn use_scroller(container: NodeRef, options: ScrollerOptions, load_more: LoadMore) {
    let latest = use_mut_ref(|| Rc::clone(&load_more));
    *latest.borrow_mut() = load_more;

    use_effect_with((container, options), move |(container, options)| {
        let source = WebScrollSource::new(container.cast::<Element>());
        let load_more: LoadMore = Rc::new(move || {
            let current = Rc::clone(&*latest.borrow());
            current()
        });
        let scroller = Scroller::start(
            WebRuntime::shared(),
            Rc::new(source),
            options.clone(),
            load_more,
        );
        move || scroller.stop()
    });
}
