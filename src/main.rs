use futures::FutureExt;
use relay_feed::components::FeedList;
use relay_feed::config::FEED_PAGE_SIZE;
use relay_feed::hooks::use_scroller;
use relay_feed::runtime::{now, WebRuntime};
use relay_feed::scroller::LoadMore;
use relay_feed::web_socket::WebSocketRelayClient;
use relay_feed::{
    load_data, logging, profiles, LoaderConfig, ProfileLoader, ScrollerOptions, SignedEvent,
};
use std::rc::Rc;
use yew::prelude::*;

#[derive(Clone, PartialEq)]
enum FeedStatus {
    Loading,
    Loaded(usize),
    Failed(String),
}

/// Grow the visible window by one page. Returns whether it grew.
fn grow_window(visible: &mut usize, total: usize) -> bool {
    if *visible >= total {
        return false;
    }
    *visible = (*visible + FEED_PAGE_SIZE).min(total);
    true
}

/// Job-request feed: loads the catalog once and reveals it page by page as
/// the user scrolls.
#[function_component(Feed)]
fn feed() -> Html {
    let loader = use_context::<ProfileLoader>();
    let events = use_mut_ref(Vec::<SignedEvent>::new);
    let visible = use_mut_ref(|| FEED_PAGE_SIZE);
    let status = use_state(|| FeedStatus::Loading);
    let redraw = use_force_update();
    let container = use_node_ref();

    {
        let loader = loader.clone();
        let events = events.clone();
        let status = status.clone();
        use_effect_with((), move |_| {
            if let Some(loader) = loader {
                wasm_bindgen_futures::spawn_local(async move {
                    let result = load_data(&loader, |event| events.borrow_mut().push(event)).await;
                    events
                        .borrow_mut()
                        .sort_by(|a, b| b.created_at.cmp(&a.created_at));
                    match result {
                        Ok(count) => {
                            log::info!("Loaded {} job requests", count);
                            status.set(FeedStatus::Loaded(count));
                        }
                        Err(err) => {
                            log::warn!("Feed failed to load: {}", err);
                            status.set(FeedStatus::Failed(err.to_string()));
                        }
                    }
                });
            }
            || ()
        });
    }

    let load_more: LoadMore = {
        let events = events.clone();
        let visible = visible.clone();
        let redraw = redraw.clone();
        Rc::new(move || {
            let total = events.borrow().len();
            let grew = grow_window(&mut visible.borrow_mut(), total);
            if grew {
                redraw.force_update();
            }
            futures::future::ready(Ok(())).boxed_local()
        })
    };
    use_scroller(container.clone(), ScrollerOptions::default(), load_more);

    if loader.is_none() {
        return html! {
            <div class="feed-error">{ "No profile loader configured" }</div>
        };
    }

    let shown: Rc<Vec<SignedEvent>> = {
        let events = events.borrow();
        let end = (*visible.borrow()).min(events.len());
        Rc::new(events[..end].to_vec())
    };

    html! {
        <div class="feed" ref={container}>
            {
                match &*status {
                    FeedStatus::Loading => html! { <div class="feed-status">{ "Loading job requests…" }</div> },
                    FeedStatus::Loaded(count) => html! {
                        <div class="feed-status">{ format!("{} job requests, profiles cached: {}", count, profiles().len()) }</div>
                    },
                    FeedStatus::Failed(message) => html! { <div class="feed-error">{ message.clone() }</div> },
                }
            }
            <FeedList events={shown} now={now()} />
        </div>
    }
}

/// App wrapper providing the shared ProfileLoader.
#[function_component]
pub fn App() -> Html {
    let loader = use_memo((), |_| {
        let runtime = WebRuntime::shared();
        let client = Rc::new(WebSocketRelayClient::new(Rc::clone(&runtime)));
        ProfileLoader::new(client, profiles(), runtime, LoaderConfig::default())
    });

    html! {
        <ContextProvider<ProfileLoader> context={(*loader).clone()}>
            <Feed />
        </ContextProvider<ProfileLoader>>
    }
}

/// Entry point: installs logging and renders the App.
fn main() {
    console_error_panic_hook::set_once();
    logging::init(log::LevelFilter::Info);
    yew::Renderer::<App>::new().render();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_grows_by_a_page_up_to_total() {
        let mut visible = FEED_PAGE_SIZE;
        assert!(grow_window(&mut visible, FEED_PAGE_SIZE * 3));
        assert_eq!(visible, FEED_PAGE_SIZE * 2);
        assert!(grow_window(&mut visible, FEED_PAGE_SIZE * 2 + 5));
        assert_eq!(visible, FEED_PAGE_SIZE * 2 + 5);
        assert!(!grow_window(&mut visible, FEED_PAGE_SIZE * 2 + 5));
    }
}
