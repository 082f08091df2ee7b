//! Yew view components for the job-request feed.

use crate::event::{kinds, SignedEvent};
use crate::hooks::use_profile;
use crate::utils::{display_name, format_age};
use std::rc::Rc;
use yew::prelude::*;

const SNIPPET_CHARS: usize = 280;

fn kind_label(kind: u16) -> &'static str {
    match kind {
        kinds::JOB_REQUEST_DISCOVERY => "Content discovery",
        kinds::JOB_REQUEST_SEARCH => "People search",
        _ => "Job request",
    }
}

/// First `SNIPPET_CHARS` characters of `content`, with an ellipsis if cut.
fn snippet(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

#[derive(Properties, PartialEq)]
pub struct ProfileNameProps {
    pub pubkey: AttrValue,
}

/// Author name, loaded lazily through the profile loader.
#[function_component(ProfileName)]
pub fn profile_name(props: &ProfileNameProps) -> Html {
    let profile = use_profile(props.pubkey.to_string());
    let picture = profile
        .as_ref()
        .and_then(|p| p.get("picture"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    html! {
        <span class="profile-name">
            if let Some(src) = picture {
                <img class="avatar" src={src} alt="" />
            }
            { display_name(profile.as_ref(), &props.pubkey) }
        </span>
    }
}

#[derive(Properties, PartialEq)]
pub struct JobRowProps {
    pub event: SignedEvent,
    pub now: u64,
}

#[function_component(JobRow)]
pub fn job_row(props: &JobRowProps) -> Html {
    let event = &props.event;
    html! {
        <li class="job-row">
            <div class="job-meta">
                <ProfileName pubkey={event.pubkey.clone()} />
                <span class="job-kind">{ kind_label(event.kind) }</span>
                <span class="job-age">{ format_age(event.created_at, props.now) }</span>
            </div>
            <p class="job-content">{ snippet(&event.content) }</p>
        </li>
    }
}

#[derive(Properties, PartialEq)]
pub struct FeedListProps {
    pub events: Rc<Vec<SignedEvent>>,
    pub now: u64,
}

#[function_component(FeedList)]
pub fn feed_list(props: &FeedListProps) -> Html {
    if props.events.is_empty() {
        return html! {
            <p class="no-results-message">{ "No job requests yet" }</p>
        };
    }

    html! {
        <ul class="job-list">
            { props.events.iter().map(|event| html! {
                <JobRow key={event.id.clone()} event={event.clone()} now={props.now} />
            }).collect::<Html>() }
        </ul>
    }
}
