use super::super::{Model, Msg};
use gloo_timers::callback::{Interval, Timeout};
use shared::{Ticket, Timer};
use std::time::Duration;
use yew::html::Scope;
use yew::prelude::*;

enum TimerHandle {
    // Held for its Drop, which clears the browser timer.
    Interval(#[allow(dead_code)] Interval),
    Timeout(#[allow(dead_code)] Timeout),
}

/// The one progress timer owned by the page. Replacing or emptying the slot
/// drops the previous handle, which cancels it.
#[derive(Default)]
pub struct TimerSlot {
    running: Option<(Ticket, TimerHandle)>,
}

impl TimerSlot {
    pub fn apply(&mut self, timer: Timer, link: &Scope<Model>) {
        self.running = match timer {
            Timer::Cancel => None,
            Timer::Interval { ticket, period } => {
                let link = link.clone();
                let handle = Interval::new(millis(period), move || {
                    link.send_message(Msg::Tick(ticket));
                });
                Some((ticket, TimerHandle::Interval(handle)))
            }
            Timer::Delay { ticket, delay } => {
                let link = link.clone();
                let handle = Timeout::new(millis(delay), move || {
                    link.send_message(Msg::Settle(ticket));
                });
                Some((ticket, TimerHandle::Timeout(handle)))
            }
        };
    }

    /// Drops the running timer if it still belongs to `ticket`.
    pub fn stop(&mut self, ticket: Ticket) {
        if matches!(&self.running, Some((running, _)) if *running == ticket) {
            self.running = None;
        }
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

pub fn render_notice(model: &Model) -> Html {
    if let Some(notice) = &model.notice {
        html! {
            <div class="notice" role="status">
                <i class="fa-solid fa-triangle-exclamation"></i>
                <p>{ &notice.text }</p>
            </div>
        }
    } else {
        html! {}
    }
}

pub fn render_error_message(model: &Model, ctx: &Context<Model>) -> Html {
    let message = model
        .orchestrator
        .last_error()
        .map(|error| error.to_string())
        .or_else(|| model.download_error.clone());

    if let Some(error_msg) = message {
        html! {
            <div class="error-message">
                <i class="fa-solid fa-circle-exclamation"></i>
                <p>{ error_msg }</p>
                <button
                    class="dismiss-btn"
                    title="Dismiss"
                    onclick={ctx.link().callback(|_| Msg::DismissError)}
                >
                    {"×"}
                </button>
            </div>
        }
    } else {
        html! {}
    }
}
