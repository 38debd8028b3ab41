mod api;
mod components;

use components::handlers;
use components::utils::TimerSlot;
use gloo_events::{EventListener, EventListenerOptions};
use gloo_file::File as GlooFile;
use gloo_file::callbacks::FileReader;
use gloo_storage::{LocalStorage, Storage};
use gloo_timers::callback::Timeout;
use shared::intake::DecodeTicket;
use shared::{
    AnalysisParams, AnalysisResult, ArtifactKind, Environment, FileIntake, IntakePolicy, Notice,
    ProgressState, RequestId, Ticket, UploadOrchestrator,
};
use web_sys::DragEvent;
use yew::prelude::*;

pub const CONFIG_KEY: &str = "detectree.config";

// Yew msg components
pub enum Msg {
    // File intake
    FileChosen(GlooFile),
    PreviewDecoded(DecodeTicket, Option<String>),
    Discard,

    // Progress timers
    Tick(Ticket),
    Settle(Ticket),

    // Analysis
    Analyze,
    UploadProgress(RequestId, u64, Option<u64>),
    UploadSent(RequestId),
    UploadResponse(RequestId, u16, String),
    UploadFailed(RequestId, String),
    Download(ArtifactKind),
    DownloadFailed(String),

    // Configuration
    SetEnvironment(Environment),
    SetConfidence(f64),

    // UI states
    SetDragging(bool),
    HandleDrop(DragEvent),
    DismissNotice,
    DismissError,
}

// Main component
pub struct Model {
    progress: ProgressState,
    intake: FileIntake,
    orchestrator: UploadOrchestrator,
    params: AnalysisParams,
    file: Option<GlooFile>,
    reader: Option<FileReader>,
    upload: Option<api::UploadHandle>,
    progress_timer: TimerSlot,
    result: Option<AnalysisResult>,
    notice: Option<Notice>,
    notice_timeout: Option<Timeout>,
    download_error: Option<String>,
    is_dragging: bool,
    drop_guards: Vec<EventListener>,
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(_ctx: &Context<Self>) -> Self {
        let params = LocalStorage::get::<AnalysisParams>(CONFIG_KEY)
            .map(|stored| AnalysisParams::new(stored.environment, stored.confidence))
            .unwrap_or_default();

        // Files dropped outside the zone must not navigate away from the app.
        let drop_guards: Vec<EventListener> = web_sys::window()
            .map(|window| {
                ["dragover", "drop"]
                    .into_iter()
                    .map(|event_type| {
                        EventListener::new_with_options(
                            &window,
                            event_type,
                            EventListenerOptions::enable_prevent_default(),
                            |event| event.prevent_default(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            progress: ProgressState::new(),
            intake: FileIntake::new(IntakePolicy::default()),
            orchestrator: UploadOrchestrator::new(),
            params,
            file: None,
            reader: None,
            upload: None,
            progress_timer: TimerSlot::default(),
            result: None,
            notice: None,
            notice_timeout: None,
            download_error: None,
            is_dragging: false,
            drop_guards,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            // File intake
            Msg::FileChosen(file) => handlers::handle_file_chosen(self, ctx, file),
            Msg::PreviewDecoded(decode, preview) => {
                handlers::handle_preview_decoded(self, ctx, decode, preview)
            }
            Msg::Discard => handlers::handle_discard(self, ctx),

            // Progress timers
            Msg::Tick(ticket) => handlers::handle_tick(self, ticket),
            Msg::Settle(ticket) => handlers::handle_settle(self, ticket),

            // Analysis
            Msg::Analyze => handlers::handle_analyze(self, ctx),
            Msg::UploadProgress(id, loaded, total) => {
                self.orchestrator
                    .on_upload_progress(id, loaded, total, &mut self.progress);
                true
            }
            Msg::UploadSent(id) => handlers::handle_upload_sent(self, ctx, id),
            Msg::UploadResponse(id, status, body) => {
                handlers::handle_upload_response(self, ctx, id, status, body)
            }
            Msg::UploadFailed(id, reason) => handlers::handle_upload_failed(self, ctx, id, reason),
            Msg::Download(kind) => handlers::handle_download(self, ctx, kind),
            Msg::DownloadFailed(error) => {
                self.download_error = Some(error);
                true
            }

            // Configuration
            Msg::SetEnvironment(environment) => {
                let confidence = self.params.confidence;
                handlers::handle_config_change(self, environment, confidence)
            }
            Msg::SetConfidence(confidence) => {
                let environment = self.params.environment;
                handlers::handle_config_change(self, environment, confidence)
            }

            // UI states
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }
            Msg::HandleDrop(event) => handlers::handle_drop(self, ctx, event),
            Msg::DismissNotice => {
                self.notice = None;
                self.notice_timeout = None;
                true
            }
            Msg::DismissError => {
                self.orchestrator.dismiss_error();
                self.download_error = None;
                true
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { components::header::render_header() }

                <main class="main-content">
                    <div class="card">
                        {
                            if self.result.is_some() {
                                components::results::render_results(self, ctx)
                            } else {
                                components::upload_section::render_upload_section(self, ctx)
                            }
                        }
                        { components::environment_selector::render_controls(self, ctx) }
                    </div>
                    { components::utils::render_notice(self) }
                    { components::utils::render_error_message(self, ctx) }
                </main>

                <footer class="app-footer">
                    <p>{"Tree crown detection | Fullstack Rust WASM"}</p>
                </footer>
            </div>
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
