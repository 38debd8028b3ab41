use super::super::{CONFIG_KEY, Model, Msg};
use crate::api;
use gloo_file::File as GlooFile;
use gloo_file::callbacks::read_as_data_url;
use gloo_storage::{LocalStorage, Storage};
use gloo_timers::callback::Timeout;
use shared::intake::{DecodeTicket, NOTICE_TIMEOUT};
use shared::{
    AnalysisParams, ArtifactKind, Environment, FileCandidate, ModeKind, Notice, RequestId, Tick,
    Ticket,
};
use wasm_bindgen_futures::spawn_local;
use web_sys::DragEvent;
use yew::prelude::*;

pub fn handle_file_chosen(model: &mut Model, ctx: &Context<Model>, file: GlooFile) -> bool {
    if model.orchestrator.is_busy() {
        log::warn!("Ignoring {} while an analysis is running", file.name());
        return false;
    }

    let candidate = FileCandidate::new(file.name(), file.size(), file.raw_mime_type());
    match model.intake.select_file(candidate, &mut model.progress) {
        Ok(selection) => {
            model.result = None;
            model.orchestrator.dismiss_error();
            model.progress_timer.apply(selection.timer, ctx.link());

            let link = ctx.link().clone();
            let decode = selection.decode;
            model.reader = Some(read_as_data_url(&file, move |result| {
                if let Err(e) = &result {
                    log::warn!("Failed to read file for preview: {:?}", e);
                }
                link.send_message(Msg::PreviewDecoded(decode, result.ok()));
            }));
            model.file = Some(file);
        }
        Err(e) => show_notice(model, ctx, Notice::from(&e)),
    }

    true
}

pub fn handle_preview_decoded(
    model: &mut Model,
    ctx: &Context<Model>,
    decode: DecodeTicket,
    preview: Option<String>,
) -> bool {
    if let Some(timer) = model.intake.finish_decode(decode, preview, &mut model.progress) {
        model.progress_timer.apply(timer, ctx.link());
    }
    true
}

pub fn handle_discard(model: &mut Model, ctx: &Context<Model>) -> bool {
    model.intake.clear();
    model.file = None;
    model.reader = None;
    model.upload = None;
    model.result = None;
    model.download_error = None;

    let timer = model.orchestrator.abandon(&mut model.progress);
    model.progress_timer.apply(timer, ctx.link());
    true
}

pub fn handle_tick(model: &mut Model, ticket: Ticket) -> bool {
    let tick = match model.progress.mode_kind() {
        ModeKind::PreviewLoading => model.progress.advance_preview(ticket),
        ModeKind::Processing => model
            .progress
            .advance_processing(ticket, js_sys::Math::random()),
        _ => Tick::Stale,
    };

    match tick {
        Tick::Continue => true,
        Tick::Stop => {
            model.progress_timer.stop(ticket);
            true
        }
        Tick::Stale => {
            model.progress_timer.stop(ticket);
            false
        }
    }
}

pub fn handle_settle(model: &mut Model, ticket: Ticket) -> bool {
    model.progress_timer.stop(ticket);
    model.progress.settle(ticket)
}

pub fn handle_analyze(model: &mut Model, ctx: &Context<Model>) -> bool {
    if !model.orchestrator.can_begin(model.intake.selected()) {
        log::warn!("Analyze ignored: an analysis is running or no file is accepted");
        return false;
    }
    let Some(file) = model.file.clone() else {
        log::warn!("Analyze requested without a file");
        return false;
    };

    model.result = None;
    model.download_error = None;
    model.reader = None;
    model.upload = None;

    let (request, timer) = model
        .orchestrator
        .begin(&file.name(), model.params, &mut model.progress);
    model.progress_timer.apply(timer, ctx.link());

    match api::send_analysis(&request, &file, ctx.link()) {
        Ok(handle) => model.upload = Some(handle),
        Err(e) => {
            log::error!("Failed to start upload: {}", e);
            let reason = e.to_string();
            if let Some((_, timer)) =
                model
                    .orchestrator
                    .on_network_failure(request.id, &reason, &mut model.progress)
            {
                model.progress_timer.apply(timer, ctx.link());
            }
        }
    }

    true
}

pub fn handle_upload_sent(model: &mut Model, ctx: &Context<Model>, id: RequestId) -> bool {
    match model.orchestrator.on_upload_sent(id, &mut model.progress) {
        Some(timer) => {
            model.progress_timer.apply(timer, ctx.link());
            true
        }
        None => false,
    }
}

pub fn handle_upload_response(
    model: &mut Model,
    ctx: &Context<Model>,
    id: RequestId,
    status: u16,
    body: String,
) -> bool {
    let Some((outcome, timer)) =
        model
            .orchestrator
            .on_response(id, status, &body, &mut model.progress)
    else {
        return false;
    };

    model.upload = None;
    model.progress_timer.apply(timer, ctx.link());
    if let Ok(result) = outcome {
        model.result = Some(result);
    }
    true
}

pub fn handle_upload_failed(
    model: &mut Model,
    ctx: &Context<Model>,
    id: RequestId,
    reason: String,
) -> bool {
    let Some((_, timer)) = model
        .orchestrator
        .on_network_failure(id, &reason, &mut model.progress)
    else {
        return false;
    };

    model.upload = None;
    model.progress_timer.apply(timer, ctx.link());
    true
}

pub fn handle_download(model: &mut Model, ctx: &Context<Model>, kind: ArtifactKind) -> bool {
    model.download_error = None;
    let link = ctx.link().clone();
    spawn_local(async move {
        if let Err(e) = api::download_artifact(kind).await {
            log::error!("Error downloading {} file: {}", kind, e);
            link.send_message(Msg::DownloadFailed(e.to_string()));
        }
    });
    true
}

pub fn handle_config_change(model: &mut Model, environment: Environment, confidence: f64) -> bool {
    let params = AnalysisParams::new(environment, confidence);
    if params == model.params {
        return false;
    }
    model.params = params;
    if let Err(e) = LocalStorage::set(CONFIG_KEY, params) {
        log::warn!("Failed to persist analysis settings: {}", e);
    }
    true
}

pub fn handle_drop(model: &mut Model, ctx: &Context<Model>, event: DragEvent) -> bool {
    event.prevent_default();
    model.is_dragging = false;

    let file = event
        .data_transfer()
        .and_then(|data_transfer| data_transfer.files())
        .and_then(|file_list| file_list.item(0));

    match file {
        Some(file) => handle_file_chosen(model, ctx, GlooFile::from(file)),
        None => true,
    }
}

fn show_notice(model: &mut Model, ctx: &Context<Model>, notice: Notice) {
    log::warn!("{}: {}", notice.kind, notice.text);
    let link = ctx.link().clone();
    let timeout = Timeout::new(NOTICE_TIMEOUT.as_millis() as u32, move || {
        link.send_message(Msg::DismissNotice);
    });
    model.notice = Some(notice);
    model.notice_timeout = Some(timeout);
}
