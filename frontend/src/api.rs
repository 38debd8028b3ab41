use crate::{Model, Msg};
use gloo_file::{Blob, File as GlooFile, ObjectUrl};
use gloo_net::http::Request;
use shared::{AnalysisRequest, ArtifactKind};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{FormData, HtmlAnchorElement, ProgressEvent, XmlHttpRequest};
use yew::html::Scope;

/// Base URL of the analysis service, `/api` (the gateway) unless overridden at build time.
pub fn api_base() -> &'static str {
    option_env!("DETECTREE_API_URL")
        .unwrap_or("/api")
        .trim_end_matches('/')
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] gloo_net::Error),
    #[error("Failed to download {kind} file ({status})")]
    Status { kind: ArtifactKind, status: u16 },
    #[error("Browser error: {0}")]
    Browser(String),
}

impl From<JsValue> for ApiError {
    fn from(value: JsValue) -> Self {
        ApiError::Browser(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}

type ProgressCallback = Closure<dyn FnMut(ProgressEvent)>;

/// A running analysis request. The XHR callbacks live as long as this handle;
/// dropping it detaches them and aborts an unfinished transfer.
pub struct UploadHandle {
    xhr: XmlHttpRequest,
    _on_progress: ProgressCallback,
    _on_sent: ProgressCallback,
    _on_load: ProgressCallback,
    _on_error: ProgressCallback,
}

impl Drop for UploadHandle {
    fn drop(&mut self) {
        if let Ok(upload) = self.xhr.upload() {
            upload.set_onprogress(None);
            upload.set_onload(None);
        }
        self.xhr.set_onload(None);
        self.xhr.set_onerror(None);
        self.xhr.set_ontimeout(None);
        self.xhr.set_onabort(None);
        if self.xhr.ready_state() != XmlHttpRequest::DONE {
            let _ = self.xhr.abort();
        }
    }
}

/// User-facing reason for an XHR `error`, `timeout` or `abort` event.
fn failure_reason(event_type: &str) -> &'static str {
    match event_type {
        "timeout" => "request timed out",
        "abort" => "request was aborted",
        _ => "request could not be completed",
    }
}

/// Posts the file with its analysis parameters as multipart form data.
///
/// Uses XMLHttpRequest rather than fetch because only XHR reports upload progress.
pub fn send_analysis(
    request: &AnalysisRequest,
    file: &GlooFile,
    link: &Scope<Model>,
) -> Result<UploadHandle, ApiError> {
    let form_data = FormData::new()?;
    form_data.append_with_blob_and_filename("file", file.as_ref(), &file.name())?;
    for (name, value) in request.form_fields() {
        form_data.append_with_str(name, &value)?;
    }

    let xhr = XmlHttpRequest::new()?;
    xhr.open_with_async("POST", &format!("{}/", api_base()), true)?;
    let upload = xhr.upload()?;
    let id = request.id;

    let on_progress = {
        let link = link.clone();
        Closure::<dyn FnMut(ProgressEvent)>::new(move |event: ProgressEvent| {
            let total = event
                .length_computable()
                .then(|| event.total() as u64);
            link.send_message(Msg::UploadProgress(id, event.loaded() as u64, total));
        })
    };
    let on_sent = {
        let link = link.clone();
        Closure::<dyn FnMut(ProgressEvent)>::new(move |_event: ProgressEvent| {
            link.send_message(Msg::UploadSent(id));
        })
    };
    let on_load = {
        let link = link.clone();
        let xhr = xhr.clone();
        Closure::<dyn FnMut(ProgressEvent)>::new(move |_event: ProgressEvent| {
            let status = xhr.status().unwrap_or(0);
            let body = xhr.response_text().ok().flatten().unwrap_or_default();
            link.send_message(Msg::UploadResponse(id, status, body));
        })
    };
    let on_error = {
        let link = link.clone();
        Closure::<dyn FnMut(ProgressEvent)>::new(move |event: ProgressEvent| {
            let reason = failure_reason(&event.type_());
            link.send_message(Msg::UploadFailed(id, reason.to_string()));
        })
    };

    upload.set_onprogress(Some(on_progress.as_ref().unchecked_ref()));
    upload.set_onload(Some(on_sent.as_ref().unchecked_ref()));
    xhr.set_onload(Some(on_load.as_ref().unchecked_ref()));
    xhr.set_onerror(Some(on_error.as_ref().unchecked_ref()));
    xhr.set_ontimeout(Some(on_error.as_ref().unchecked_ref()));
    xhr.set_onabort(Some(on_error.as_ref().unchecked_ref()));

    xhr.send_with_opt_form_data(Some(&form_data))?;
    log::info!("POST {}/ for {} ({})", api_base(), request.file_name, id);

    Ok(UploadHandle {
        xhr,
        _on_progress: on_progress,
        _on_sent: on_sent,
        _on_load: on_load,
        _on_error: on_error,
    })
}

/// Fetches a derived artifact and saves it under its default file name.
pub async fn download_artifact(kind: ArtifactKind) -> Result<(), ApiError> {
    let url = format!("{}/{}", api_base(), kind.download_path());
    let response = Request::get(&url).send().await?;
    if !response.ok() {
        return Err(ApiError::Status {
            kind,
            status: response.status(),
        });
    }

    let bytes = response.binary().await?;
    let blob = Blob::new(bytes.as_slice());
    let object_url = ObjectUrl::from(blob);

    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| ApiError::Browser("no document".into()))?;
    let body = document
        .body()
        .ok_or_else(|| ApiError::Browser("no body".into()))?;
    let link: HtmlAnchorElement = document.create_element("a")?.dyn_into().map_err(|_| {
        ApiError::Browser("created element is not an anchor".into())
    })?;

    link.set_href(&object_url);
    link.set_download(kind.file_name());
    body.append_child(&link)?;
    link.click();
    body.remove_child(&link)?;
    log::info!("Saved {} as {}", kind, kind.file_name());
    // `object_url` is revoked when it drops here.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_terminal_xhr_event_has_a_reason() {
        assert_eq!(failure_reason("timeout"), "request timed out");
        assert_eq!(failure_reason("abort"), "request was aborted");
        assert_eq!(failure_reason("error"), "request could not be completed");
    }
}
