use super::super::{Model, Msg};
use gloo_file::File as GlooFile;
use shared::ProgressState;
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, HtmlInputElement};
use yew::prelude::*;

pub fn render_upload_section(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let busy = model.orchestrator.is_busy();

    let handle_change = link.batch_callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        let file = input
            .files()
            .and_then(|files| files.item(0))
            .map(GlooFile::from);

        input.set_value("");
        file.map(Msg::FileChosen)
    });

    let handle_drag_over = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(true)
    });

    let handle_drag_leave = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(false)
    });

    let handle_drop = link.callback(Msg::HandleDrop);
    let trigger_file_input = Callback::from(|_: MouseEvent| {
        let input = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id("file-input"))
            .and_then(|element| element.dyn_into::<web_sys::HtmlElement>().ok());
        if let Some(html_input) = input {
            html_input.click();
        }
    });

    let on_zone_click = if busy {
        Callback::noop()
    } else {
        trigger_file_input
    };

    html! {
        <>
            <input
                type="file"
                id="file-input"
                accept={if model.intake.policy().images_only { "image/*" } else { "image/*,.tif,.tiff" }}
                style="display: none;"
                onchange={handle_change}
            />

            <div
                id="drop-zone"
                class={classes!("upload-area", model.is_dragging.then_some("drag-over"))}
                ondragover={handle_drag_over}
                ondragleave={handle_drag_leave}
                ondrop={handle_drop}
                onclick={on_zone_click}
            >
                {
                    if model.progress.is_active() {
                        render_loading_state(&model.progress)
                    } else if let Some(url) = model.intake.preview() {
                        render_selected_preview(ctx, url)
                    } else if let Some(file) = model.intake.selected() {
                        html! {
                            <div class="unavailable-preview">
                                <p>{ format!("{} (preview unavailable)", file.name) }</p>
                                { render_remove_button(ctx) }
                            </div>
                        }
                    } else {
                        html! {
                            <div class="upload-placeholder">
                                <i class="fa-solid fa-cloud-arrow-up"></i>
                                <h3>{"Select an image to analyze"}</h3>
                                <p class="file-types">{ model.intake.policy().describe() }</p>
                            </div>
                        }
                    }
                }
            </div>
        </>
    }
}

fn render_selected_preview(ctx: &Context<Model>, url: &str) -> Html {
    html! {
        <div class="selected-preview">
            <img id="actual-image-preview" src={url.to_string()} alt="Selected preview" />
            { render_remove_button(ctx) }
        </div>
    }
}

fn render_remove_button(ctx: &Context<Model>) -> Html {
    html! {
        <button
            class="remove-btn"
            title="Remove this image"
            onclick={ctx.link().callback(|e: MouseEvent| {
                // Keep the click from reopening the file picker.
                e.stop_propagation();
                Msg::Discard
            })}
        >
            <i class="fa-solid fa-times"></i>
        </button>
    }
}

pub fn render_loading_state(progress: &ProgressState) -> Html {
    let percent = progress.progress().clamp(0.0, 100.0);
    html! {
        <div class="loading-state">
            <p class="loading-file">{ progress.file_name().unwrap_or_default() }</p>
            <div class="meter">
                <div class="meter-fill" style={format!("width: {:.1}%", percent)}></div>
            </div>
            <p class="loading-message">{ progress.status_message() }</p>
        </div>
    }
}
