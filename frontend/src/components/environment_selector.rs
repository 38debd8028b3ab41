use super::super::{Model, Msg};
use shared::Environment;
use strum::IntoEnumIterator;
use web_sys::HtmlInputElement;
use yew::prelude::*;

/// Environment radios, confidence slider and the analyze button.
pub fn render_controls(model: &Model, ctx: &Context<Model>) -> Html {
    let can_begin = model.orchestrator.can_begin(model.intake.selected());
    let confidence = model.params.confidence;

    let handle_confidence = ctx.link().batch_callback(|e: InputEvent| {
        let input: HtmlInputElement = e.target_unchecked_into();
        input.value().parse::<f64>().ok().map(Msg::SetConfidence)
    });

    html! {
        <div class="controls">
            <div class="environment-selector">
                { for Environment::iter().map(|environment| {
                    html! {
                        <label>
                            <input type="radio" name="environment"
                                value={environment.to_string()}
                                checked={model.params.environment == environment}
                                onchange={ctx.link().callback(move |_| Msg::SetEnvironment(environment))} />
                            <span class="radio-label-text">{ environment.to_string() }</span>
                        </label>
                    }
                })}
            </div>
            <label class="confidence-slider">
                <span>{ format!("Confidence: {:.2}", confidence) }</span>
                <input type="range" min="0" max="1" step="0.05"
                    value={confidence.to_string()}
                    oninput={handle_confidence} />
            </label>
            <button
                class="analyze-btn"
                disabled={!can_begin || model.file.is_none()}
                onclick={ctx.link().callback(|_| Msg::Analyze)}
            >
                { render_analyze_button_content(model) }
            </button>
        </div>
    }
}

fn render_analyze_button_content(model: &Model) -> Html {
    if model.orchestrator.is_busy() {
        html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Analyzing..."}</> }
    } else {
        html! { <><i class="fa-solid fa-magnifying-glass"></i>{" Analyze Image"}</> }
    }
}
