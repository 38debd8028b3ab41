use super::super::{Model, Msg};
use shared::ArtifactKind;
use strum::IntoEnumIterator;
use yew::prelude::*;

pub fn render_results(model: &Model, ctx: &Context<Model>) -> Html {
    let Some(result) = &model.result else {
        return html! {};
    };
    let link = ctx.link();
    let analyzed_filename = model
        .intake
        .selected()
        .map_or_else(|| "Analyzed Image".to_string(), |file| file.name.clone());

    html! {
        <div class="results-container">
            <div class="result-image">
                <img src={result.image.clone()} alt="Analysis Result" />
                <button
                    class="remove-btn"
                    aria-label="Reset image"
                    onclick={link.callback(|_| Msg::Discard)}
                >
                    {"×"}
                </button>
            </div>
            <div class="detailed-results">
                <h2 title={format!("Analysis results for: {}", analyzed_filename)}>{"Analysis Results"}</h2>
                <table>
                    <tbody>
                        <tr>
                            <td class="result-label">{"Total Trees Detected"}</td>
                            <td class="result-value">{ result.statistics.total_trees.to_string() }</td>
                        </tr>
                    </tbody>
                </table>
            </div>
            <div class="button-container">
                { for ArtifactKind::iter().map(|kind| html! {
                    <button
                        class={classes!("analyze-btn", format!("download-{}", kind))}
                        onclick={link.callback(move |_| Msg::Download(kind))}
                    >
                        <i class="fa-solid fa-download"></i>
                        { format!(" Download {}", kind.as_ref().to_uppercase()) }
                    </button>
                })}
            </div>
        </div>
    }
}
