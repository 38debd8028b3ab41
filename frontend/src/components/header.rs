use yew::prelude::*;

/// Renders the application header
pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-tree"></i> {" detectree2"}</h1>
            <p class="subtitle">{"Drop an aerial image or raster to count tree crowns"}</p>
        </header>
    }
}
