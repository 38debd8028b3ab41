pub mod environment_selector;
pub mod handlers;
pub mod header;
pub mod results;
pub mod upload_section;
pub mod utils;
