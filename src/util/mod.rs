//! Text measurement and URL checks shared by the sidebar and icon loader.

mod text;
mod url_check;

pub use text::{display_width, sanitize_label, truncate_to_width};
pub use url_check::{check_fetch_url, UrlCheckError};
