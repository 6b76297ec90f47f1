//! HTML templates for the web UI
//!
//! Templates live next to this module as stand-alone `.html` files so they can
//! be edited and diffed on their own, and are compiled in with `include_str!`.
//!
//! They are minijinja templates. The `.html` extension turns on HTML
//! auto-escaping, so user text is passed in as plain values and never
//! pre-escaped in Rust.
//!
//! ```text
//! layout.html   page frame, navigation and the overview sidebar
//! macros.html   `notice` and `book_card`, shared by every section
//! *.html        one template per section, each extending the layout
//! ```

pub const LAYOUT_TEMPLATE: &str = include_str!("templates/layout.html");
pub const MACROS_TEMPLATE: &str = include_str!("templates/macros.html");
pub const BROWSE_TEMPLATE: &str = include_str!("templates/browse.html");
pub const ADD_TEMPLATE: &str = include_str!("templates/add.html");
pub const SEARCH_TEMPLATE: &str = include_str!("templates/search.html");
pub const DELETE_TEMPLATE: &str = include_str!("templates/delete.html");
pub const ERROR_TEMPLATE: &str = include_str!("templates/error.html");

/// テンプレート名から本文を引く。minijinjaのloaderから呼ばれる。
pub fn source(name: &str) -> Option<&'static str> {
    let source = match name {
        "layout.html" => LAYOUT_TEMPLATE,
        "macros.html" => MACROS_TEMPLATE,
        "browse.html" => BROWSE_TEMPLATE,
        "add.html" => ADD_TEMPLATE,
        "search.html" => SEARCH_TEMPLATE,
        "delete.html" => DELETE_TEMPLATE,
        "error.html" => ERROR_TEMPLATE,
        _ => return None,
    };
    Some(source)
}
