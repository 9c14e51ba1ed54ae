//! Link rewriting: the resource map and the HTML, SVG and CSS rewriters that consult it.

pub mod css;
pub mod html;
pub mod link;
pub mod map;
