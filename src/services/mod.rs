pub mod shortener;

pub use shortener::{Resolution, ShortenerService};
