pub mod shorten;

pub use shorten::{ShortenerApi, shortener_routes};
