pub mod site;

pub use site::{ALLOWED_FREQUENCIES, Site, SiteStatus};
