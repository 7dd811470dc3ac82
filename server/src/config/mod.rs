//! Configuration modules for the TradeFair server

pub mod fee;
pub mod site;

pub use fee::{get_shed_fee_kobo, DEFAULT_SHED_FEE_KOBO};
pub use site::SiteConfig;
