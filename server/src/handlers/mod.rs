//! HTTP handlers for the TradeFair API

pub mod auth;
pub mod dashboard;
pub mod follow;
pub mod health;
pub mod payment;
pub mod preorder;
pub mod product;
pub mod shed;
