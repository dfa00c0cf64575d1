//! Operator web surface
//!
//! Login flow, operator identity and the protected front-end. Everything here
//! sits around the relay; none of it touches message routing.

mod assets;
mod extractors;
mod oauth;
mod pages;
mod response;

pub use assets::{asset_router, require_operator};
pub use extractors::Operator;
pub use oauth::{discord_callback, discord_login, CallbackParams};
pub use pages::{health_check, login_page, logout, me, MeResponse};
pub use response::ApiError;
