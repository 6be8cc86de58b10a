pub mod auth;
pub mod background;
pub mod dao;

pub use auth::AuthService;
pub use background::InvitationSweeper;
pub use dao::*;
