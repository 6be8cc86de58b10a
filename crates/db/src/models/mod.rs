pub mod application;
pub mod contract;
pub mod invitation;
pub mod listing;
pub mod order;
pub mod schedule;
pub mod user;

pub use application::*;
pub use contract::*;
pub use invitation::*;
pub use listing::*;
pub use order::*;
pub use schedule::*;
pub use user::*;
