pub mod analytics;
pub mod application;
pub mod base;
pub mod contract;
pub mod invitation;
pub mod listing;
pub mod order;
pub mod schedule;
pub mod user;

pub use base::BaseDao;
