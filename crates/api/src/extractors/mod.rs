pub mod auth;
pub mod role;

pub use auth::AuthUser;
pub use role::{FactoryUser, FarmerUser, HhmUser, LabourUser};
