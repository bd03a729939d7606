//! Data models

pub mod organization;
pub mod user;
pub mod property;
pub mod tenant;
pub mod contract;
pub mod payment;
pub mod notification;
pub mod subscription;
pub mod maintenance;
pub mod document;
pub mod audit;

pub use organization::*;
pub use user::*;
pub use property::*;
pub use tenant::*;
pub use contract::*;
pub use payment::*;
pub use notification::*;
pub use subscription::*;
pub use maintenance::*;
pub use document::*;
pub use audit::*;
