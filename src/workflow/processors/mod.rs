pub mod convert;
pub mod extract;
pub mod notify;
pub mod setup;
