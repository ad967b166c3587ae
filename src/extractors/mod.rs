mod role;
pub use role::CallerRole;
