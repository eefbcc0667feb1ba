pub mod permission_steps;
pub mod store_steps;
pub mod visibility_steps;
