pub mod api;
pub mod regions;
