pub mod activity_service;
pub mod auth_service;
pub mod dashboard_service;
pub mod group_service;
pub mod suggestion_service;
pub mod text_generation;
