pub mod auth;
pub mod capability;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;
