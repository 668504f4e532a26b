pub mod auth;
pub mod bills;
pub mod dashboard;
pub mod expenses;
pub mod incomes;
pub mod members;
pub mod middleware;
pub mod notifications;
pub mod rest;
pub mod state;

// Re-export the auth middleware to make it easily accessible to the
// binary that will build the web server router.
pub use middleware::require_auth;
