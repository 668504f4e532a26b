//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use family_finance_core::ports::{Clock, RecordStore};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
}
