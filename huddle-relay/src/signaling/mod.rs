pub mod relay_service;
mod relay_state;
pub mod ws_handler;
