pub mod background_workers;
pub mod catalog;
pub mod config;
pub mod handler_utils;
pub mod image_handlers;
pub mod sequencer;
pub mod token;
