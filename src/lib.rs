pub mod api;
pub mod audio;
pub mod backend;
pub mod conversation;
pub mod draw;
pub mod gui;
pub mod logging;
pub mod markup;
pub mod orchestrator;
pub mod settings;
pub mod speech;
