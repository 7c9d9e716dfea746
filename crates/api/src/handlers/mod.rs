pub mod alerts;
pub mod devices;
pub mod history;
pub mod ws;
