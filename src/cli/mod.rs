pub mod setup;
pub mod show;
pub mod sync;
pub mod ui;
