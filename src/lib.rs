pub mod adapters;
pub mod config;
pub mod error;
pub mod events;
pub mod grid;
pub mod library;
pub mod mode;
pub mod slideshow;
pub mod processing {
    pub mod layout;
}
pub mod platform {
    pub mod power;
    pub mod screen_wake;
}
pub mod tasks {
    pub mod loader;
    pub mod power;
    pub mod viewer;
}
