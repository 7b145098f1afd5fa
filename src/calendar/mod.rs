pub mod entities;
pub mod grid;
pub mod progress;
pub mod trend;
pub mod week_store;
