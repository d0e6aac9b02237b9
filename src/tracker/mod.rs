pub mod events;
pub mod reduce;
