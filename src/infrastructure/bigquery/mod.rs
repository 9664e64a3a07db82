pub mod warehouse;
pub mod wire;
