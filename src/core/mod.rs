pub mod collection;
pub mod dictionary;
pub mod stroke;
pub mod system;
pub mod types;
