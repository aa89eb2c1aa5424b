pub mod entities;
pub mod enums;
pub mod params;

pub use entities::*;
pub use enums::*;
pub use params::*;
