pub use apod::*;
pub use epic::*;
pub use providers::*;
pub use spacex::*;

pub mod apod;
pub mod epic;
mod providers;
pub mod spacex;
