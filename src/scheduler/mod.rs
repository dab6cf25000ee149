pub mod rate_limiter;
pub use rate_limiter::*;
pub mod scheduler;
pub use scheduler::*;
