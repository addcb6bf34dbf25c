pub mod health;
pub mod notifications;
pub mod presence;
pub mod diagnostics;

pub use health::*;
pub use notifications::*;
pub use presence::*;
pub use diagnostics::*;
