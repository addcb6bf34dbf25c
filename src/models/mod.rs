pub mod events;
pub mod notification;
pub mod presence;
pub mod health;
pub mod ready;
pub mod diagnostics;
pub mod error;

pub use events::*;
pub use notification::*;
pub use presence::*;
pub use health::*;
pub use ready::*;
pub use diagnostics::*;
pub use error::*;
