pub mod diagnostics;
pub mod error;
pub mod health;
pub mod messages;
pub mod object;
pub mod responses;
pub mod session;

pub use diagnostics::*;
pub use error::*;
pub use health::*;
pub use messages::*;
pub use object::*;
pub use responses::*;
pub use session::*;
