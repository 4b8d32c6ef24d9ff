pub mod diagnostics;
pub mod form;
pub mod health;
pub mod item;
pub mod item_add;
pub mod session;

pub use diagnostics::*;
pub use health::*;
pub use item::*;
pub use item_add::*;
pub use session::*;
