pub mod handler;
pub mod msg_item_handler;
pub mod msg_selection_handler;
pub mod msg_session_handler;

pub use handler::{handle_text, process_message, teardown, websocket_handler};
