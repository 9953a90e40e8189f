pub mod turn;

pub use turn::{emit_message, process_turn, send_error};
