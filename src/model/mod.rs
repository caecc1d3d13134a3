pub mod event;
pub mod line_index;
pub mod marker;
pub mod piece_table;
