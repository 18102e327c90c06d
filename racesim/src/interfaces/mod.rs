pub mod input_interface;
pub mod render_interface;
