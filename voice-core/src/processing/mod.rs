pub mod level;
pub mod ring_buffer;
