pub mod host;
pub mod packet;
pub mod process;
