pub mod serve;
pub mod status;
pub mod sync;
pub mod tags;
