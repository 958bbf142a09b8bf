pub mod motion;
pub mod video;
