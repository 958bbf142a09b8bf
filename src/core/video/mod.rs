pub mod frame;

pub use frame::{to_grayscale, to_grayscale_into, Frame, GrayPlane, PixelFormat};
