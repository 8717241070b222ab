pub mod bounding_box;
pub mod face_encoding;
pub mod frame;

pub use bounding_box::BoundingBox;
pub use face_encoding::{FaceEncoding, EMBEDDING_DIMENSION};
pub use frame::{Frame, PixelFormat};
