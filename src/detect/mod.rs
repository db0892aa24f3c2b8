mod backend;
mod backends;
mod filter;
mod result;

pub use backend::Detector;
pub use backends::StubDetector;
pub use filter::filter_detections;
pub use result::Detection;
