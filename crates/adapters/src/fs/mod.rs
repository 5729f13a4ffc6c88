mod clock;
mod encoder;
mod scanner;

pub use clock::SystemClock;
pub use encoder::{EncodeMode, ImageCrateEncoder};
pub use scanner::WalkdirMediaScanner;
