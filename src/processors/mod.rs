// pixbatch/src/processors/mod.rs
mod batch;
mod compressor;
mod loader;
mod preview;
mod resizer;

pub use batch::{BatchProcessor, CancellationToken, ProgressSink};
pub use compressor::{composite_onto, Compressor};
pub use loader::{ImageDocument, Loader};
pub use preview::{Previewer, PREVIEW_MAX_SIDE};
pub use resizer::{resolve, ResizeTarget, Resizer, MAX_DIMENSION, MAX_PIXELS};
