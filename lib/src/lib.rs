mod accessor;
pub mod array;
mod downsample;
mod error;
mod reporters;
mod sample;
mod status;
mod viewer;

pub use accessor::*;
pub use downsample::*;
pub use error::*;
pub use reporters::*;
pub use sample::*;
pub use status::*;
pub use viewer::*;
