//! Built-in importers.

pub mod live2d;
pub mod test;

pub use live2d::{Live2dAssetClass, Live2dImporter, LIVE2D_ASSET_TYPE, LIVE2D_EXTNAME};
pub use test::TestImporter;
