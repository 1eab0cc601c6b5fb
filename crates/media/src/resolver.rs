//! Mapping assets to decodable sources.

use lumacut_common::error::{LumacutError, LumacutResult};
use lumacut_project_model::{Asset, AssetKind};

use crate::source::{FfmpegVideoSource, MediaSource, StillImageSource};

/// Opens a playable source for an asset.
pub trait SourceResolver: Send + Sync {
    fn open(&self, asset: &Asset) -> LumacutResult<Box<dyn MediaSource>>;
}

/// Default resolver: stills through `image`, videos through `ffmpeg`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSourceResolver;

impl SourceResolver for FileSourceResolver {
    fn open(&self, asset: &Asset) -> LumacutResult<Box<dyn MediaSource>> {
        match asset.kind {
            AssetKind::Image if asset.is_data_url() => {
                Ok(Box::new(StillImageSource::from_data_url(&asset.source)?))
            }
            AssetKind::Image => {
                let path = asset
                    .local_path()
                    .ok_or_else(|| LumacutError::media("Image asset has no local path"))?;
                Ok(Box::new(StillImageSource::open(path)?))
            }
            AssetKind::Video if asset.is_data_url() => Err(LumacutError::unsupported(
                "Inline data URLs are only supported for images",
            )),
            AssetKind::Video => {
                let path = asset
                    .local_path()
                    .ok_or_else(|| LumacutError::media("Video asset has no local path"))?;
                Ok(Box::new(FfmpegVideoSource::open(path)?))
            }
        }
    }
}
