use anyhow::{Context, Result};
use img_hash::{HashAlg, HasherConfig};
use std::collections::HashSet;

use super::host::CanvasHost;
use crate::kernel::staging::ArtifactId;

/// A rasterized board plus its perceptual fingerprint.
pub struct Snapshot {
    pub png: Vec<u8>,
    pub fingerprint: u64,
}

/// Captures the visible board and fingerprints it with a gradient
/// hash, so cosmetically identical states compare equal even when the
/// raw pixels differ slightly.
pub struct CanvasSnapshotter;

impl CanvasSnapshotter {
    pub fn new() -> Self {
        Self
    }

    /// Capture the board with pending artifacts excluded. Returns
    /// `Ok(None)` for an empty board.
    pub fn capture(
        &self,
        canvas: &dyn CanvasHost,
        exclude: &HashSet<ArtifactId>,
    ) -> Result<Option<Snapshot>> {
        let Some(image) = canvas.render_viewport(exclude) else {
            return Ok(None);
        };

        let fingerprint = fingerprint_image(&image);

        let mut png = Vec::new();
        image
            .write_to(&mut png, image::ImageOutputFormat::Png)
            .context("failed to encode canvas snapshot as PNG")?;

        Ok(Some(Snapshot { png, fingerprint }))
    }
}

impl Default for CanvasSnapshotter {
    fn default() -> Self {
        Self::new()
    }
}

/// 8x8 gradient hash packed into a u64. The hasher is rebuilt per call
/// because it is not `Send`.
pub fn fingerprint_image(image: &image::DynamicImage) -> u64 {
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::Gradient)
        .hash_size(8, 8)
        .to_hasher();
    let hash = hasher.hash_image(image);
    hash.as_bytes()
        .iter()
        .take(8)
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte))
}
