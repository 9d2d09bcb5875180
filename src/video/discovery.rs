//! Native resolution discovery for freshly bound media

use crate::engine::{EngineError, EngineMedia, EnginePlayer};

use super::types::Resolution;

/// Work out the native resolution of `media` bound to `player`.
///
/// Forces a parse if needed, prefers the player's negotiated output size and
/// falls back to the first video track that declares a size. Returns
/// [`Resolution::ZERO`] when neither source knows it.
pub fn discover_resolution<M, P>(media: &mut M, player: &P) -> Result<Resolution, EngineError>
where
    M: EngineMedia,
    P: EnginePlayer<Media = M>,
{
    if !media.is_parsed() {
        media.parse()?;
    }

    if let Some(res) = player.output_size(0).map(Resolution::from) {
        if res.is_known() {
            tracing::debug!("Resolution {} from negotiated output", res);
            return Ok(res);
        }
    }

    match media.tracks().iter().find_map(|track| track.video_dimensions()) {
        Some(res) => {
            tracing::debug!("Resolution {} from track metadata", res);
            Ok(res)
        }
        None => Ok(Resolution::ZERO),
    }
}
