//! Eager resolution of the transitive sublayer tree.
//!
//! The walk is a level-by-level worklist rather than async recursion: every
//! pending sublayer carries its own depth, each level is fetched and loaded
//! concurrently, and the next level is built from the layers just loaded.
//! Stack usage stays flat no matter how deep or wide the graph is.

use std::collections::HashSet;

use futures::future::join_all;

use super::error::{CompositionError, CompositionResult};
use super::state::{BoundExceeded, CompositionState};
use crate::asset::{normalize_asset_path, AssetMap, AssetResolver, ResolvedAsset};
use crate::layer::{CompositionKind, Layer, LayerEngine};

/// A sublayer waiting to be fetched.
#[derive(Clone, Debug)]
struct PendingSublayer {
    asset_path: String,
    depth: usize,
}

/// Fetch and record every sublayer reachable from `root`.
///
/// `root_asset_path` is the token the root was loaded from, if known. The
/// root counts as visited, so a sublayer cycle leading back to it stops
/// there instead of loading the root a second time.
///
/// Each level is joined with all-or-nothing semantics: every branch runs to
/// completion, then the first failure (in declaration order) aborts the
/// walk. Sublayers deeper than `max_depth` are not fetched; each one is
/// recorded as a [`BoundExceeded::SublayerDepth`] in `state`.
///
/// Returns the number of distinct sublayers fetched.
pub(crate) async fn resolve_sublayer_tree<R, E>(
    resolver: &R,
    engine: &E,
    max_depth: usize,
    root: &E::Layer,
    root_asset_path: Option<&str>,
    assets: &mut AssetMap,
    state: &mut CompositionState,
) -> CompositionResult<usize>
where
    R: AssetResolver + ?Sized,
    E: LayerEngine + ?Sized,
{
    let mut visited: HashSet<String> = HashSet::new();
    if let Some(asset_path) = root_asset_path {
        visited.insert(normalize_asset_path(asset_path));
    }
    let mut frontier = declared_sublayers(root, 1);
    let mut visited_count = 0;

    while !frontier.is_empty() {
        // Each asset path is fetched once per run, which also breaks cycles
        let level: Vec<PendingSublayer> = frontier
            .into_iter()
            .filter(|item| visited.insert(normalize_asset_path(&item.asset_path)))
            .collect();

        let Some(depth) = level.first().map(|item| item.depth) else {
            break;
        };
        state.depth = depth;

        if depth > max_depth {
            for item in level {
                log::warn!(
                    "Sublayer '{}' is at depth {} (limit {}); not resolving it",
                    item.asset_path,
                    item.depth,
                    max_depth
                );
                state.bounds_exceeded.push(BoundExceeded::SublayerDepth {
                    max_depth,
                    asset_path: item.asset_path,
                });
            }
            break;
        }

        log::debug!("Resolving {} sublayer(s) at depth {}", level.len(), depth);

        let results = join_all(
            level
                .iter()
                .map(|item| fetch_and_load(resolver, engine, item)),
        )
        .await;

        let mut next = Vec::new();
        let mut first_error = None;
        for (item, result) in level.iter().zip(results) {
            match result {
                Ok((asset, layer)) => {
                    assets.record(&item.asset_path, &asset)?;
                    next.extend(declared_sublayers(&layer, depth + 1));
                    visited_count += 1;
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        frontier = next;
    }

    Ok(visited_count)
}

fn declared_sublayers<L: Layer + ?Sized>(layer: &L, depth: usize) -> Vec<PendingSublayer> {
    if !layer.has_sublayers() {
        return Vec::new();
    }
    layer
        .sublayer_asset_paths()
        .into_iter()
        .map(|asset_path| PendingSublayer { asset_path, depth })
        .collect()
}

async fn fetch_and_load<R, E>(
    resolver: &R,
    engine: &E,
    item: &PendingSublayer,
) -> CompositionResult<(ResolvedAsset, E::Layer)>
where
    R: AssetResolver + ?Sized,
    E: LayerEngine + ?Sized,
{
    let asset = resolver
        .resolve(&item.asset_path)
        .await
        .map_err(|source| CompositionError::Fetch {
            kind: CompositionKind::Sublayers,
            source,
        })?;

    log::debug!(
        "Fetched sublayer '{}' -> '{}' ({} bytes, depth {})",
        item.asset_path,
        asset.uri,
        asset.len(),
        item.depth
    );

    let layer = engine
        .load(&asset.uri, asset.bytes.clone())
        .await
        .map_err(|source| CompositionError::Load {
            kind: CompositionKind::Sublayers,
            asset_path: item.asset_path.clone(),
            source,
        })?;

    Ok((asset, layer))
}
