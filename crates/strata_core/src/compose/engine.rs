//! The composition engine.
//!
//! `Composer` owns an asset resolver and a layer engine and drives a root
//! layer from "raw" to "fully composed".

use std::collections::HashSet;

use futures::future::join_all;

use super::config::{BoundPolicy, CompositionConfig};
use super::error::{CompositionError, CompositionResult};
use super::state::{BoundExceeded, CompositionReport, CompositionState};
use super::sublayers::resolve_sublayer_tree;
use crate::asset::{AssetMap, AssetResolver};
use crate::layer::{CompositionKind, Layer, LayerEngine};
use crate::scene::SceneProjector;

/// A fully composed layer, ready for scene projection.
#[derive(Debug)]
pub struct Composition<L> {
    /// The composed layer
    pub layer: L,

    /// Every asset fetched during the run
    pub assets: AssetMap,

    /// Counters and any bounds hit
    pub report: CompositionReport,
}

/// Drives progressive composition of a root layer.
///
/// # Example
///
/// ```ignore
/// use strata_core::asset::MemoryResolver;
/// use strata_core::compose::Composer;
/// use strata_core::json::JsonLayerEngine;
///
/// let resolver = MemoryResolver::new()
///     .with_document("shot.json", r#"{ "subLayers": ["set.json"] }"#)
///     .with_document("set.json", r#"{ "prims": { "/Set": {} } }"#);
///
/// let mut composer = Composer::new(resolver, JsonLayerEngine::new());
/// let composition = pollster::block_on(composer.compose("shot.json"))?;
/// assert!(composition.layer.prim("/Set").is_some());
/// ```
pub struct Composer<R, E: LayerEngine> {
    resolver: R,
    engine: E,
    config: CompositionConfig,
    root: Option<E::Layer>,
    root_asset_path: Option<String>,
}

impl<R, E> Composer<R, E>
where
    R: AssetResolver,
    E: LayerEngine,
{
    /// Create a composer with the default bounds.
    pub fn new(resolver: R, engine: E) -> Self {
        Self {
            resolver,
            engine,
            config: CompositionConfig::default(),
            root: None,
            root_asset_path: None,
        }
    }

    pub fn with_config(mut self, config: CompositionConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the bounds used by the next run.
    pub fn set_config(&mut self, config: CompositionConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &CompositionConfig {
        &self.config
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Use an already loaded layer as the root of the next run.
    pub fn set_root_layer(&mut self, layer: E::Layer) {
        self.root = Some(layer);
        self.root_asset_path = None;
    }

    pub fn has_root_layer(&self) -> bool {
        self.root.is_some()
    }

    /// Resolve and load the root layer of the next run.
    pub async fn load_root(&mut self, asset_path: &str) -> CompositionResult<()> {
        let asset = self
            .resolver
            .resolve(asset_path)
            .await
            .map_err(|source| CompositionError::RootFetch { source })?;

        let layer = self
            .engine
            .load(&asset.uri, asset.bytes.clone())
            .await
            .map_err(|source| CompositionError::RootLoad {
                asset_path: asset_path.to_string(),
                source,
            })?;

        log::info!("Loaded root layer '{}' ({} bytes)", asset.uri, asset.len());
        self.root = Some(layer);
        self.root_asset_path = Some(asset_path.to_string());
        Ok(())
    }

    /// Load `asset_path` as the root layer and compose it.
    pub async fn compose(&mut self, asset_path: &str) -> CompositionResult<Composition<E::Layer>> {
        self.load_root(asset_path).await?;
        self.progressive_composition().await
    }

    /// Compose `asset_path`, then hand the composed layer to `projector`.
    pub async fn compose_and_project<P>(
        &mut self,
        asset_path: &str,
        projector: &P,
    ) -> CompositionResult<(P::Output, CompositionReport)>
    where
        P: SceneProjector<E::Layer>,
    {
        let composition = self.compose(asset_path).await?;
        let output = projector.project(&composition.layer)?;
        Ok((output, composition.report))
    }

    /// Compose the root layer set by [`Composer::load_root`] or
    /// [`Composer::set_root_layer`].
    ///
    /// Phase A resolves the whole sublayer tree, stages it and runs
    /// `compose_sublayers` once. Phase B loops over inherits, variants,
    /// references and payloads until nothing is pending or the iteration
    /// bound is reached. Any fetch or operator failure aborts the run; the
    /// root layer is consumed once the run starts. A `NotReady` error leaves
    /// it in place.
    pub async fn progressive_composition(&mut self) -> CompositionResult<Composition<E::Layer>> {
        self.config
            .validate()
            .map_err(|_| CompositionError::NotReady("composition bounds must be at least 1"))?;

        let mut layer = self
            .root
            .take()
            .ok_or(CompositionError::NotReady("no root layer has been set"))?;
        let root_asset_path = self.root_asset_path.take();

        let mut assets = AssetMap::new();
        let mut state = CompositionState::new();
        let mut report = CompositionReport::default();

        self.compose_local(
            &mut layer,
            root_asset_path.as_deref(),
            &mut assets,
            &mut state,
            &mut report,
        )
        .await?;
        self.compose_arcs(&mut layer, &mut assets, &mut state, &mut report)
            .await?;

        report.bounds_exceeded = state.bounds_exceeded;

        log::info!(
            "Composition finished: {} sublayer(s), {} asset(s), {} iteration(s)",
            report.sublayers_visited,
            assets.len(),
            report.iterations
        );

        Ok(Composition {
            layer,
            assets,
            report,
        })
    }

    /// Fetch and record every sublayer transitively reachable from `layer`.
    ///
    /// Returns the number of distinct sublayers visited. Sublayers beyond
    /// the configured depth are skipped and recorded in `state`. Passing the
    /// token `layer` was loaded from keeps a cycle back to it from loading
    /// it again.
    pub async fn resolve_sublayers(
        &self,
        layer: &E::Layer,
        root_asset_path: Option<&str>,
        assets: &mut AssetMap,
        state: &mut CompositionState,
    ) -> CompositionResult<usize> {
        resolve_sublayer_tree(
            &self.resolver,
            &self.engine,
            self.config.max_sublayer_depth,
            layer,
            root_asset_path,
            assets,
            state,
        )
        .await
    }

    /// Phase A: sublayers, once.
    async fn compose_local(
        &self,
        layer: &mut E::Layer,
        root_asset_path: Option<&str>,
        assets: &mut AssetMap,
        state: &mut CompositionState,
        report: &mut CompositionReport,
    ) -> CompositionResult<()> {
        report.sublayers_visited = self
            .resolve_sublayers(layer, root_asset_path, assets, state)
            .await?;

        if let Some((max_depth, asset_path)) = state.depth_exceeded() {
            match self.config.bound_policy {
                BoundPolicy::Strict => {
                    return Err(CompositionError::RecursionDepthExceeded {
                        max_depth,
                        asset_path: asset_path.to_string(),
                    });
                }
                BoundPolicy::Lenient => {
                    log::warn!(
                        "Composing without sublayers nested deeper than {}",
                        max_depth
                    );
                }
            }
        }

        if !layer.has_sublayers() {
            return Ok(());
        }

        assets.stage_into(layer);
        run_operator(layer, CompositionKind::Sublayers, report)
    }

    /// Phase B: the bounded inherits/variants/references/payloads loop.
    async fn compose_arcs(
        &self,
        layer: &mut E::Layer,
        assets: &mut AssetMap,
        state: &mut CompositionState,
        report: &mut CompositionReport,
    ) -> CompositionResult<()> {
        let max_iterations = self.config.max_iterations;

        for iteration in 1..=max_iterations {
            state.iteration = iteration;
            report.iterations = iteration;

            if !layer.has_pending_arcs() {
                log::debug!("Converged at iteration {}", iteration);
                return Ok(());
            }
            report.composing_iterations += 1;

            // Each predicate is re-checked here; an earlier step in this
            // iteration may have added or resolved arcs of a later kind.
            if layer.has_inherits() {
                run_operator(layer, CompositionKind::Inherits, report)?;
            }
            if layer.has_variants() {
                run_operator(layer, CompositionKind::Variants, report)?;
            }
            if layer.has_references() {
                self.compose_with_assets(layer, CompositionKind::References, assets, report)
                    .await?;
            }
            if layer.has_payloads() {
                self.compose_with_assets(layer, CompositionKind::Payloads, assets, report)
                    .await?;
            }
        }

        let pending = layer.pending_kinds();
        if pending.is_empty() {
            return Ok(());
        }

        match self.config.bound_policy {
            BoundPolicy::Strict => Err(CompositionError::DidNotConverge {
                iterations: max_iterations,
                pending,
            }),
            BoundPolicy::Lenient => {
                let bound = BoundExceeded::Iterations {
                    max_iterations,
                    pending,
                };
                log::warn!("Composition did not converge: {}", bound);
                state.bounds_exceeded.push(bound);
                Ok(())
            }
        }
    }

    /// Fetch every asset `kind` needs, stage it, then run the operator.
    async fn compose_with_assets(
        &self,
        layer: &mut E::Layer,
        kind: CompositionKind,
        assets: &mut AssetMap,
        report: &mut CompositionReport,
    ) -> CompositionResult<()> {
        let mut seen = HashSet::new();
        let asset_paths: Vec<String> = layer
            .asset_paths(kind)
            .into_iter()
            .filter(|path| seen.insert(path.clone()))
            .collect();

        log::debug!("Resolving {} {} asset(s)", asset_paths.len(), kind);

        let results = join_all(
            asset_paths
                .iter()
                .map(|asset_path| self.resolver.resolve(asset_path)),
        )
        .await;

        // Successful fetches stay recorded even when a sibling failed
        let mut first_error = None;
        for (asset_path, result) in asset_paths.iter().zip(results) {
            match result {
                Ok(asset) => assets.record(asset_path, &asset)?,
                Err(source) => {
                    first_error.get_or_insert(CompositionError::Fetch { kind, source });
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        assets.stage_paths_into(&asset_paths, layer);
        run_operator(layer, kind, report)
    }
}

/// Invoke the operator for `kind` and turn a `false` into a typed error.
fn run_operator<L: Layer + ?Sized>(
    layer: &mut L,
    kind: CompositionKind,
    report: &mut CompositionReport,
) -> CompositionResult<()> {
    log::debug!("Composing {}", kind);
    report.operators.push(kind);

    if layer.compose(kind) {
        Ok(())
    } else {
        let message = layer.error();
        log::error!("Composing {} failed: {}", kind, message);
        Err(CompositionError::CompositionOperator { kind, message })
    }
}
