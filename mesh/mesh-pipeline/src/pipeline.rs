//! The pass sequencer.

use hashbrown::HashSet;
use mesh_metric::MetricField;
use mesh_ops::{
    decimate, decimate_free_edges, improve_valence, insert_points, refine, smooth, swap,
    DecimateParams, RefineParams, SmoothParams, SwapParams, ValenceParams,
};
use mesh_polyline::reconcile;
use mesh_tags::{freeze, tag_free_edges, tag_group_boundaries, tag_groups, FreezeScope};
use mesh_types::{Aabb, Liaison, SurfaceMesh};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::schedule;
use crate::stage::Stage;

/// The thirteen-stage remeshing sequencer.
///
/// Owns the mesh (through its [`Liaison`]) for the whole run; stages
/// execute strictly in order and the first operator error aborts the run
/// without writing anything. Frozen state is deliberately not released
/// on abort.
pub struct Pipeline {
    config: PipelineConfig,
    liaison: Liaison,
    metric: MetricField,
    size: f64,
    post_hook: Option<Box<dyn FnOnce(&mut SurfaceMesh)>>,
}

impl Pipeline {
    /// Validate the configuration, build the metric, tag immutable
    /// regions, and bind the mesh to its background snapshot.
    ///
    /// # Errors
    ///
    /// Fails on any configuration error, before the mesh is mutated.
    pub fn new(mut mesh: SurfaceMesh, config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;

        // Ambient size: explicit target, or the bounding-box diagonal
        // when only a point-metric file drives the sizes.
        let size = match config.target_size {
            Some(s) => s,
            None => Aabb::from_points(mesh.vertices.iter().map(|v| &v.position))
                .map_or(1.0, |b| b.diagonal()),
        };

        let metric = match &config.metric_file {
            Some(path) => MetricField::from_file(size, path, config.rho, config.mixed_metric)?,
            None => MetricField::euclidean(size)?,
        };

        if config.immutable_border {
            let tagged = tag_free_edges(&mut mesh);
            debug!(tagged, "free-edge border frozen");
        }
        if config.preserve_groups {
            let tagged = tag_group_boundaries(&mut mesh);
            debug!(tagged, "group boundaries frozen");
        }
        if !config.immutable_groups.is_empty() {
            let tagged = tag_groups(&mut mesh, &config.immutable_groups);
            debug!(tagged, "immutable groups frozen");
        }

        let liaison = Liaison::create(mesh);
        Ok(Self {
            config,
            liaison,
            metric,
            size,
            post_hook: None,
        })
    }

    /// Install a hook run after the last stage, before the mesh is
    /// handed back.
    #[must_use]
    pub fn with_post_hook(mut self, hook: impl FnOnce(&mut SurfaceMesh) + 'static) -> Self {
        self.post_hook = Some(Box::new(hook));
        self
    }

    /// The working mesh.
    #[must_use]
    pub fn mesh(&self) -> &SurfaceMesh {
        self.liaison.mesh()
    }

    /// Run all stages and return the remeshed surface.
    ///
    /// # Errors
    ///
    /// The first stage failure aborts the whole run.
    pub fn run(self) -> PipelineResult<SurfaceMesh> {
        self.run_with(|_, _| {})
    }

    /// Run all stages, invoking `observer` after each completed stage.
    ///
    /// # Errors
    ///
    /// The first stage failure aborts the whole run.
    #[allow(clippy::too_many_lines)]
    pub fn run_with(
        mut self,
        mut observer: impl FnMut(Stage, &SurfaceMesh),
    ) -> PipelineResult<SurfaceMesh> {
        let c = self.config.coplanarity;
        let safe = schedule::safe_coplanarity(c);
        let t = self.size;
        info!(
            target_size = t,
            coplanarity = c,
            faces = self.liaison.mesh().face_count(),
            "pipeline start"
        );

        self.pre_decimate()?;

        // Stage 1: forced points become hard constraints before anything
        // can move them.
        if !self.config.forced_points.is_empty() {
            let points = std::mem::take(&mut self.config.forced_points);
            let inserted = insert_points(&mut self.liaison, &points)?;
            // Forced points stay frozen for the whole run; the scope is
            // never released.
            let scope = freeze(self.liaison.mesh_mut(), &inserted);
            self.record(Stage::ForcedInsertion, &format_args!("points={}", scope.len()));
        }
        self.finish(Stage::ForcedInsertion, &mut observer)?;

        // Stage 2: fix 1-D feature geometry before interior passes
        // depend on it.
        let skeleton = RefineParams::skeleton(c);
        self.record(Stage::SkeletonRefine, &format_args!("{skeleton:?}"));
        refine(&mut self.liaison, &self.metric, &skeleton)?;
        self.finish(Stage::SkeletonRefine, &mut observer)?;

        // Stage 3: cheap shape improvement before expensive decimation.
        let coarsening = SwapParams::with_coplanarity(c)
            .with_max_swap_volume(schedule::max_swap_volume(t));
        self.record(Stage::CoarseningSwap, &format_args!("{coarsening:?}"));
        swap(&mut self.liaison, &coarsening)?;
        self.finish(Stage::CoarseningSwap, &mut observer)?;

        // Stage 4: remove over-dense input geometry. Non-manifold
        // junctions are pinned for the duration of the pass.
        let coarse = DecimateParams {
            target_size: schedule::COARSE_RATIO * t,
            max_edge_length: Some(schedule::coarse_max_edge(t)),
            freeze_non_manifold: true,
            coplanarity: c,
        };
        self.record(Stage::CoarseDecimate, &format_args!("{coarse:?}"));
        decimate(&mut self.liaison, &coarse)?;
        self.finish(Stage::CoarseDecimate, &mut observer)?;

        // Stage 5: externally generated points, frozen until stage 12.
        let mut front_scope: Option<FreezeScope> = None;
        let mut fronting_inserted = false;
        if let Some(tool) = self.config.fronting.clone() {
            let immutable = self.immutable_group_ids();
            let insertions = tool.run(self.liaison.mesh(), t, &immutable)?;
            let points: Vec<_> = insertions
                .iter()
                .flat_map(|i| i.points.iter().copied())
                .collect();
            fronting_inserted = !points.is_empty();
            let inserted = insert_points(&mut self.liaison, &points)?;
            front_scope = Some(freeze(self.liaison.mesh_mut(), &inserted));
            self.record(
                Stage::Fronting,
                &format_args!("groups={} points={}", insertions.len(), points.len()),
            );
        }
        self.finish(Stage::Fronting, &mut observer)?;

        // Stage 6: boundary-only cleanup, independent of interior size.
        self.record(
            Stage::FreeEdgeDecimate,
            &format_args!("size={}", schedule::BORDER_RATIO * t),
        );
        decimate_free_edges(&mut self.liaison, schedule::BORDER_RATIO * t)?;
        self.finish(Stage::FreeEdgeDecimate, &mut observer)?;

        // Stage 7: the metric-driven interior refinement.
        let interior = RefineParams {
            coplanarity: c,
            ..RefineParams::default()
        };
        self.record(Stage::MetricRefine, &format_args!("{interior:?}"));
        refine(&mut self.liaison, &self.metric, &interior)?;
        self.finish(Stage::MetricRefine, &mut observer)?;

        // Stage 8: when fronting already placed points, demanding strict
        // improvement avoids reinserting them by proxy.
        let safe_swap = SwapParams::with_coplanarity(safe)
            .with_expect_insert(!fronting_inserted);
        self.record(Stage::SafeSwap, &format_args!("{safe_swap:?}"));
        swap(&mut self.liaison, &safe_swap)?;
        self.finish(Stage::SafeSwap, &mut observer)?;

        // Stage 9: short smoothing pass.
        let mid_smooth = SmoothParams {
            iterations: schedule::SMOOTH_ITERATIONS,
            relaxation: schedule::SMOOTH_RELAXATION,
            coplanarity: c,
        };
        self.record(Stage::Smooth, &format_args!("{mid_smooth:?}"));
        smooth(&mut self.liaison, &mid_smooth)?;
        self.finish(Stage::Smooth, &mut observer)?;

        // Stage 10: catch near-degenerate triangles the safe swap kept.
        let quality_swap = SwapParams::with_coplanarity(c)
            .with_angle_quality_ratio(schedule::ANGLE_QUALITY_RATIO);
        self.record(Stage::QualitySwap, &format_args!("{quality_swap:?}"));
        swap(&mut self.liaison, &quality_swap)?;
        self.finish(Stage::QualitySwap, &mut observer)?;

        // Stage 11: smoothing re-shortens edges; coarsen once more under
        // a sqrt(2)-scaled metric, then restore the scaling.
        self.metric.set_scaling(std::f64::consts::SQRT_2);
        let recoarsen = DecimateParams {
            target_size: schedule::COARSE_RATIO * t * std::f64::consts::SQRT_2,
            max_edge_length: Some(schedule::coarse_max_edge(t * std::f64::consts::SQRT_2)),
            freeze_non_manifold: true,
            coplanarity: c,
        };
        self.record(Stage::Recoarsen, &format_args!("{recoarsen:?}"));
        decimate(&mut self.liaison, &recoarsen)?;
        swap(
            &mut self.liaison,
            &SwapParams::with_coplanarity(safe).with_expect_insert(false),
        )?;
        self.metric.set_scaling(1.0);
        self.finish(Stage::Recoarsen, &mut observer)?;

        // Stage 12: fronting constraints end here; valence repair runs on
        // the stabilized topology, highest degree first.
        if let Some(scope) = front_scope.take() {
            debug!(released = scope.len(), "fronting freeze released");
            scope.release(self.liaison.mesh_mut());
        }
        let valence = ValenceParams {
            degrees: vec![5, 4, 3],
            coplanarity: c,
        };
        self.record(Stage::ValenceRepair, &format_args!("{valence:?}"));
        improve_valence(&mut self.liaison, &valence)?;
        self.finish(Stage::ValenceRepair, &mut observer)?;

        // Stage 13: longer smoothing at the relaxed threshold.
        let final_smooth = SmoothParams {
            iterations: schedule::FINAL_SMOOTH_ITERATIONS,
            relaxation: schedule::SMOOTH_RELAXATION,
            coplanarity: safe,
        };
        self.record(Stage::FinalSmooth, &format_args!("{final_smooth:?}"));
        smooth(&mut self.liaison, &final_smooth)?;
        self.finish(Stage::FinalSmooth, &mut observer)?;

        self.reconcile_beams()?;

        let mut mesh = self.liaison.into_mesh();
        if let Some(hook) = self.post_hook {
            hook(&mut mesh);
        }
        info!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            beams = mesh.beams.len(),
            "pipeline complete"
        );
        Ok(mesh)
    }

    /// Optional decimation pre-pass, by tolerance or face-count target,
    /// followed by a shape-restoring swap.
    fn pre_decimate(&mut self) -> PipelineResult<()> {
        let c = self.config.coplanarity;
        if let Some(size) = self.config.decimate_size {
            decimate(
                &mut self.liaison,
                &DecimateParams {
                    target_size: size,
                    coplanarity: c,
                    ..DecimateParams::default()
                },
            )?;
        } else if let Some(target) = self.config.decimate_target {
            let mut size = schedule::COARSE_RATIO * self.size;
            for _ in 0..10 {
                if self.liaison.mesh().face_count() <= target {
                    break;
                }
                decimate(
                    &mut self.liaison,
                    &DecimateParams {
                        target_size: size,
                        coplanarity: c,
                        ..DecimateParams::default()
                    },
                )?;
                size *= 2.0;
            }
        } else {
            return Ok(());
        }
        swap(&mut self.liaison, &SwapParams::with_coplanarity(c))?;
        debug!(faces = self.liaison.mesh().face_count(), "pre-decimation done");
        Ok(())
    }

    /// Rebuild and resample beams when a wire size is configured.
    fn reconcile_beams(&mut self) -> PipelineResult<()> {
        let Some(wire) = self.config.wire_size else {
            return Ok(());
        };
        if self.liaison.mesh().beams.is_empty() {
            return Ok(());
        }
        let wire_metric = MetricField::euclidean(wire)?;
        let immutable = self.immutable_group_ids();
        let report = reconcile(
            self.liaison.mesh_mut(),
            &wire_metric,
            schedule::WIRE_FEATURE_ANGLE,
            schedule::WIRE_SPACING_RATIO * wire,
            &immutable,
        )?;
        info!(%wire, polylines = report.polylines, beams = report.beams, "beams reconciled");
        Ok(())
    }

    /// Ids of the configured immutable groups that exist on the mesh.
    fn immutable_group_ids(&self) -> HashSet<u32> {
        self.config
            .immutable_groups
            .iter()
            .filter_map(|name| self.liaison.mesh().group_id(name))
            .collect()
    }

    /// Log a stage's derived parameters when replay recording is on.
    fn record(&self, stage: Stage, params: &std::fmt::Arguments<'_>) {
        if self.config.record {
            info!(stage = %stage, %params, "stage parameters");
        }
    }

    /// Snapshot and notify after a stage completes.
    fn finish(
        &mut self,
        stage: Stage,
        observer: &mut impl FnMut(Stage, &SurfaceMesh),
    ) -> PipelineResult<()> {
        debug!(
            stage = %stage,
            vertices = self.liaison.mesh().vertex_count(),
            faces = self.liaison.mesh().face_count(),
            "stage complete"
        );
        if let Some(prefix) = &self.config.snapshot_prefix {
            let path = format!("{}-{stage}.stl", prefix.display());
            mesh_io::save_stl(self.liaison.mesh(), &path, true)?;
        }
        observer(stage, self.liaison.mesh());
        Ok(())
    }
}
