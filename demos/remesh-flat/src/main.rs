//! Remesh a flat plate, or a `.surf` file given on the command line.
//!
//! ```text
//! remesh-flat [INPUT.surf] [OUTPUT.surf] [TARGET_SIZE]
//! ```
//!
//! With no arguments a built-in 2x2 plate is remeshed at size 0.5 and
//! written to `remeshed.surf`. Set `RUST_LOG=debug` for per-stage
//! detail.

use std::process::ExitCode;

use mesh_pipeline::{Pipeline, PipelineConfig};
use mesh_types::{Point3, SurfaceMesh};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn plate() -> SurfaceMesh {
    let mut mesh = SurfaceMesh::new();
    mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
    mesh.add_vertex(Point3::new(2.0, 0.0, 0.0));
    mesh.add_vertex(Point3::new(2.0, 2.0, 0.0));
    mesh.add_vertex(Point3::new(0.0, 2.0, 0.0));
    let plate = mesh.ensure_group("plate");
    mesh.add_face([0, 1, 2], plate);
    mesh.add_face([0, 2, 3], plate);
    mesh
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let input = args.first().cloned();
    let output = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| "remeshed.surf".to_owned());
    let target: f64 = match args.get(2) {
        Some(s) => s.parse()?,
        None => 0.5,
    };

    let mesh = match &input {
        Some(path) => mesh_io::load_surf(path)?,
        None => plate(),
    };
    info!(
        input = input.as_deref().unwrap_or("<built-in plate>"),
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        target,
        "loaded surface"
    );

    let config = PipelineConfig::with_target_size(target).with_coplanarity(0.9);
    let remeshed = Pipeline::new(mesh, config)?.run_with(|stage, mesh| {
        info!(stage = %stage, faces = mesh.face_count(), "stage done");
    })?;

    mesh_io::save_surf(&remeshed, &output)?;
    info!(
        output,
        vertices = remeshed.vertex_count(),
        faces = remeshed.face_count(),
        "wrote remeshed surface"
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = run() {
        error!(error = %e, "remeshing failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
