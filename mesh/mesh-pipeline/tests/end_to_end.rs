//! End-to-end pipeline scenarios.

use std::io::Write as _;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use mesh_front::FrontingTool;
use mesh_pipeline::{Pipeline, PipelineConfig, Stage};
use mesh_types::{Point3, SurfaceMesh};

/// One flat square of side 2, two triangles.
fn flat_square() -> SurfaceMesh {
    let mut mesh = SurfaceMesh::new();
    mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
    mesh.add_vertex(Point3::new(2.0, 0.0, 0.0));
    mesh.add_vertex(Point3::new(2.0, 2.0, 0.0));
    mesh.add_vertex(Point3::new(0.0, 2.0, 0.0));
    mesh.add_face([0, 1, 2], 0);
    mesh.add_face([0, 2, 3], 0);
    mesh
}

fn contains_position(mesh: &SurfaceMesh, p: &Point3<f64>) -> bool {
    mesh.vertices
        .iter()
        .any(|v| (v.position - p).norm() < 1e-9)
}

fn edge_lengths(mesh: &SurfaceMesh) -> Vec<f64> {
    let mut lengths = Vec::new();
    for face in &mesh.faces {
        for k in 0..3 {
            let (a, b) = (face[k], face[(k + 1) % 3]);
            if a < b {
                lengths.push(mesh.edge_length(a, b));
            }
        }
    }
    lengths
}

#[test]
fn test_flat_square_reaches_target_size() {
    let target = 1.0; // half the square's edge
    let config = PipelineConfig::with_target_size(target).with_coplanarity(0.9);
    let pipeline = Pipeline::new(flat_square(), config).unwrap();
    let out = pipeline.run().unwrap();

    assert!(out.validate().is_empty());
    assert!(out.face_count() > 2, "square was not refined");

    // The four corners survive as feature points.
    for corner in [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(2.0, 2.0, 0.0),
        Point3::new(0.0, 2.0, 0.0),
    ] {
        assert!(contains_position(&out, &corner), "corner {corner} lost");
    }

    // Edge lengths cluster near the target.
    let lengths = edge_lengths(&out);
    let mean = lengths.iter().sum::<f64>() / lengths.len() as f64;
    assert!(
        mean > 0.4 * target && mean < 1.8 * target,
        "mean edge length {mean} far from target {target}"
    );
    let max = lengths.iter().fold(0.0_f64, |m, &l| m.max(l));
    assert!(max < 2.2 * target, "edge of length {max} survived");
}

#[test]
fn test_observer_sees_all_stages_in_order() {
    let config = PipelineConfig::with_target_size(1.0).with_coplanarity(0.9);
    let pipeline = Pipeline::new(flat_square(), config).unwrap();

    let mut seen = Vec::new();
    pipeline
        .run_with(|stage, mesh| {
            assert!(!mesh.faces.is_empty());
            seen.push(stage);
        })
        .unwrap();

    assert_eq!(seen, Stage::ALL.to_vec());
}

#[test]
fn test_boundary_beams_resampled_at_wire_size() {
    let mut mesh = flat_square();
    mesh.ensure_group("frame");
    mesh.add_beam(0, 1, 1);
    mesh.add_beam(1, 2, 1);
    mesh.add_beam(2, 3, 1);
    mesh.add_beam(3, 0, 1);

    let wire = 0.5;
    let config = PipelineConfig::with_target_size(1.0)
        .with_coplanarity(0.9)
        .with_wire_size(wire);
    let out = Pipeline::new(mesh, config).unwrap().run().unwrap();

    assert!(!out.beams.is_empty());
    for beam in &out.beams {
        let len = out.edge_length(beam.v0, beam.v1);
        assert!(len <= wire * 1.25, "beam of length {len} exceeds wire size");
        assert_eq!(beam.group, 1);
    }
}

#[test]
fn test_forced_points_survive_the_whole_run() {
    let forced = Point3::new(0.7, 1.3, 0.0);
    let mut config = PipelineConfig::with_target_size(1.0).with_coplanarity(0.9);
    config.forced_points = vec![forced];

    let out = Pipeline::new(flat_square(), config).unwrap().run().unwrap();
    assert!(contains_position(&out, &forced), "forced point was moved");
}

fn make_fake_tool(dir: &std::path::Path, script: &str) -> PathBuf {
    let path = dir.join("fake-front.sh");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh\n{script}").unwrap();
    drop(file);
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Three disjoint unit squares, one group each.
fn three_squares() -> SurfaceMesh {
    let mut mesh = SurfaceMesh::new();
    for g in 0..3u32 {
        let x = f64::from(g) * 3.0;
        let base = mesh.vertex_count() as u32;
        mesh.add_vertex(Point3::new(x, 0.0, 0.0));
        mesh.add_vertex(Point3::new(x + 1.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(x + 1.0, 1.0, 0.0));
        mesh.add_vertex(Point3::new(x, 1.0, 0.0));
        let group = mesh.ensure_group(&format!("panel-{g}"));
        mesh.add_face([base, base + 1, base + 2], group);
        mesh.add_face([base, base + 2, base + 3], group);
    }
    mesh
}

#[test]
fn test_fronting_failure_degrades_to_one_empty_group() {
    let dir = tempfile::tempdir().unwrap();
    // The tool emits one centroid point per group but fails on group 2.
    let tool = make_fake_tool(
        dir.path(),
        "case \"$1\" in *group-2*) exit 7;; esac\n\
         awk 'NR==1{next} NR==2{nv=$1; next} nv>0 {x+=$1; y+=$2; z+=$3; n++; nv--} \
         END {print x/n, y/n, z/n}' \"$1\" > \"$2\"",
    );

    let mut config = PipelineConfig::with_target_size(0.5).with_coplanarity(0.9);
    config.fronting = Some(FrontingTool::new(tool));

    let out = Pipeline::new(three_squares(), config).unwrap().run().unwrap();

    // All three groups still carry valid triangulations.
    assert!(out.validate().is_empty());
    assert_eq!(out.groups_with_faces(), vec![1, 2, 3]);
    for group in 1..=3 {
        assert!(!out.faces_in_group(group).is_empty());
    }
}

#[test]
fn test_snapshots_written_per_stage() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = PipelineConfig::with_target_size(1.0).with_coplanarity(0.9);
    config.snapshot_prefix = Some(dir.path().join("step"));

    Pipeline::new(flat_square(), config).unwrap().run().unwrap();

    let count = std::fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .path()
                .extension()
                .is_some_and(|x| x == "stl")
        })
        .count();
    assert_eq!(count, 13);
}
