//! Subprocess driver for the external fronting tool.

use std::path::PathBuf;
use std::process::Command;

use hashbrown::HashSet;
use mesh_types::{Point3, SurfaceMesh};
use tracing::{debug, info, warn};

use crate::error::{FrontError, FrontResult};
use crate::off::{export_group_off, parse_point_stream};

/// Points generated for one group. Skipped and failed groups carry an
/// empty point list so the result stays index-aligned with the group
/// list.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupInsertion {
    /// Group id the points belong to.
    pub group: u32,
    /// Generated interior points, empty when the group was skipped or
    /// its tool invocation failed.
    pub points: Vec<Point3<f64>>,
}

impl GroupInsertion {
    fn empty(group: u32) -> Self {
        Self {
            group,
            points: Vec::new(),
        }
    }
}

/// External advancing-front point generator.
///
/// The tool is invoked once per group as
/// `program <input.off> <output> <size> [extra args...]` and is expected
/// to write a whitespace point stream to `<output>`.
#[derive(Debug, Clone)]
pub struct FrontingTool {
    program: PathBuf,
    extra_args: Vec<String>,
}

impl FrontingTool {
    /// Configure a tool by executable path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Extra arguments appended after the size argument.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Run the tool over every group owning at least one triangle.
    ///
    /// Groups in `immutable_groups` are skipped. Invocations are strictly
    /// sequential. A tool that fails to spawn, exits non-zero, or leaves
    /// no output degrades to an empty insertion for that group; the run
    /// itself keeps going.
    ///
    /// # Errors
    ///
    /// Fails on a non-positive `target_size` or when the scratch
    /// directory cannot be created.
    pub fn run(
        &self,
        mesh: &SurfaceMesh,
        target_size: f64,
        immutable_groups: &HashSet<u32>,
    ) -> FrontResult<Vec<GroupInsertion>> {
        if target_size <= 0.0 || !target_size.is_finite() {
            return Err(FrontError::InvalidSize(target_size));
        }

        let scratch = tempfile::tempdir()?;
        let mut insertions = Vec::new();

        for group in mesh.groups_with_faces() {
            if immutable_groups.contains(&group) {
                debug!(group, "immutable group skipped by fronting");
                insertions.push(GroupInsertion::empty(group));
                continue;
            }

            let input = scratch.path().join(format!("group-{group}.off"));
            let output = scratch.path().join(format!("group-{group}.pts"));
            export_group_off(mesh, group, &input)?;

            let status = Command::new(&self.program)
                .arg(&input)
                .arg(&output)
                .arg(target_size.to_string())
                .args(&self.extra_args)
                .status();

            match status {
                Ok(code) if code.success() => {}
                Ok(code) => {
                    warn!(group, %code, "fronting tool failed, inserting no points");
                    insertions.push(GroupInsertion::empty(group));
                    continue;
                }
                Err(e) => {
                    warn!(group, error = %e, "fronting tool did not start, inserting no points");
                    insertions.push(GroupInsertion::empty(group));
                    continue;
                }
            }

            if !output.exists() {
                warn!(group, "fronting tool wrote no output, inserting no points");
                insertions.push(GroupInsertion::empty(group));
                continue;
            }

            let points = parse_point_stream(&output)?;
            debug!(group, points = points.len(), "fronting points collected");
            insertions.push(GroupInsertion { group, points });
        }

        info!(
            groups = insertions.len(),
            points = insertions.iter().map(|i| i.points.len()).sum::<usize>(),
            "fronting run complete"
        );
        Ok(insertions)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::os::unix::fs::PermissionsExt;

    fn make_grouped_mesh(groups: u32) -> SurfaceMesh {
        let mut mesh = SurfaceMesh::new();
        for g in 0..groups {
            let base = mesh.vertex_count() as u32;
            let x = f64::from(g) * 2.0;
            mesh.add_vertex(Point3::new(x, 0.0, 0.0));
            mesh.add_vertex(Point3::new(x + 1.0, 0.0, 0.0));
            mesh.add_vertex(Point3::new(x, 1.0, 0.0));
            mesh.add_face([base, base + 1, base + 2], g + 1);
        }
        mesh
    }

    fn make_fake_tool(dir: &std::path::Path, script: &str) -> PathBuf {
        let path = dir.join("fake-tool.sh");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\n{script}").unwrap();
        drop(file);
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn test_successful_tool_points_parsed_per_group() {
        let dir = tempfile::tempdir().unwrap();
        // Echoes one point whose x is the requested size.
        let tool = make_fake_tool(dir.path(), "echo \"$3 0.25 0.0\" > \"$2\"");
        let mesh = make_grouped_mesh(2);

        let insertions = FrontingTool::new(tool)
            .run(&mesh, 0.5, &HashSet::new())
            .unwrap();

        assert_eq!(insertions.len(), 2);
        assert_eq!(insertions[0].group, 1);
        assert_eq!(insertions[1].group, 2);
        for insertion in &insertions {
            assert_eq!(insertion.points.len(), 1);
            assert!((insertion.points[0].x - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_failing_tool_degrades_to_empty_group() {
        let dir = tempfile::tempdir().unwrap();
        // Group 2 fails; the others succeed.
        let tool = make_fake_tool(
            dir.path(),
            "case \"$1\" in *group-2*) exit 3;; esac\necho \"0.1 0.1 0.0\" > \"$2\"",
        );
        let mesh = make_grouped_mesh(3);

        let insertions = FrontingTool::new(tool)
            .run(&mesh, 0.5, &HashSet::new())
            .unwrap();

        assert_eq!(insertions.len(), 3);
        assert_eq!(insertions[0].points.len(), 1);
        assert!(insertions[1].points.is_empty());
        assert_eq!(insertions[2].points.len(), 1);
    }

    #[test]
    fn test_immutable_group_gets_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let tool = make_fake_tool(dir.path(), "echo \"0.1 0.1 0.0\" > \"$2\"");
        let mesh = make_grouped_mesh(2);
        let immutable: HashSet<u32> = [1].into_iter().collect();

        let insertions = FrontingTool::new(tool).run(&mesh, 0.5, &immutable).unwrap();

        assert_eq!(insertions.len(), 2);
        assert!(insertions[0].points.is_empty());
        assert_eq!(insertions[1].points.len(), 1);
    }

    #[test]
    fn test_missing_tool_is_not_fatal() {
        let mesh = make_grouped_mesh(1);
        let insertions = FrontingTool::new("/no/such/fronting-tool")
            .run(&mesh, 0.5, &HashSet::new())
            .unwrap();
        assert_eq!(insertions.len(), 1);
        assert!(insertions[0].points.is_empty());
    }

    #[test]
    fn test_invalid_size_rejected() {
        let mesh = make_grouped_mesh(1);
        assert!(matches!(
            FrontingTool::new("/bin/true").run(&mesh, 0.0, &HashSet::new()),
            Err(FrontError::InvalidSize(_))
        ));
    }
}
