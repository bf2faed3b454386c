//! Group name lists.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{IoError, IoResult};

/// Read a list of group names, one or more per line, whitespace
/// separated. Blank lines and `#` comments are ignored.
///
/// Used for the immutable-group list that exempts borders from
/// remeshing.
///
/// # Errors
///
/// Returns an error when the file cannot be read.
pub fn read_group_names<P: AsRef<Path>>(path: P) -> IoResult<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IoError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IoError::Io(e)
        }
    })?;

    let mut names = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let data = line.split('#').next().unwrap_or("");
        for name in data.split_whitespace() {
            names.push(name.to_owned());
        }
    }
    Ok(names)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_names_across_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# frozen borders").unwrap();
        writeln!(file, "inlet outlet").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "wall # trailing comment").unwrap();

        let names = read_group_names(file.path()).unwrap();
        assert_eq!(names, vec!["inlet", "outlet", "wall"]);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_group_names("no_such_groups.txt"),
            Err(IoError::FileNotFound { .. })
        ));
    }
}
