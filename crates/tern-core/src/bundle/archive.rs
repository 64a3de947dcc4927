use std::io;

use serde::Serialize;

use super::graph::ArtifactNode;
use crate::error::BundleError;

/// Archive member listing entry points and packaged artifacts.
pub const MANIFEST_ENTRY: &str = "MANIFEST";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a> {
    entry_points: &'a [String],
    artifacts: Vec<&'a str>,
}

/// Build a tar archive in memory.
///
/// Members carry a zero mtime, uid and gid and a fixed mode, so equal inputs
/// always produce equal bytes. Layout:
/// - `MANIFEST`
/// - `lib/<artifact id>` for every closure member, in closure order
/// - `resources/<name>` for every extra resource
/// - root-level `files`
pub(crate) fn write_archive(
    entries: &[String],
    closure: &[ArtifactNode],
    resources: &[(String, Vec<u8>)],
    files: &[(String, Vec<u8>)],
) -> Result<Vec<u8>, BundleError> {
    let mut builder = tar::Builder::new(Vec::new());

    let manifest = Manifest {
        entry_points: entries,
        artifacts: closure.iter().map(|n| n.id.as_str()).collect(),
    };
    let manifest = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    append(&mut builder, MANIFEST_ENTRY, &manifest)?;

    for node in closure {
        let data = std::fs::read(&node.path).map_err(|source| BundleError::Unreadable {
            artifact: node.id.clone(),
            source,
        })?;
        append(&mut builder, &format!("lib/{}", node.id), &data)?;
    }
    for (name, data) in resources {
        append(&mut builder, &format!("resources/{name}"), data)?;
    }
    for (name, data) in files {
        append(&mut builder, name, data)?;
    }

    Ok(builder.into_inner()?)
}

fn append(builder: &mut tar::Builder<Vec<u8>>, path: &str, data: &[u8]) -> io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    builder.append_data(&mut header, path, data)
}
