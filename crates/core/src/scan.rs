//! Discovery of newly captured recordings.

use std::path::Path;
use tokio::fs;

use crate::lifecycle::RecordingKind;
use crate::pipeline::Recording;

/// Filename prefix of recordings belonging to a pass.
pub fn recording_prefix(pass_id: u64) -> String {
    format!("data_{}_", pass_id)
}

/// Lists `data_<pass>_*.<ext>` recordings of `kind` in `new_dir`, sorted
/// by filename for deterministic processing order.
pub async fn discover(
    new_dir: &Path,
    pass_id: u64,
    kind: RecordingKind,
) -> Result<Vec<Recording>, std::io::Error> {
    let prefix = recording_prefix(pass_id);
    let mut recordings = Vec::new();

    let mut entries = match fs::read_dir(new_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(recordings),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();

        let matches_kind = path
            .extension()
            .is_some_and(|ext| ext == kind.extension());
        if name.starts_with(&prefix) && matches_kind {
            recordings.push(Recording { kind, path });
        }
    }

    recordings.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(recordings)
}
