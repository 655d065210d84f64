//! Result archive packaging.
//!
//! Every job owns one directory under the jobs root, keyed by
//! `{owner_id}/{job_name}`. Once a job finishes, its output files are
//! bundled into a single `result.zip` inside that directory so the client
//! can download everything in one request. Packaging is idempotent: if the
//! archive already exists it is returned as-is.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File name of the bundled archive inside a job directory.
pub const ARCHIVE_FILE_NAME: &str = "result.zip";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Job directory does not exist: {0}")]
    MissingJobDir(PathBuf),

    #[error("Archive I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Zip encoding failed: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Directory holding all output files for one job.
pub fn job_dir(jobs_root: &Path, owner_id: &str, job_name: &str) -> PathBuf {
    jobs_root.join(owner_id).join(job_name)
}

/// Canonical archive path for a job directory.
pub fn archive_path(job_dir: &Path) -> PathBuf {
    job_dir.join(ARCHIVE_FILE_NAME)
}

/// Bundle every file under `job_dir` into `result.zip` and return its path.
///
/// A second call with an unchanged directory returns the existing archive
/// without re-doing the work. The archive is written to a temporary name
/// and renamed into place so a crash mid-write never leaves a partial
/// `result.zip` that a later call would treat as complete.
pub fn package(job_dir: &Path) -> Result<PathBuf, ArtifactError> {
    if !job_dir.is_dir() {
        return Err(ArtifactError::MissingJobDir(job_dir.to_path_buf()));
    }

    let archive = archive_path(job_dir);
    if archive.exists() {
        return Ok(archive);
    }

    let tmp = job_dir.join(format!("{ARCHIVE_FILE_NAME}.tmp"));
    let mut writer = ZipWriter::new(File::create(&tmp)?);
    let options =
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let result = add_dir_entries(&mut writer, job_dir, job_dir, options);
    match result.and_then(|()| writer.finish().map_err(ArtifactError::from)) {
        Ok(_) => {
            fs::rename(&tmp, &archive)?;
            Ok(archive)
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

/// Recursively add every regular file under `dir` to the archive, using
/// paths relative to `root`. The in-progress temporary file is skipped.
fn add_dir_entries(
    writer: &mut ZipWriter<File>,
    root: &Path,
    dir: &Path,
    options: SimpleFileOptions,
) -> Result<(), ArtifactError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            add_dir_entries(writer, root, &path, options)?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        // Entries always live under `root`; anything else is skipped.
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let name = relative.to_string_lossy().replace('\\', "/");
        if name == ARCHIVE_FILE_NAME || name == format!("{ARCHIVE_FILE_NAME}.tmp") {
            continue;
        }

        writer.start_file(name, options)?;
        let mut file = File::open(&path)?;
        io::copy(&mut file, writer)?;
    }
    Ok(())
}
