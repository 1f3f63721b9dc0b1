use crate::{Error, Result, workspace::Workspace};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

/// Packages a directory tree, root folder included, into a zip archive.
#[derive(Debug, Clone, Default)]
pub struct ArchiveBuilder;

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Writes `<workspace>/<archive_name>.zip` containing `source_dir`. Entry
    /// names are `<root>/<relative path>`, with directories ending in `/`.
    pub async fn build_archive(
        &self,
        source_dir: &Path,
        workspace: &mut Workspace,
        archive_name: &str,
    ) -> Result<PathBuf> {
        let source = source_dir.to_path_buf();
        let target = workspace.path().join(format!("{}.zip", archive_name));

        let archive = target.clone();
        let entries = tokio::task::spawn_blocking(move || write_archive(&source, &archive))
            .await
            .map_err(|e| Error::internal(format!("archive task failed: {}", e)))??;

        debug!(
            "Archived {} entries from {} into {}",
            entries,
            source_dir.display(),
            target.display()
        );

        workspace.track(&target);
        Ok(target)
    }
}

/// A finished archive opened for streaming. Owns the workspace holding it, so
/// the workspace is removed once the reader is dropped.
#[derive(Debug)]
pub struct ArchiveReader {
    // declared before the workspace so the handle closes first
    file: tokio::fs::File,
    len: u64,
    workspace: Workspace,
}

impl ArchiveReader {
    pub async fn open(path: &Path, workspace: Workspace) -> Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        Ok(Self {
            file,
            len,
            workspace,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}

impl AsyncRead for ArchiveReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_read(cx, buf)
    }
}

fn write_archive(source: &Path, target: &Path) -> Result<usize> {
    let root_name = source
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::not_found(format!("cannot archive {}", source.display())))?;
    if !source.is_dir() {
        return Err(Error::not_found(format!(
            "model directory {} does not exist",
            source.display()
        )));
    }

    let mut zip = ZipWriter::new(BufWriter::new(File::create(target)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = 0;

    for entry in WalkDir::new(source).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(io::Error::other(e)))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::internal(e.to_string()))?;
        let name = entry_name(root_name, relative);

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", name), options)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options)?;
            let mut file = File::open(entry.path())?;
            io::copy(&mut file, &mut zip)?;
        } else {
            debug!("Skipping {} (not a file or directory)", entry.path().display());
            continue;
        }
        entries += 1;
    }

    zip.finish()?;
    Ok(entries)
}

fn entry_name(root_name: &str, relative: &Path) -> String {
    let mut name = root_name.to_string();
    for component in relative.components() {
        name.push('/');
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    name
}
