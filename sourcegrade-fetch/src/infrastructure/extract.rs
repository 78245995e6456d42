//! Archive extraction through the system `tar` and `unzip` tools

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
}

impl ArchiveFormat {
    /// Detect the format from a file name or URL path
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.split(['?', '#']).next().unwrap_or(name).to_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(Self::TarBz2)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }

    /// Detect the format from the leading bytes of a file
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            Some(Self::Zip)
        } else if header.starts_with(&[0x1F, 0x8B]) {
            Some(Self::TarGz)
        } else if header.starts_with(b"BZh") {
            Some(Self::TarBz2)
        } else if header.starts_with(&[0xFD, b'7', b'z', b'X', b'Z', 0x00]) {
            Some(Self::TarXz)
        } else if header.len() >= 262 && &header[257..262] == b"ustar" {
            Some(Self::Tar)
        } else {
            None
        }
    }

    /// Detect from the file name first, then from its content
    pub async fn detect(path: &Path) -> Result<Self, ExtractError> {
        if let Some(format) = path.to_str().and_then(Self::from_name) {
            return Ok(format);
        }

        let mut header = Vec::with_capacity(512);
        tokio::fs::File::open(path)
            .await?
            .take(512)
            .read_to_end(&mut header)
            .await?;
        Self::sniff(&header).ok_or_else(|| ExtractError::UnknownFormat(path.to_path_buf()))
    }

    /// Canonical file extension, used when naming downloads
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::TarXz => "tar.xz",
        }
    }

    fn tool(&self) -> &'static str {
        match self {
            Self::Zip => "unzip",
            _ => "tar",
        }
    }
}

/// Errors raised while extracting an archive
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unrecognized archive format: {0}")]
    UnknownFormat(PathBuf),

    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extract `archive` into `destination`, which must already exist
pub async fn extract(
    archive: &Path,
    format: ArchiveFormat,
    destination: &Path,
) -> Result<(), ExtractError> {
    let tool = format.tool();
    let mut command = Command::new(tool);
    match format {
        ArchiveFormat::Zip => {
            command
                .arg("-q")
                .arg("-o")
                .arg(archive)
                .arg("-d")
                .arg(destination);
        }
        ArchiveFormat::Tar => {
            command.arg("-xf").arg(archive).arg("-C").arg(destination);
        }
        ArchiveFormat::TarGz => {
            command.arg("-xzf").arg(archive).arg("-C").arg(destination);
        }
        ArchiveFormat::TarBz2 => {
            command.arg("-xjf").arg(archive).arg("-C").arg(destination);
        }
        ArchiveFormat::TarXz => {
            command.arg("-xJf").arg(archive).arg("-C").arg(destination);
        }
    }

    debug!(tool = tool, archive = %archive.display(), "Extracting archive");

    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ExtractError::Spawn { tool, source })?;

    if !output.status.success() {
        return Err(ExtractError::ToolFailed {
            tool,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(())
}
