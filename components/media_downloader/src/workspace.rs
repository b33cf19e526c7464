// components/media_downloader/src/workspace.rs
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, warn};

const DOWNLOADS_DIR: &str = "downloads";

/// Scratch space owned by exactly one request
///
/// Everything the engine writes lands under `downloads()`. The directory and
/// the optional credential file are removed by `release`, or by `Drop` on any
/// other exit path.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    downloads: PathBuf,
    credentials: Option<NamedTempFile>,
}

impl Workspace {
    /// Create a fresh workspace, under `root` when given, else the system temp dir
    pub fn acquire(root: Option<&Path>) -> std::io::Result<Self> {
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                tempfile::Builder::new().prefix("request-").tempdir_in(root)?
            }
            None => tempfile::Builder::new().prefix("request-").tempdir()?,
        };

        let downloads = dir.path().join(DOWNLOADS_DIR);
        std::fs::create_dir(&downloads)?;
        debug!(path = %dir.path().display(), "acquired workspace");

        Ok(Self {
            dir,
            downloads,
            credentials: None,
        })
    }

    /// Materialize the cookie blob as a file the engine can read
    ///
    /// The file lives inside the workspace and goes away with it.
    pub fn with_credentials(mut self, cookies: &[u8]) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("cookies-")
            .suffix(".txt")
            .tempfile_in(self.dir.path())?;
        file.write_all(cookies)?;
        file.flush()?;
        self.credentials = Some(file);
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the engine writes its output
    pub fn downloads(&self) -> &Path {
        &self.downloads
    }

    pub fn credentials(&self) -> Option<&Path> {
        self.credentials.as_ref().map(|f| f.path())
    }

    /// Remove the workspace now and report failures
    pub fn release(self) -> std::io::Result<()> {
        let path = self.dir.path().to_path_buf();
        if let Some(file) = self.credentials {
            file.close()?;
        }
        self.dir.close().map_err(|e| {
            warn!(path = %path.display(), error = %e, "failed to remove workspace");
            e
        })?;
        debug!(path = %path.display(), "released workspace");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_is_removed_on_release() {
        let root = TempDir::new().unwrap();
        let workspace = Workspace::acquire(Some(root.path())).unwrap();
        let path = workspace.path().to_path_buf();

        std::fs::write(workspace.downloads().join("song.mp3"), b"data").unwrap();
        assert!(path.exists());

        workspace.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn workspace_is_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let path = {
            let workspace = Workspace::acquire(Some(root.path())).unwrap();
            std::fs::write(workspace.downloads().join("partial.part"), b"x").unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn workspace_is_removed_when_a_scope_fails() {
        fn failing(root: &Path) -> Result<(), String> {
            let workspace = Workspace::acquire(Some(root)).map_err(|e| e.to_string())?;
            std::fs::write(workspace.downloads().join("a.mp4"), b"x").map_err(|e| e.to_string())?;
            Err("engine exploded".to_string())
        }

        let root = TempDir::new().unwrap();
        assert!(failing(root.path()).is_err());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn credentials_live_inside_workspace() {
        let root = TempDir::new().unwrap();
        let workspace = Workspace::acquire(Some(root.path()))
            .unwrap()
            .with_credentials(b"# Netscape HTTP Cookie File\n")
            .unwrap();

        let cookies = workspace.credentials().unwrap().to_path_buf();
        assert!(cookies.starts_with(workspace.path()));
        assert_eq!(
            std::fs::read_to_string(&cookies).unwrap(),
            "# Netscape HTTP Cookie File\n"
        );

        workspace.release().unwrap();
        assert!(!cookies.exists());
    }
}
