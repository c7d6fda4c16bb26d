// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::run_tool;
use crate::error::{Error, Result};

/// External video encoder
pub trait VideoRenderer: Send {
    /// Encode `images`, in order, into `output`. `workdir` is where scratch
    /// files may be written.
    fn render(&self, workdir: &Path, images: &[PathBuf], output: &Path) -> Result<()>;
}

/// Wrapper around the `mencoder` command line
#[derive(Debug, Clone)]
pub struct Mencoder {
    binary: PathBuf,
    fps: u32,
}

impl Mencoder {
    pub fn new(binary: impl Into<PathBuf>, fps: u32) -> Self {
        Self {
            binary: binary.into(),
            fps,
        }
    }

    fn list_file(workdir: &Path, output: &Path) -> PathBuf {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "timelapse".to_string());
        workdir.join(format!("{}_surveillance_files.txt", stem))
    }

    fn args(&self, list: &Path, output: &Path) -> Vec<String> {
        vec![
            "-nosound".to_string(),
            "-ovc".to_string(),
            "lavc".to_string(),
            "-lavcopts".to_string(),
            "vcodec=mpeg4:aspect=16/9:vbitrate=8000000".to_string(),
            "-vf".to_string(),
            "scale=2592:1944".to_string(),
            "-o".to_string(),
            output.display().to_string(),
            "-mf".to_string(),
            format!("type=jpeg:fps={}", self.fps),
            format!("mf://@{}", list.display()),
        ]
    }
}

impl VideoRenderer for Mencoder {
    fn render(&self, workdir: &Path, images: &[PathBuf], output: &Path) -> Result<()> {
        let list = Self::list_file(workdir, output);
        let mut contents = String::new();
        for image in images {
            contents.push_str(&image.display().to_string());
            contents.push('\n');
        }
        fs::write(&list, contents).map_err(|e| Error::io(&list, e))?;
        debug!("wrote {} entries to {:?}", images.len(), list);

        info!("encoding {} frames into {:?}", images.len(), output);
        let result = run_tool(&self.binary, self.args(&list, output), Some(workdir));

        if let Err(e) = fs::remove_file(&list) {
            warn!("could not remove list file {:?}: {}", list, e);
        }
        result.map(|_| ())
    }
}
