// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Surveillance capture storage
//!
//! Captures are written as `surveillance_<host>_<timestamp>.jpeg` inside the
//! image directory and then indexed in the catalog. The file lands first, so
//! the catalog never references a missing capture.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::db::{Catalog, SurveillanceImage};
use crate::error::{Error, Result};
use crate::protocol::SurveillanceMessage;

pub struct SurveillanceIngest {
    dir: PathBuf,
}

impl SurveillanceIngest {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic file name for a capture; never leaves the image directory
    pub fn file_name(host: &str, timestamp: &str) -> String {
        let clean = |s: &str| s.replace(['/', '\\'], "_");
        format!("surveillance_{}_{}.jpeg", clean(host), clean(timestamp))
    }

    pub fn path_of(&self, image: &SurveillanceImage) -> PathBuf {
        self.dir.join(&image.image_link)
    }

    pub fn decode(message: &SurveillanceMessage) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(message.image.trim())?)
    }

    /// Write the capture and index it. Returns the stored path.
    ///
    /// A repeated delivery rewrites the file and leaves the existing row in
    /// place. If indexing fails the written file is removed again.
    pub fn store(&self, catalog: &Catalog, host: &str, timestamp: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = Self::file_name(host, timestamp);
        let path = self.dir.join(&name);
        let partial = self.dir.join(format!(".{}.part", name));

        fs::write(&partial, bytes).map_err(|e| Error::io(&partial, e))?;
        fs::rename(&partial, &path).map_err(|e| {
            let _ = fs::remove_file(&partial);
            Error::io(&path, e)
        })?;
        debug!(host, "wrote {} bytes to {:?}", bytes.len(), path);

        match catalog.surveillance().insert(host, timestamp, &name) {
            Ok(true) => info!(host, "stored surveillance image {}", name),
            Ok(false) => debug!(host, "surveillance image {} already indexed", name),
            Err(e) => {
                if let Err(rm) = fs::remove_file(&path) {
                    warn!("could not remove unindexed capture {:?}: {}", path, rm);
                }
                return Err(e);
            }
        }
        Ok(path)
    }
}
