// ── Directory overlay surface ──
//
// Writes each overlay as `NN-<label>.tif` into an output directory,
// numbered bottom to top. Files already in the directory, or written by
// an earlier run, are foreign: listed, never overwritten or removed.
// Sequence numbers already used by a file in the directory are skipped.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use siteplan_core::{DecodedRaster, OverlayStyle, OverlaySurface, SurfaceError};

#[derive(Debug)]
pub struct DirectorySurface {
    dir: PathBuf,
    /// Files this surface wrote, bottom to top.
    owned: Vec<PathBuf>,
    next_seq: u32,
}

impl DirectorySurface {
    /// Use `dir` as the surface, creating it if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, SurfaceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            owned: Vec::new(),
            next_seq: 1,
        })
    }

    /// The overlay files currently written by this surface, bottom to top.
    pub fn files(&self) -> &[PathBuf] {
        &self.owned
    }

    /// Sequence numbers taken by any `NN-...` file in the directory.
    fn taken_sequences(&self) -> io::Result<HashSet<u32>> {
        let mut taken = HashSet::new();
        for entry in fs::read_dir(&self.dir)? {
            if let Some(seq) = sequence_of(&entry?.path()) {
                taken.insert(seq);
            }
        }
        Ok(taken)
    }
}

impl OverlaySurface for DirectorySurface {
    type Handle = PathBuf;

    fn add_overlay(
        &mut self,
        raster: &DecodedRaster,
        style: &OverlayStyle,
    ) -> Result<PathBuf, SurfaceError> {
        let taken = self.taken_sequences()?;
        let slug = slug(&style.label);
        let mut seq = self.next_seq;

        let (path, mut file) = loop {
            if !taken.contains(&seq) {
                let path = self.dir.join(format!("{seq:02}-{slug}.tif"));
                match OpenOptions::new().write(true).create_new(true).open(&path) {
                    Ok(file) => break (path, file),
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                    Err(e) => return Err(e.into()),
                }
            }
            seq += 1;
        };

        if let Err(e) = file.write_all(raster.payload()) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }
        debug!(path = %path.display(), opacity = style.opacity, "overlay written");

        self.next_seq = seq + 1;
        self.owned.push(path.clone());
        Ok(path)
    }

    fn remove_overlay(&mut self, handle: &PathBuf) -> Result<(), SurfaceError> {
        let pos = self
            .owned
            .iter()
            .position(|p| p == handle)
            .ok_or_else(|| SurfaceError::UnknownOverlay(handle.display().to_string()))?;
        match fs::remove_file(handle) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.owned.remove(pos);
        if self.owned.is_empty() {
            self.next_seq = 1;
        }
        Ok(())
    }

    fn list_overlays(&self, owned_by_core: bool) -> Vec<PathBuf> {
        if owned_by_core {
            return self.owned.clone();
        }
        let owned: HashSet<&PathBuf> = self.owned.iter().collect();
        let mut foreign: Vec<PathBuf> = fs::read_dir(&self.dir)
            .into_iter()
            .flatten()
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && !owned.contains(p))
            .collect();
        foreign.sort();
        foreign
    }
}

/// The `NN` of an `NN-<label>` file name.
fn sequence_of(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    let (prefix, _) = name.split_once('-')?;
    prefix.parse().ok()
}

/// Lowercase, filesystem-safe version of a site name.
fn slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "site".into()
    } else {
        trimmed.to_owned()
    }
}
