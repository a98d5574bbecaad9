// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Disc image loading and sector reading
//!
//! A disc owns an ordered list of tracks. A raw BIN image becomes a single
//! Data track; a CUE sheet describes the track layout of its BIN file.
//! Every track keeps its own open read handle on the image file.

use super::{CdromPosition, LEAD_IN_SECTORS, SECTOR_SIZE, SYNC_PATTERN};
use crate::core::error::CdRomError;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// CD-ROM track payload type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackType {
    /// Data sectors, opened by the 12-byte sync pattern
    Data,
    /// CD-DA audio sectors
    Audio,
}

/// A single track of a disc image
#[derive(Debug)]
pub struct CdromTrack {
    /// Path of the image file backing this track
    pub filepath: PathBuf,

    /// Track number (1-based)
    pub number: u8,

    /// Payload type
    pub track_type: TrackType,

    /// First physical LBA this track covers
    pub start_lba: u32,

    /// First file-relative sector of this track in its image
    pub index_lba: u32,

    /// Number of 2352-byte sectors in this track
    pub frame_count: u32,

    /// Open read handle on the image file
    file: File,
}

/// A loaded disc: an ordered list of tracks over one or more BIN files
///
/// # Example
///
/// ```no_run
/// use ember_core::core::cdrom::{CdromDisk, CdromPosition};
///
/// let mut disk = CdromDisk::new();
/// disk.init_from_bin("game.bin").unwrap();
///
/// let sector = disk.read(CdromPosition::new(0, 2, 0)).unwrap();
/// assert_eq!(sector.len(), 2352);
/// ```
#[derive(Debug, Default)]
pub struct CdromDisk {
    tracks: Vec<CdromTrack>,
}

impl CdromDisk {
    /// Create a disk with no tracks (empty drive)
    pub fn new() -> Self {
        Self { tracks: Vec::new() }
    }

    /// Number of tracks on the disc
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Track list in disc order
    pub fn tracks(&self) -> &[CdromTrack] {
        &self.tracks
    }

    /// Load a raw BIN image as a single Data track
    ///
    /// An empty file yields a disk with no tracks.
    pub fn init_from_bin(&mut self, path: &str) -> Result<(), CdRomError> {
        self.tracks.clear();

        let file = File::open(path).map_err(|e| {
            CdRomError::DiscLoadError(format!("failed to open bin file '{}': {}", path, e))
        })?;
        let filesize = file
            .metadata()
            .map_err(|e| CdRomError::DiscLoadError(e.to_string()))?
            .len();

        if filesize == 0 {
            log::warn!("Empty bin image '{}', no tracks created", path);
            return Ok(());
        }

        self.tracks.push(CdromTrack {
            filepath: PathBuf::from(path),
            number: 1,
            track_type: TrackType::Data,
            start_lba: LEAD_IN_SECTORS,
            index_lba: 0,
            frame_count: (filesize / SECTOR_SIZE as u64) as u32,
            file,
        });

        log::info!(
            "Loaded bin image '{}': {} sectors",
            path,
            self.tracks[0].frame_count
        );

        Ok(())
    }

    /// Load a disc from a CUE sheet
    ///
    /// Parses `FILE`, `TRACK` and `INDEX 01` directives; every track gets
    /// its own read handle on the named BIN file.
    pub fn init_from_cue(&mut self, path: &str) -> Result<(), CdRomError> {
        self.tracks.clear();

        let cue_data = std::fs::read_to_string(path)
            .map_err(|e| CdRomError::DiscLoadError(format!("failed to read '{}': {}", path, e)))?;

        let bin_path = Self::bin_path_from_cue(path, &cue_data)?;
        let layouts = Self::parse_cue(&cue_data)?;
        if layouts.is_empty() {
            return Err(CdRomError::DiscLoadError(format!(
                "no TRACK directives in '{}'",
                path
            )));
        }

        let filesize = std::fs::metadata(&bin_path)
            .map_err(|e| {
                CdRomError::DiscLoadError(format!(
                    "failed to stat bin file '{}': {}",
                    bin_path.display(),
                    e
                ))
            })?
            .len();
        let total_frames = (filesize / SECTOR_SIZE as u64) as u32;

        for (i, layout) in layouts.iter().enumerate() {
            // A track runs until the next index position, or the file end
            let end = layouts
                .get(i + 1)
                .map(|next| next.index_lba)
                .unwrap_or(total_frames);

            let file = File::open(&bin_path).map_err(|e| {
                CdRomError::DiscLoadError(format!(
                    "failed to open bin file '{}': {}",
                    bin_path.display(),
                    e
                ))
            })?;

            self.tracks.push(CdromTrack {
                filepath: bin_path.clone(),
                number: layout.number,
                track_type: layout.track_type,
                start_lba: layout.index_lba + LEAD_IN_SECTORS,
                index_lba: layout.index_lba,
                frame_count: end.saturating_sub(layout.index_lba),
                file,
            });
        }

        log::info!(
            "Loaded cue sheet '{}': {} tracks over '{}'",
            path,
            self.tracks.len(),
            bin_path.display()
        );

        Ok(())
    }

    /// Read the 2352-byte sector at a physical position
    ///
    /// With no covering track the result is an empty buffer. Positions past
    /// the end of the track read as zeros. A sync-pattern violation is
    /// logged but the sector is still returned for best-effort playback.
    pub fn read(&mut self, pos: CdromPosition) -> Result<Vec<u8>, CdRomError> {
        let index = match self.track_index_for(pos.to_lba()) {
            Some(index) => index,
            None => {
                log::warn!("Reading failed, no disk loaded");
                return Ok(Vec::new());
            }
        };
        let track = &mut self.tracks[index];

        // Convert physical position (as on a real disc) to the logical
        // position used to address the BIN file
        let read_pos = if track.number == 1 && track.track_type == TrackType::Data {
            pos.physical_to_logical()
        } else {
            pos
        };
        let lba = read_pos.to_lba();

        if lba >= track.index_lba + track.frame_count {
            log::warn!(
                "{}",
                CdRomError::ReadPastEnd {
                    lba,
                    frame_count: track.frame_count,
                }
            );
            return Ok(vec![0u8; SECTOR_SIZE]);
        }

        let mut sector = vec![0u8; SECTOR_SIZE];
        track
            .file
            .seek(SeekFrom::Start(lba as u64 * SECTOR_SIZE as u64))
            .map_err(|e| CdRomError::DiscLoadError(e.to_string()))?;
        track
            .file
            .read_exact(&mut sector)
            .map_err(|e| CdRomError::DiscLoadError(e.to_string()))?;

        let sync_match = sector[..SYNC_PATTERN.len()] == SYNC_PATTERN;
        if track.track_type == TrackType::Data && !sync_match {
            log::error!(
                "Invalid sync data in read Data sector ({})",
                CdRomError::SyncPatternMismatch { lba }
            );
        } else if track.track_type == TrackType::Audio && sync_match {
            log::error!("Sync data found in Audio sector at LBA {}", lba);
        }

        Ok(sector)
    }

    /// Track covering a physical LBA: the one with the highest starting
    /// LBA at or below it
    fn track_index_for(&self, lba: u32) -> Option<usize> {
        self.tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| track.start_lba <= lba)
            .max_by_key(|(_, track)| track.start_lba)
            .map(|(index, _)| index)
    }

    /// Resolve the BIN path from the cue's FILE directive
    fn bin_path_from_cue(cue_path: &str, cue_data: &str) -> Result<PathBuf, CdRomError> {
        for line in cue_data.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("FILE") {
                if let Some(start) = rest.find('"') {
                    if let Some(end) = rest[start + 1..].find('"') {
                        let name = &rest[start + 1..start + 1 + end];
                        let bin_path = match Path::new(cue_path).parent() {
                            Some(parent) => parent.join(name),
                            None => PathBuf::from(name),
                        };
                        return Ok(bin_path);
                    }
                }
            }
        }

        Err(CdRomError::DiscLoadError(
            "no FILE directive found in cue sheet".to_string(),
        ))
    }

    /// Parse TRACK / INDEX 01 directives out of a cue sheet
    fn parse_cue(cue_data: &str) -> Result<Vec<TrackLayout>, CdRomError> {
        let mut layouts: Vec<TrackLayout> = Vec::new();

        for line in cue_data.lines() {
            let line = line.trim();

            if line.starts_with("TRACK") {
                let mut parts = line.split_whitespace();
                parts.next(); // TRACK
                let number = parts
                    .next()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(layouts.len() as u8 + 1);
                let track_type = match parts.next() {
                    Some("AUDIO") => TrackType::Audio,
                    Some("MODE1/2352") | Some("MODE2/2352") => TrackType::Data,
                    Some(other) => {
                        log::warn!("Unknown cue track type '{}', assuming data", other);
                        TrackType::Data
                    }
                    None => TrackType::Data,
                };

                layouts.push(TrackLayout {
                    number,
                    track_type,
                    index_lba: 0,
                });
            } else if line.starts_with("INDEX 01") {
                let layout = layouts.last_mut().ok_or_else(|| {
                    CdRomError::DiscLoadError("INDEX before any TRACK in cue sheet".to_string())
                })?;
                let time = line.split_whitespace().nth(2).ok_or_else(|| {
                    CdRomError::DiscLoadError("INDEX directive missing timestamp".to_string())
                })?;
                layout.index_lba = Self::parse_msf(time)?.to_lba();
            }
        }

        Ok(layouts)
    }

    /// Parse an MM:SS:FF timestamp
    fn parse_msf(msf: &str) -> Result<CdromPosition, CdRomError> {
        let parts: Vec<&str> = msf.split(':').collect();
        if parts.len() != 3 {
            return Err(CdRomError::DiscLoadError(format!(
                "invalid MSF timestamp '{}'",
                msf
            )));
        }

        let field = |s: &str| {
            s.parse::<u8>()
                .map_err(|_| CdRomError::DiscLoadError(format!("invalid MSF timestamp '{}'", msf)))
        };

        Ok(CdromPosition {
            minute: field(parts[0])?,
            second: field(parts[1])?,
            frame: field(parts[2])?,
        })
    }
}

/// Track description parsed from a cue sheet, before the file is opened
struct TrackLayout {
    number: u8,
    track_type: TrackType,
    index_lba: u32,
}
