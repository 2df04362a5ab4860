//! Dump archive fixtures
//!
//! Builds small tar archives in a temp directory, laid out like a
//! MusicBrainz dump, together with a sought-key CSV.

use anyhow::Result;
use mbmap_resolver::ResolverConfig;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Container compression for a fixture archive
#[derive(Debug, Clone, Copy)]
pub enum Compression {
    Bzip2,
    Gzip,
    None,
}

fn append_members<W: Write>(builder: &mut tar::Builder<W>, members: &[(&str, &str)]) -> Result<()> {
    for (name, data) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data.as_bytes())?;
    }
    Ok(())
}

/// Write a bzip2-compressed tar holding `(name, content)` members
pub fn write_bz2_archive(path: &Path, members: &[(&str, &str)]) -> Result<()> {
    let encoder = bzip2::write::BzEncoder::new(File::create(path)?, bzip2::Compression::fast());
    let mut builder = tar::Builder::new(encoder);
    append_members(&mut builder, members)?;
    builder.into_inner()?.finish()?.flush()?;
    Ok(())
}

/// Write a gzip-compressed tar holding `(name, content)` members
pub fn write_gz_archive(path: &Path, members: &[(&str, &str)]) -> Result<()> {
    let encoder = flate2::write::GzEncoder::new(File::create(path)?, flate2::Compression::fast());
    let mut builder = tar::Builder::new(encoder);
    append_members(&mut builder, members)?;
    builder.into_inner()?.finish()?.flush()?;
    Ok(())
}

fn write_plain_archive(path: &Path, members: &[(&str, &str)]) -> Result<()> {
    let mut builder = tar::Builder::new(File::create(path)?);
    append_members(&mut builder, members)?;
    builder.into_inner()?.flush()?;
    Ok(())
}

/// Archive, sought-key file and output location in one temp directory
///
/// The TempDir must be kept alive for the duration of the test.
pub struct DumpFixture {
    pub dir: TempDir,
    pub archive_path: PathBuf,
    pub sought_keys_path: PathBuf,
    pub output_path: PathBuf,
}

impl DumpFixture {
    /// Fixture with the standard `mbdump/recording_isrc` and `mbdump/recording` members
    pub fn new(alias: &str, canonical: &str, sought_isrcs: &[&str]) -> Result<Self> {
        Self::with_members(
            Compression::Bzip2,
            &[
                ("mbdump/recording_isrc", alias),
                ("mbdump/recording", canonical),
            ],
            sought_isrcs,
        )
    }

    pub fn with_members(
        compression: Compression,
        members: &[(&str, &str)],
        sought_isrcs: &[&str],
    ) -> Result<Self> {
        let dir = TempDir::new()?;
        let archive_path = dir.path().join("mbdump.tar.bz2");
        match compression {
            Compression::Bzip2 => write_bz2_archive(&archive_path, members)?,
            Compression::Gzip => write_gz_archive(&archive_path, members)?,
            Compression::None => write_plain_archive(&archive_path, members)?,
        }

        let sought_keys_path = dir.path().join("reccobeats_audio_features.csv");
        let mut csv = String::from("id,isrc,energy\n");
        for (i, isrc) in sought_isrcs.iter().enumerate() {
            csv.push_str(&format!("track{},{},0.5\n", i, isrc));
        }
        fs::write(&sought_keys_path, csv)?;

        let output_path = dir.path().join("isrc_to_mbid_map.csv");
        Ok(Self {
            dir,
            archive_path,
            sought_keys_path,
            output_path,
        })
    }

    pub fn config(&self) -> ResolverConfig {
        ResolverConfig::new(&self.archive_path, &self.sought_keys_path, &self.output_path)
            .expect("compiled default selectors parse")
    }

    pub fn output(&self) -> String {
        fs::read_to_string(&self.output_path).expect("output artifact exists")
    }
}
