//! db-export - DreamBox asset export tool
//!
//! Converts glTF/GLB scenes to DreamBox binary assets (.dbm meshes and
//! per-clip .dba animations).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use db_export::formats::{AnimationFile, DBA_MAGIC, DBM_MAGIC, MeshFile, TrackValues};
use db_export::loader::{DEFAULT_FRAME_RATE, load_gltf};
use db_export::{ExportConfig, PoseSampler, export_scene};

#[derive(Parser)]
#[command(name = "db-export")]
#[command(about = "DreamBox asset export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a glTF/GLB scene to .dbm (+ one .dba per animation)
    Export {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Output .dbm file (animations are written next to it)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export settings (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write meshes without bone weights and omit the skeleton
        #[arg(long)]
        no_skinning: bool,

        /// Do not write animation files
        #[arg(long)]
        no_tracks: bool,

        /// Animation sampling rate (frames per second)
        #[arg(short, long)]
        resample: Option<u32>,

        /// Frame rate glTF animation time is sampled at (default: 30)
        #[arg(short, long)]
        frame_rate: Option<f32>,
    },

    /// Print the contents of a .dbm or .dba file
    Inspect {
        /// Input .dbm/.dba file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            output,
            config,
            no_skinning,
            no_tracks,
            resample,
            frame_rate,
        } => {
            let mut settings = match config {
                Some(path) => ExportConfig::load(&path)?,
                None => ExportConfig::default(),
            };
            if no_skinning {
                settings.export_skinning = false;
            }
            if no_tracks {
                settings.export_tracks = false;
            }
            if let Some(rate) = resample {
                settings.resample_framerate = rate;
            }
            settings.validate()?;

            let frame_rate = frame_rate.unwrap_or(DEFAULT_FRAME_RATE);
            if !frame_rate.is_finite() || frame_rate <= 0.0 {
                anyhow::bail!("Frame rate must be positive (got {frame_rate})");
            }

            let output = output.unwrap_or_else(|| input.with_extension("dbm"));
            tracing::info!("Converting {:?} -> {:?}", input, output);

            let mut loaded = load_gltf(&input, frame_rate)?;
            let sampler: &mut dyn PoseSampler = &mut loaded.sampler;
            let report = export_scene(&loaded.scene, Some(sampler), &settings, &output)?;

            if !report.warnings.is_empty() {
                tracing::warn!("{} warning(s) during export", report.warnings.len());
            }
            tracing::info!(
                "Done! {} triangles, {} bones, {} animation file(s)",
                report.triangle_count,
                report.bone_count,
                report.animation_paths.len()
            );
        }

        Commands::Inspect { file } => inspect(&file)?,
    }

    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let magic: [u8; 4] = data
        .get(0..4)
        .and_then(|m| m.try_into().ok())
        .with_context(|| format!("{:?} is too short to be a DreamBox asset", path))?;

    if magic == DBM_MAGIC {
        let file = MeshFile::from_bytes(&data).with_context(|| format!("Invalid mesh file {:?}", path))?;
        tracing::info!("{:?}: mesh file, {} bones, {} meshes", path, file.bone_count(), file.meshes.len());
        if let Some(bones) = &file.skeleton {
            for bone in bones {
                tracing::info!("  bone {:3}: {} children", bone.bone_index, bone.child_count);
            }
        }
        for mesh in &file.meshes {
            let header = &mesh.header;
            tracing::info!(
                "  mesh '{}': {} triangles, material '{}', translation {:?}",
                header.name(),
                header.triangle_count,
                header.material.name(),
                header.translation
            );
        }
    } else if magic == DBA_MAGIC {
        let file =
            AnimationFile::from_bytes(&data).with_context(|| format!("Invalid animation file {:?}", path))?;
        tracing::info!("{:?}: animation file, {} tracks, {:.3}s", path, file.tracks.len(), file.duration());
        for track in &file.tracks {
            let kind = match track.values {
                TrackValues::Vec3(_) => "vec3",
                TrackValues::Quat(_) => "quat",
            };
            tracing::info!(
                "  bone {:3} {:?} ({}): {} keys",
                track.bone_index,
                track.binding,
                kind,
                track.values.len()
            );
        }
    } else {
        anyhow::bail!("{:?} is not a .dbm or .dba file (magic {:?})", path, magic);
    }
    Ok(())
}
