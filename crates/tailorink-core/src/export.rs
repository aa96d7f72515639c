//! Export of designs as downloadable artifacts.

use crate::config::{EditorConfig, PngNaming};
use crate::design::{Design, DesignAggregate};
use crate::scene::{SceneError, Surface, decode_data_url};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::SimpleFileOptions;

/// Fallback file stem when a design has no side.
const FALLBACK_NAME: &str = "design";

/// Name of the bundled archive.
pub const ZIP_NAME: &str = "designs.zip";

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Design {0} has an unreadable PNG render")]
    InvalidRender(String),
    #[error("No active design")]
    NoActiveDesign,
    #[error("Nothing to export")]
    NothingToExport,
}

/// A file ready to hand to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Destination for exported artifacts.
pub trait DownloadSink {
    fn deliver(&mut self, artifact: Artifact) -> Result<(), ExportError>;
}

/// Writes artifacts into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&mut self, artifact: Artifact) -> Result<(), ExportError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&artifact.name);
        std::fs::write(&path, &artifact.bytes)?;
        log::info!("Exported {} ({} bytes)", path.display(), artifact.bytes.len());
        Ok(())
    }
}

/// Collects artifacts in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub artifacts: Vec<Artifact>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&Artifact> {
        self.artifacts.last()
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&mut self, artifact: Artifact) -> Result<(), ExportError> {
        self.artifacts.push(artifact);
        Ok(())
    }
}

/// Builds export artifacts. Never mutates the aggregate.
#[derive(Debug, Clone)]
pub struct ExportPipeline {
    png_multiplier: u32,
    png_naming: PngNaming,
}

impl Default for ExportPipeline {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl ExportPipeline {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            png_multiplier: config.png_multiplier,
            png_naming: config.png_naming,
        }
    }

    /// The whole aggregate as one JSON file named `design`.
    pub fn design_json(&self, aggregate: &DesignAggregate) -> Result<Artifact, ExportError> {
        Ok(Artifact {
            name: FALLBACK_NAME.to_string(),
            mime: "application/json",
            bytes: serde_json::to_vec(aggregate)?,
        })
    }

    /// The active surface as SVG, named after the active design's side.
    pub fn svg(&self, surface: &dyn Surface, active: Option<&Design>) -> Artifact {
        let name = active
            .and_then(Design::side)
            .filter(|s| !s.is_empty())
            .unwrap_or(FALLBACK_NAME)
            .to_string();
        Artifact {
            name,
            mime: "image/svg+xml",
            bytes: surface.to_svg().into_bytes(),
        }
    }

    /// The active surface as a high-density PNG.
    pub fn png(
        &self,
        surface: &dyn Surface,
        active: Option<&Design>,
    ) -> Result<Artifact, ExportError> {
        Ok(Artifact {
            name: self.png_naming.file_name(active.and_then(Design::side)),
            mime: "image/png",
            bytes: surface.to_png(self.png_multiplier)?,
        })
    }

    /// Every design's stored renders bundled into one archive.
    ///
    /// Entries are `<n>_<side>.png` and `<n>_<side>.svg`, numbered from 1 in
    /// aggregate order. Designs without renders are skipped.
    pub fn zip(&self, aggregate: &DesignAggregate) -> Result<Artifact, ExportError> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        let mut entries = 0;

        for (index, design) in aggregate.designs().iter().enumerate() {
            let stem = format!("{}_{}", index + 1, design.side().unwrap_or(FALLBACK_NAME));
            if let Some(png) = &design.png_image {
                let bytes = decode_data_url(png)
                    .ok_or_else(|| ExportError::InvalidRender(design.id.clone()))?;
                writer.start_file(format!("{}.png", stem), options)?;
                writer.write_all(&bytes)?;
                entries += 1;
            }
            if let Some(svg) = &design.svg_image {
                writer.start_file(format!("{}.svg", stem), options)?;
                writer.write_all(svg.as_bytes())?;
                entries += 1;
            }
        }

        if entries == 0 {
            return Err(ExportError::NothingToExport);
        }
        let bytes = writer.finish()?.into_inner();
        Ok(Artifact {
            name: ZIP_NAME.to_string(),
            mime: "application/zip",
            bytes,
        })
    }

    pub fn download_design_json(
        &self,
        aggregate: &DesignAggregate,
        sink: &mut dyn DownloadSink,
    ) -> Result<(), ExportError> {
        sink.deliver(self.design_json(aggregate)?)
    }

    pub fn download_svg(
        &self,
        surface: &dyn Surface,
        aggregate: &DesignAggregate,
        sink: &mut dyn DownloadSink,
    ) -> Result<(), ExportError> {
        sink.deliver(self.svg(surface, aggregate.active()))
    }

    pub fn download_png(
        &self,
        surface: &dyn Surface,
        aggregate: &DesignAggregate,
        sink: &mut dyn DownloadSink,
    ) -> Result<(), ExportError> {
        sink.deliver(self.png(surface, aggregate.active())?)
    }

    pub fn download_zip(
        &self,
        aggregate: &DesignAggregate,
        sink: &mut dyn DownloadSink,
    ) -> Result<(), ExportError> {
        sink.deliver(self.zip(aggregate)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{Apparel, ApparelSide};
    use crate::scene::{SceneObject, SceneSurface, png_data_url};
    use kurbo::Size;
    use std::io::Read;

    fn surface() -> SceneSurface {
        let mut surface = SceneSurface::new(Size::new(20.0, 10.0));
        surface.add_object(SceneObject::rect(2.0, 2.0, 6.0, 6.0).with_fill("#0000ff"));
        surface
    }

    fn aggregate(side: Option<ApparelSide>) -> DesignAggregate {
        let mut aggregate = DesignAggregate::new();
        let mut apparel = Apparel::new("tee.png", ApparelSide::Front, 20.0, 10.0);
        apparel.side = side;
        aggregate.add_design(apparel);
        aggregate
    }

    #[test]
    fn test_svg_and_png_named_after_side() {
        let pipeline = ExportPipeline::default();
        let surface = surface();
        let aggregate = aggregate(Some(ApparelSide::Back));
        let mut sink = MemorySink::new();

        pipeline.download_svg(&surface, &aggregate, &mut sink).unwrap();
        pipeline.download_png(&surface, &aggregate, &mut sink).unwrap();

        assert_eq!(sink.artifacts[0].name, "back");
        assert_eq!(sink.artifacts[1].name, "back");
        assert_eq!(&sink.artifacts[1].bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_names_fall_back_without_side() {
        let pipeline = ExportPipeline::default();
        let surface = surface();
        let aggregate = aggregate(None);

        assert_eq!(pipeline.svg(&surface, aggregate.active()).name, "design");
        assert_eq!(pipeline.png(&surface, aggregate.active()).unwrap().name, "design.png");
        assert_eq!(pipeline.svg(&surface, None).name, "design");
    }

    #[test]
    fn test_png_with_extension_naming() {
        let config = EditorConfig {
            png_naming: PngNaming::WithExtension,
            ..EditorConfig::default()
        };
        let pipeline = ExportPipeline::from_config(&config);
        let aggregate = aggregate(Some(ApparelSide::LeftSleeve));
        let artifact = pipeline.png(&surface(), aggregate.active()).unwrap();
        assert_eq!(artifact.name, "leftsleeve.png");
    }

    #[test]
    fn test_png_density() {
        let pipeline = ExportPipeline::default();
        let artifact = pipeline.png(&surface(), None).unwrap();
        let decoder = png::Decoder::new(Cursor::new(artifact.bytes));
        let reader = decoder.read_info().unwrap();
        assert_eq!((reader.info().width, reader.info().height), (80, 40));
    }

    #[test]
    fn test_design_json_contains_every_design() {
        let mut aggregate = aggregate(Some(ApparelSide::Front));
        aggregate.add_design(Apparel::new("tee.png", ApparelSide::Back, 20.0, 10.0));
        let before = aggregate.clone();

        let artifact = ExportPipeline::default().design_json(&aggregate).unwrap();
        assert_eq!(artifact.name, "design");
        let parsed: Vec<Design> = serde_json::from_slice(&artifact.bytes).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(aggregate, before);
    }

    #[test]
    fn test_zip_bundles_renders() {
        let surface = surface();
        let png = surface.to_png(1).unwrap();
        let mut aggregate = aggregate(Some(ApparelSide::Front));
        aggregate.add_design(Apparel::new("tee.png", ApparelSide::Back, 20.0, 10.0));
        aggregate.add_design(Apparel::new("tee.png", ApparelSide::RightSleeve, 20.0, 10.0));
        let ids: Vec<String> = aggregate.designs().iter().map(|d| d.id.clone()).collect();
        for id in [&ids[0], &ids[2]] {
            let design = aggregate.get_mut(id).unwrap();
            design.png_image = Some(png_data_url(&png));
            design.svg_image = Some(surface.to_svg());
        }

        let artifact = ExportPipeline::default().zip(&aggregate).unwrap();
        assert_eq!(artifact.name, ZIP_NAME);

        let mut archive = zip::ZipArchive::new(Cursor::new(artifact.bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        let expected = vec![
            "1_front.png",
            "1_front.svg",
            "3_rightsleeve.png",
            "3_rightsleeve.svg",
        ];
        assert_eq!(names, expected);

        let mut bytes = Vec::new();
        archive.by_name("1_front.png").unwrap().read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, png);
    }

    #[test]
    fn test_zip_without_renders() {
        let aggregate = aggregate(Some(ApparelSide::Front));
        let result = ExportPipeline::default().zip(&aggregate);
        assert!(matches!(result, Err(ExportError::NothingToExport)));
    }

    #[test]
    fn test_directory_sink() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("out"));
        let aggregate = aggregate(Some(ApparelSide::Front));
        ExportPipeline::default().download_svg(&surface(), &aggregate, &mut sink).unwrap();

        let written = std::fs::read_to_string(dir.path().join("out").join("front")).unwrap();
        assert!(written.starts_with("<svg"));
    }
}
