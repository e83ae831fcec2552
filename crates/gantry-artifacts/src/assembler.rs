//! Artifact assembler
//!
//! Turns the build outputs and symbol archive of one variant into a
//! publication: binary bundle, optional header/source/doc bundles, the
//! symbols bundle and the metadata descriptor.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use gantry_core::config::Config;
use gantry_core::{
    Artifact, AssemblyError, BuildOutput, Classifier, Coordinates, Publication,
    PublicationMetadata, ResolvedVariant, SymbolArchive,
};

use crate::archive::{list_files, ArchiveWriter};
use crate::pom::render_pom;

/// Options for assembly
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    /// Root of generated files; bundles go to `<output_dir>/dist/<variant>/`
    pub output_dir: PathBuf,
    /// Publication group
    pub group: String,
    /// File name of the binary inside each target directory
    pub binary_name: String,
    /// Header directory
    pub headers: Option<PathBuf>,
    /// Source directories
    pub sources: Vec<PathBuf>,
    /// Documentation directory
    pub docs: Option<PathBuf>,
    /// Fail when no sources bundle can be produced
    pub require_sources: bool,
    /// Fail when no docs bundle can be produced
    pub require_docs: bool,
}

impl AssemblyOptions {
    /// Options from configuration; relative paths resolve against `root`
    pub fn from_config(config: &Config, root: &Path, output_dir: &Path) -> Self {
        let library = &config.library;
        Self {
            output_dir: output_dir.to_path_buf(),
            group: library.group.clone(),
            binary_name: library.binary_name.clone(),
            headers: library.headers.as_ref().map(|p| root.join(p)),
            sources: library.sources.iter().map(|p| root.join(p)).collect(),
            docs: library.docs.as_ref().map(|p| root.join(p)),
            require_sources: config.assembly.require_sources,
            require_docs: config.assembly.require_docs,
        }
    }
}

/// Assembles publications
pub struct Assembler {
    options: AssemblyOptions,
}

impl Assembler {
    /// Create an assembler
    pub fn new(options: AssemblyOptions) -> Self {
        Self { options }
    }

    /// Directory holding a variant's bundles
    pub fn dist_dir(&self, variant: &str) -> PathBuf {
        self.options.output_dir.join("dist").join(variant)
    }

    /// Assemble the publication for one variant
    #[instrument(skip_all, fields(variant = %variant.name))]
    pub fn assemble(
        &self,
        variant: &ResolvedVariant,
        outputs: &[BuildOutput],
        symbols: Option<&SymbolArchive>,
        metadata: &PublicationMetadata,
    ) -> Result<Publication, AssemblyError> {
        if outputs.is_empty() {
            return Err(AssemblyError::NoBinaries(variant.name.clone()));
        }

        let mut seen = HashSet::new();
        for output in outputs {
            if !seen.insert(output.target) {
                return Err(AssemblyError::DuplicateOutput {
                    variant: variant.name.clone(),
                    target: output.target.to_string(),
                });
            }
        }

        let dist = self.dist_dir(&variant.name);
        if dist.exists() {
            std::fs::remove_dir_all(&dist)?;
        }
        std::fs::create_dir_all(&dist)?;

        let coordinates = Coordinates::new(
            &self.options.group,
            &variant.artifact_id,
            &variant.version,
        );

        let mut artifacts = vec![self.binary_bundle(&dist, &coordinates, metadata, outputs)?];

        if let Some(headers) = self.headers_bundle(&dist, &coordinates)? {
            artifacts.push(headers);
        }

        match self.sources_bundle(&dist, &coordinates)? {
            Ok(sources) => artifacts.push(sources),
            Err(reason) if self.options.require_sources => {
                return Err(missing(variant, "sources", reason));
            }
            Err(reason) => debug!(reason = %reason, "sources bundle skipped"),
        }

        match self.docs_bundle(&dist, &coordinates)? {
            Ok(docs) => artifacts.push(docs),
            Err(reason) if self.options.require_docs => {
                return Err(missing(variant, "docs", reason));
            }
            Err(reason) => debug!(reason = %reason, "docs bundle skipped"),
        }

        if let Some(archive) = symbols {
            let path = dist.join(coordinates.file_name(Some("symbols"), "jar"));
            std::fs::copy(&archive.path, &path)?;
            artifacts.push(Artifact::from_file(Classifier::Symbols, "jar", path)?);
        }

        let descriptor_path = dist.join(coordinates.file_name(None, "pom"));
        std::fs::write(&descriptor_path, render_pom(&coordinates, metadata))?;
        let descriptor = Artifact::from_file(Classifier::Descriptor, "pom", descriptor_path)?;

        info!(
            coordinates = %coordinates,
            artifacts = artifacts.len(),
            dir = %dist.display(),
            "publication assembled"
        );

        Ok(Publication {
            variant: variant.name.clone(),
            coordinates,
            metadata: metadata.clone(),
            artifacts,
            descriptor,
            signatures: Vec::new(),
            descriptor_signature: None,
        })
    }

    fn binary_bundle(
        &self,
        dist: &Path,
        coordinates: &Coordinates,
        metadata: &PublicationMetadata,
        outputs: &[BuildOutput],
    ) -> Result<Artifact, AssemblyError> {
        let path = dist.join(coordinates.file_name(None, &metadata.packaging));
        let mut sorted: Vec<&BuildOutput> = outputs.iter().collect();
        sorted.sort_by_key(|o| o.target);

        let mut writer = ArchiveWriter::create(&path)?;
        for output in sorted {
            let name = format!("lib/{}/{}", output.target, self.options.binary_name);
            writer.add_file(&name, &output.binary)?;
        }
        writer.finish()?;

        Ok(Artifact::from_file(
            Classifier::Binary,
            metadata.packaging.clone(),
            path,
        )?)
    }

    fn headers_bundle(
        &self,
        dist: &Path,
        coordinates: &Coordinates,
    ) -> Result<Option<Artifact>, AssemblyError> {
        let Some(dir) = self.options.headers.as_deref() else {
            return Ok(None);
        };
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "header directory missing, skipping");
            return Ok(None);
        }

        let bundle = self.bundle(
            dist,
            coordinates,
            Classifier::Headers,
            &[(String::from("include/"), dir.to_path_buf())],
        )?;
        Ok(bundle.ok())
    }

    fn sources_bundle(
        &self,
        dist: &Path,
        coordinates: &Coordinates,
    ) -> Result<Result<Artifact, String>, AssemblyError> {
        if self.options.sources.is_empty() {
            return Ok(Err("no source directories configured".to_string()));
        }

        let mut roots = Vec::new();
        for dir in &self.options.sources {
            if dir.is_dir() {
                roots.push((String::new(), dir.clone()));
            } else {
                debug!(dir = %dir.display(), "source directory missing");
            }
        }
        if roots.is_empty() {
            return Ok(Err("no configured source directory exists".to_string()));
        }

        self.bundle(dist, coordinates, Classifier::Sources, &roots)
    }

    fn docs_bundle(
        &self,
        dist: &Path,
        coordinates: &Coordinates,
    ) -> Result<Result<Artifact, String>, AssemblyError> {
        let Some(dir) = self.options.docs.as_deref() else {
            return Ok(Err("no documentation directory configured".to_string()));
        };
        if !dir.is_dir() {
            return Ok(Err(format!("{} does not exist", dir.display())));
        }

        self.bundle(
            dist,
            coordinates,
            Classifier::Docs,
            &[(String::new(), dir.to_path_buf())],
        )
    }

    /// Jar the given directories; an empty result yields `Err(reason)`
    fn bundle(
        &self,
        dist: &Path,
        coordinates: &Coordinates,
        classifier: Classifier,
        roots: &[(String, PathBuf)],
    ) -> Result<Result<Artifact, String>, AssemblyError> {
        let mut files = Vec::new();
        for (prefix, dir) in roots {
            for (relative, path) in list_files(dir)? {
                files.push((format!("{}{}", prefix, relative), path));
            }
        }
        if files.is_empty() {
            return Ok(Err(format!("no {} files found", classifier)));
        }

        let path = dist.join(coordinates.file_name(classifier.repository_classifier(), "jar"));
        let mut writer = ArchiveWriter::create(&path)?;
        for (name, source) in &files {
            writer.add_file(name, source)?;
        }
        writer.finish()?;

        Ok(Ok(Artifact::from_file(classifier, "jar", path)?))
    }
}

fn missing(variant: &ResolvedVariant, bundle: &str, reason: String) -> AssemblyError {
    AssemblyError::MissingBundle {
        variant: variant.name.clone(),
        bundle: bundle.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::config::LibraryConfig;
    use gantry_core::{Linkage, Target};
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let root = temp.path();
            std::fs::create_dir_all(root.join("jni/include")).unwrap();
            std::fs::write(root.join("jni/include/native.hpp"), "#pragma once").unwrap();
            std::fs::write(root.join("jni/native.cc"), "int x;").unwrap();
            Self { temp }
        }

        fn root(&self) -> &Path {
            self.temp.path()
        }

        fn options(&self) -> AssemblyOptions {
            AssemblyOptions {
                output_dir: self.root().join("out"),
                group: "org.example".to_string(),
                binary_name: "libnative.so".to_string(),
                headers: Some(self.root().join("jni/include")),
                sources: vec![self.root().join("jni")],
                docs: None,
                require_sources: false,
                require_docs: false,
            }
        }

        fn outputs(&self, targets: &[Target]) -> Vec<BuildOutput> {
            targets
                .iter()
                .map(|&target| {
                    let dir = self.root().join("out/native/release").join(target.as_str());
                    std::fs::create_dir_all(&dir).unwrap();
                    let binary = dir.join("libnative.so");
                    std::fs::write(&binary, target.as_str()).unwrap();
                    BuildOutput {
                        variant: "release".to_string(),
                        target,
                        binary,
                        symbols: None,
                    }
                })
                .collect()
        }
    }

    fn variant() -> ResolvedVariant {
        ResolvedVariant {
            name: "release".to_string(),
            parent: None,
            flags: Vec::new(),
            linkage: Linkage::Shared,
            targets: Target::ALL.to_vec(),
            artifact_id: "native".to_string(),
            version: "4.2".to_string(),
            publish: true,
            build_dependencies: Vec::new(),
        }
    }

    fn metadata() -> PublicationMetadata {
        PublicationMetadata::from(&LibraryConfig::default())
    }

    fn zip_entries(path: &Path) -> Vec<String> {
        let archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(|s| s.to_string()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_assemble_full_publication() {
        let fixture = Fixture::new();
        let assembler = Assembler::new(fixture.options());
        let outputs = fixture.outputs(&[Target::X86_64, Target::Arm64V8a]);

        let publication = assembler
            .assemble(&variant(), &outputs, None, &metadata())
            .unwrap();

        let classifiers: Vec<Classifier> =
            publication.artifacts.iter().map(|a| a.classifier).collect();
        assert_eq!(
            classifiers,
            vec![Classifier::Binary, Classifier::Headers, Classifier::Sources]
        );

        let binary = &publication.artifacts[0];
        assert!(binary.path.ends_with("dist/release/native-4.2.zip"));
        assert_eq!(
            zip_entries(&binary.path),
            vec!["lib/arm64-v8a/libnative.so", "lib/x86_64/libnative.so"]
        );
        assert_eq!(
            zip_entries(&publication.artifacts[1].path),
            vec!["include/native.hpp"]
        );
        assert!(publication.descriptor.path.ends_with("native-4.2.pom"));
        assert_eq!(publication.coordinates.to_string(), "org.example:native:4.2");
        assert_eq!(binary.sha256.len(), 64);
    }

    #[test]
    fn test_symbols_bundle() {
        let fixture = Fixture::new();
        let assembler = Assembler::new(fixture.options());
        let outputs = fixture.outputs(&[Target::X86]);

        let archive_path = fixture.root().join("symbols.zip");
        let mut writer = ArchiveWriter::create(&archive_path).unwrap();
        writer.add_bytes("x86/libnative.so", b"debug").unwrap();
        let entries = writer.finish().unwrap();
        let symbols = SymbolArchive {
            variant: "release".to_string(),
            path: archive_path,
            entries,
        };

        let publication = assembler
            .assemble(&variant(), &outputs, Some(&symbols), &metadata())
            .unwrap();
        let last = publication.artifacts.last().unwrap();
        assert_eq!(last.classifier, Classifier::Symbols);
        assert!(last.path.ends_with("native-4.2-symbols.jar"));
        assert_eq!(zip_entries(&last.path), vec!["x86/libnative.so"]);
    }

    #[test]
    fn test_no_binaries() {
        let fixture = Fixture::new();
        let assembler = Assembler::new(fixture.options());

        assert!(matches!(
            assembler.assemble(&variant(), &[], None, &metadata()),
            Err(AssemblyError::NoBinaries(_))
        ));
    }

    #[test]
    fn test_duplicate_outputs() {
        let fixture = Fixture::new();
        let assembler = Assembler::new(fixture.options());
        let mut outputs = fixture.outputs(&[Target::X86]);
        outputs.push(outputs[0].clone());

        assert!(matches!(
            assembler.assemble(&variant(), &outputs, None, &metadata()),
            Err(AssemblyError::DuplicateOutput { .. })
        ));
    }

    #[test]
    fn test_required_docs_missing() {
        let fixture = Fixture::new();
        let mut options = fixture.options();
        options.require_docs = true;
        let assembler = Assembler::new(options);
        let outputs = fixture.outputs(&[Target::X86]);

        match assembler.assemble(&variant(), &outputs, None, &metadata()) {
            Err(AssemblyError::MissingBundle { bundle, .. }) => assert_eq!(bundle, "docs"),
            other => panic!("expected missing docs bundle, got {:?}", other),
        }
    }

    #[test]
    fn test_required_sources_empty_dir() {
        let fixture = Fixture::new();
        let empty = fixture.root().join("empty");
        std::fs::create_dir_all(&empty).unwrap();

        let mut options = fixture.options();
        options.sources = vec![empty];
        options.require_sources = true;
        let assembler = Assembler::new(options);
        let outputs = fixture.outputs(&[Target::X86]);

        assert!(matches!(
            assembler.assemble(&variant(), &outputs, None, &metadata()),
            Err(AssemblyError::MissingBundle { .. })
        ));
    }

    #[test]
    fn test_docs_bundle_uses_javadoc_classifier() {
        let fixture = Fixture::new();
        let docs = fixture.root().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("index.html"), "<html/>").unwrap();

        let mut options = fixture.options();
        options.docs = Some(docs);
        let assembler = Assembler::new(options);
        let outputs = fixture.outputs(&[Target::X86]);

        let publication = assembler
            .assemble(&variant(), &outputs, None, &metadata())
            .unwrap();
        let docs = publication
            .artifacts
            .iter()
            .find(|a| a.classifier == Classifier::Docs)
            .unwrap();
        assert!(docs.path.ends_with("native-4.2-javadoc.jar"));
    }
}
