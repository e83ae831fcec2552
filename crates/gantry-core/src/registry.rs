//! Variant and target registry
//!
//! Holds the validated build matrix: the fixed set of target architectures
//! and the open-ended set of variants with their inheritance chains.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Config, LinkageConfig, VariantConfig};
use crate::error::ConfigError;

/// Hardware architecture a binary is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Target {
    /// 64-bit ARM
    #[serde(rename = "arm64-v8a")]
    Arm64V8a,
    /// 32-bit ARM
    #[serde(rename = "armeabi-v7a")]
    ArmeabiV7a,
    /// 32-bit x86
    #[serde(rename = "x86")]
    X86,
    /// 64-bit x86
    #[serde(rename = "x86_64")]
    X86_64,
}

impl Target {
    /// Every supported target, in canonical order
    pub const ALL: [Target; 4] = [
        Target::Arm64V8a,
        Target::ArmeabiV7a,
        Target::X86,
        Target::X86_64,
    ];

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Arm64V8a => "arm64-v8a",
            Target::ArmeabiV7a => "armeabi-v7a",
            Target::X86 => "x86",
            Target::X86_64 => "x86_64",
        }
    }

    fn supported() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownTarget {
                name: s.to_string(),
                supported: Self::supported(),
            })
    }
}

/// Runtime linkage mode of a variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Link against the shared runtime
    #[default]
    Shared,
    /// Carry no shared runtime dependency
    Static,
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Linkage::Shared => f.write_str("shared"),
            Linkage::Static => f.write_str("static"),
        }
    }
}

/// A variant with its inheritance chain flattened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVariant {
    /// Variant name
    pub name: String,
    /// Parent variant, if any
    pub parent: Option<String>,
    /// Ordered compiler/linker flags
    pub flags: Vec<String>,
    /// Effective runtime linkage
    pub linkage: Linkage,
    /// Targets to build, in registry order
    pub targets: Vec<Target>,
    /// Publication artifact id
    pub artifact_id: String,
    /// Publication version
    pub version: String,
    /// Whether the variant is published
    pub publish: bool,
    /// Build-time dependency coordinates
    pub build_dependencies: Vec<String>,
}

fn variant_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("valid regex"))
}

fn coordinate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_.-]+:[A-Za-z0-9_.-]+:[A-Za-z0-9_.+-]+$").expect("valid regex")
    })
}

/// Validated registry of variants and targets
#[derive(Debug, Clone)]
pub struct VariantRegistry {
    variants: Vec<VariantConfig>,
    index: HashMap<String, usize>,
    targets: Vec<Target>,
    common_flags: Vec<String>,
    linkage: LinkageConfig,
    artifact_id: String,
    version: String,
}

impl VariantRegistry {
    /// Build and validate the registry from configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let targets = parse_target_set(&config.targets, "targets")?;
        if targets.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "targets".to_string(),
                message: "at least one target must be enabled".to_string(),
            });
        }

        if config.variants.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "variants".to_string(),
                message: "at least one variant must be declared".to_string(),
            });
        }

        let mut index = HashMap::new();
        for (i, variant) in config.variants.iter().enumerate() {
            if !variant_name_regex().is_match(&variant.name) {
                return Err(ConfigError::InvalidValue {
                    field: "variants.name".to_string(),
                    message: format!(
                        "'{}' must start with a letter or digit and contain only letters, digits, '.', '_' or '-'",
                        variant.name
                    ),
                });
            }
            if index.insert(variant.name.clone(), i).is_some() {
                return Err(ConfigError::DuplicateVariant(variant.name.clone()));
            }
        }

        let registry = Self {
            variants: config.variants.clone(),
            index,
            targets,
            common_flags: config.flags.common.clone(),
            linkage: config.linkage.clone(),
            artifact_id: config.library.artifact_id.clone(),
            version: config.library.version.clone(),
        };

        for variant in &registry.variants {
            if let Some(parent) = &variant.parent {
                if !registry.index.contains_key(parent) {
                    return Err(ConfigError::UnknownParent {
                        variant: variant.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        for variant in &registry.variants {
            registry.chain(&variant.name)?;

            if let Some(subset) = &variant.targets {
                let field = format!("variants.{}.targets", variant.name);
                for target in parse_target_set(subset, &field)? {
                    if !registry.targets.contains(&target) {
                        return Err(ConfigError::TargetNotEnabled {
                            variant: variant.name.clone(),
                            target: target.to_string(),
                        });
                    }
                }
            }

            for coordinate in &variant.build_dependencies {
                if !coordinate_regex().is_match(coordinate) {
                    return Err(ConfigError::InvalidValue {
                        field: format!("variants.{}.build_dependencies", variant.name),
                        message: format!("'{}' is not a group:artifact:version coordinate", coordinate),
                    });
                }
            }
        }

        debug!(
            variants = registry.variants.len(),
            targets = registry.targets.len(),
            "variant registry built"
        );
        Ok(registry)
    }

    /// Registered variant names, in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.variants.iter().map(|v| v.name.as_str()).collect()
    }

    /// Enabled targets, in registry order
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Number of registered variants
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Whether no variants are registered
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Look up a variant declaration
    pub fn get(&self, name: &str) -> Option<&VariantConfig> {
        self.index.get(name).map(|&i| &self.variants[i])
    }

    /// First declared variant without a parent; it publishes under the
    /// library's own artifact id
    fn primary(&self) -> Option<&str> {
        self.variants
            .iter()
            .find(|v| v.parent.is_none())
            .map(|v| v.name.as_str())
    }

    /// Inheritance chain from the root ancestor down to `name`
    fn chain(&self, name: &str) -> Result<Vec<&VariantConfig>, ConfigError> {
        let mut chain: Vec<&VariantConfig> = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(name);

        while let Some(n) = current {
            let variant = self
                .get(n)
                .ok_or_else(|| ConfigError::UnknownVariant(n.to_string()))?;

            if !seen.insert(n) {
                let mut path: Vec<&str> = chain.iter().map(|v| v.name.as_str()).collect();
                path.push(n);
                return Err(ConfigError::InheritanceCycle(path.join(" -> ")));
            }

            chain.push(variant);
            current = variant.parent.as_deref();
        }

        chain.reverse();
        Ok(chain)
    }

    /// Ordered flags for a variant.
    ///
    /// Common flags come first, then for every level from the root ancestor
    /// down to the variant: the level's own flags followed by the flags of the
    /// linkage mode it declares. The root contributes `shared` linkage flags
    /// when it declares none. Flags are never deduplicated.
    pub fn resolve_flags(&self, name: &str) -> Result<Vec<String>, ConfigError> {
        let chain = self.chain(name)?;
        let mut flags = self.common_flags.clone();

        for (depth, level) in chain.iter().enumerate() {
            flags.extend(level.flags.iter().cloned());

            let linkage = match (level.linkage, depth) {
                (Some(linkage), _) => Some(linkage),
                (None, 0) => Some(Linkage::Shared),
                (None, _) => None,
            };
            if let Some(linkage) = linkage {
                flags.extend(self.linkage.flags_for(linkage).iter().cloned());
            }
        }

        Ok(flags)
    }

    /// Flatten a variant's inheritance chain
    pub fn resolve(&self, name: &str) -> Result<ResolvedVariant, ConfigError> {
        let chain = self.chain(name)?;
        let flags = self.resolve_flags(name)?;

        let own = chain
            .last()
            .copied()
            .ok_or_else(|| ConfigError::UnknownVariant(name.to_string()))?;

        let linkage = chain
            .iter()
            .rev()
            .find_map(|v| v.linkage)
            .unwrap_or_default();

        let targets = match chain.iter().rev().find_map(|v| v.targets.as_ref()) {
            Some(subset) => {
                let subset = parse_target_set(subset, "targets")?;
                self.targets
                    .iter()
                    .copied()
                    .filter(|t| subset.contains(t))
                    .collect()
            }
            None => self.targets.clone(),
        };

        let version = chain
            .iter()
            .rev()
            .find_map(|v| v.version.clone())
            .unwrap_or_else(|| self.version.clone());

        let artifact_id = match &own.artifact_id {
            Some(id) => id.clone(),
            None if self.primary() == Some(own.name.as_str()) => self.artifact_id.clone(),
            None => format!("{}-{}", self.artifact_id, own.name),
        };

        let build_dependencies = chain
            .iter()
            .flat_map(|v| v.build_dependencies.iter().cloned())
            .collect();

        Ok(ResolvedVariant {
            name: own.name.clone(),
            parent: own.parent.clone(),
            flags,
            linkage,
            targets,
            artifact_id,
            version,
            publish: own.publish,
            build_dependencies,
        })
    }

    /// Resolve every registered variant
    pub fn resolve_all(&self) -> Result<Vec<ResolvedVariant>, ConfigError> {
        self.variants.iter().map(|v| self.resolve(&v.name)).collect()
    }

    /// Apply a variant/target selection.
    ///
    /// Empty selections mean "everything". Variants keep registry order and
    /// their targets are narrowed to the requested ones. An explicitly
    /// requested variant that ends up with no targets is an error.
    pub fn select(
        &self,
        variants: &[String],
        targets: &[String],
    ) -> Result<Vec<ResolvedVariant>, ConfigError> {
        for name in variants {
            if !self.index.contains_key(name) {
                return Err(ConfigError::UnknownVariant(name.clone()));
            }
        }

        let requested_targets = parse_target_set(targets, "targets")?;
        for target in &requested_targets {
            if !self.targets.contains(target) {
                return Err(ConfigError::TargetNotEnabled {
                    variant: "*".to_string(),
                    target: target.to_string(),
                });
            }
        }

        let mut selected = Vec::new();
        for declared in &self.variants {
            let explicit = variants.contains(&declared.name);
            if !variants.is_empty() && !explicit {
                continue;
            }

            let mut resolved = self.resolve(&declared.name)?;
            if !requested_targets.is_empty() {
                resolved.targets.retain(|t| requested_targets.contains(t));
            }

            if resolved.targets.is_empty() {
                if explicit {
                    return Err(ConfigError::TargetNotEnabled {
                        variant: resolved.name,
                        target: targets.join(", "),
                    });
                }
                debug!(variant = %resolved.name, "no selected targets, skipping variant");
                continue;
            }

            selected.push(resolved);
        }

        debug!(selected = selected.len(), "variant selection applied");
        Ok(selected)
    }
}

fn parse_target_set(names: &[String], field: &str) -> Result<Vec<Target>, ConfigError> {
    let mut targets = Vec::with_capacity(names.len());
    for name in names {
        let target: Target = name.parse()?;
        if targets.contains(&target) {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: format!("target '{}' is listed more than once", name),
            });
        }
        targets.push(target);
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn config_with(variants: Vec<VariantConfig>) -> Config {
        let mut config = Config::default();
        config.flags.common = strings(&["-Wall"]);
        config.linkage.shared = strings(&["-DSTL=shared"]);
        config.linkage.static_ = strings(&["-DSTL=none"]);
        config.library.artifact_id = "native".to_string();
        config.library.version = "4.2".to_string();
        config.variants = variants;
        config
    }

    #[test]
    fn test_target_parse() {
        assert_eq!("arm64-v8a".parse::<Target>().unwrap(), Target::Arm64V8a);
        assert_eq!("x86_64".parse::<Target>().unwrap(), Target::X86_64);

        let err = "mips".parse::<Target>().unwrap_err();
        assert!(err.to_string().contains("arm64-v8a, armeabi-v7a, x86, x86_64"));
    }

    #[test]
    fn test_resolve_flags_order() {
        let config = config_with(vec![
            VariantConfig::new("release").with_flags(["-Oz", "-DNDEBUG"]),
            VariantConfig::new("standalone")
                .with_parent("release")
                .with_linkage(Linkage::Static),
        ]);
        let registry = VariantRegistry::from_config(&config).unwrap();

        assert_eq!(
            registry.resolve_flags("release").unwrap(),
            strings(&["-Wall", "-Oz", "-DNDEBUG", "-DSTL=shared"])
        );
        assert_eq!(
            registry.resolve_flags("standalone").unwrap(),
            strings(&["-Wall", "-Oz", "-DNDEBUG", "-DSTL=shared", "-DSTL=none"])
        );
    }

    #[test]
    fn test_resolve_flags_deterministic() {
        let registry = VariantRegistry::from_config(&Config::default()).unwrap();
        let first = registry.resolve_flags("standalone").unwrap();
        let second = registry.resolve_flags("standalone").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_inheritance_is_additive() {
        let config = config_with(vec![
            VariantConfig::new("release").with_flags(["-O2"]),
            VariantConfig::new("minimal")
                .with_parent("release")
                .with_flags(["-DMINIMAL"]),
            VariantConfig::new("tiny")
                .with_parent("minimal")
                .with_flags(["-Oz"])
                .with_linkage(Linkage::Static),
        ]);
        let registry = VariantRegistry::from_config(&config).unwrap();

        for (parent, child) in [("release", "minimal"), ("minimal", "tiny")] {
            let parent_flags = registry.resolve_flags(parent).unwrap();
            let child_flags = registry.resolve_flags(child).unwrap();
            assert!(child_flags.len() >= parent_flags.len());
            assert_eq!(&child_flags[..parent_flags.len()], parent_flags.as_slice());
        }
    }

    #[test]
    fn test_duplicate_variant() {
        let config = config_with(vec![
            VariantConfig::new("release"),
            VariantConfig::new("release"),
        ]);
        assert!(matches!(
            VariantRegistry::from_config(&config),
            Err(ConfigError::DuplicateVariant(name)) if name == "release"
        ));
    }

    #[test]
    fn test_unknown_parent() {
        let config = config_with(vec![VariantConfig::new("standalone").with_parent("release")]);
        assert!(matches!(
            VariantRegistry::from_config(&config),
            Err(ConfigError::UnknownParent { .. })
        ));
    }

    #[test]
    fn test_inheritance_cycle() {
        let config = config_with(vec![
            VariantConfig::new("a").with_parent("b"),
            VariantConfig::new("b").with_parent("a"),
        ]);
        match VariantRegistry::from_config(&config) {
            Err(ConfigError::InheritanceCycle(path)) => assert_eq!(path, "a -> b -> a"),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_variant_target_not_enabled() {
        let mut config = config_with(vec![VariantConfig::new("release").with_targets(["x86"])]);
        config.targets = strings(&["arm64-v8a"]);
        assert!(matches!(
            VariantRegistry::from_config(&config),
            Err(ConfigError::TargetNotEnabled { .. })
        ));
    }

    #[test]
    fn test_invalid_build_dependency() {
        let config = config_with(vec![
            VariantConfig::new("release").with_build_dependency("not-a-coordinate")
        ]);
        assert!(VariantRegistry::from_config(&config).is_err());
    }

    #[test]
    fn test_resolve_identity() {
        let config = config_with(vec![
            VariantConfig::new("release"),
            VariantConfig::new("standalone")
                .with_parent("release")
                .with_linkage(Linkage::Static)
                .with_build_dependency("dev.rikka.ndk.thirdparty:cxx:1.2.0"),
        ]);
        let registry = VariantRegistry::from_config(&config).unwrap();

        let release = registry.resolve("release").unwrap();
        assert_eq!(release.artifact_id, "native");
        assert_eq!(release.version, "4.2");
        assert_eq!(release.linkage, Linkage::Shared);
        assert_eq!(release.targets, Target::ALL.to_vec());

        let standalone = registry.resolve("standalone").unwrap();
        assert_eq!(standalone.artifact_id, "native-standalone");
        assert_eq!(standalone.linkage, Linkage::Static);
        assert_eq!(
            standalone.build_dependencies,
            strings(&["dev.rikka.ndk.thirdparty:cxx:1.2.0"])
        );
    }

    #[test]
    fn test_primary_variant_keeps_library_artifact_id() {
        let config = config_with(vec![
            VariantConfig::new("full"),
            VariantConfig::new("lite").with_parent("full"),
            VariantConfig::new("release"),
        ]);
        let registry = VariantRegistry::from_config(&config).unwrap();

        assert_eq!(registry.resolve("full").unwrap().artifact_id, "native");
        assert_eq!(registry.resolve("lite").unwrap().artifact_id, "native-lite");
        assert_eq!(registry.resolve("release").unwrap().artifact_id, "native-release");
    }

    #[test]
    fn test_target_subset_keeps_registry_order() {
        let config = config_with(vec![
            VariantConfig::new("release").with_targets(["x86_64", "arm64-v8a"])
        ]);
        let registry = VariantRegistry::from_config(&config).unwrap();

        let release = registry.resolve("release").unwrap();
        assert_eq!(release.targets, vec![Target::Arm64V8a, Target::X86_64]);
    }

    #[test]
    fn test_select_defaults_to_everything() {
        let registry = VariantRegistry::from_config(&Config::default()).unwrap();
        let selected = registry.select(&[], &[]).unwrap();

        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|v| v.targets.len() == 4));
    }

    #[test]
    fn test_select_narrows() {
        let registry = VariantRegistry::from_config(&Config::default()).unwrap();
        let selected = registry
            .select(&strings(&["standalone"]), &strings(&["x86"]))
            .unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "standalone");
        assert_eq!(selected[0].targets, vec![Target::X86]);
    }

    #[test]
    fn test_select_unknown() {
        let registry = VariantRegistry::from_config(&Config::default()).unwrap();

        assert!(matches!(
            registry.select(&strings(&["debug"]), &[]),
            Err(ConfigError::UnknownVariant(_))
        ));
        assert!(matches!(
            registry.select(&[], &strings(&["riscv64"])),
            Err(ConfigError::UnknownTarget { .. })
        ));
    }
}
