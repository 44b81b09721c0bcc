//! RON schema loader

use crate::error::{Error, Result};
use crate::schema::SchemaFile;
use redkit_core::{ClassDecl, RegistryConfig, TypeName, TypeRegistry};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Collects class declarations from RON files into a registry
pub struct Loader {
    /// Set by `with_config`; takes precedence over file-level config
    explicit_config: Option<RegistryConfig>,
    file_config: Option<RegistryConfig>,
    decls: Vec<ClassDecl>,
    names: HashSet<TypeName>,
}

impl Loader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            explicit_config: None,
            file_config: None,
            decls: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Use `config` for the built registry, ignoring configs found in files
    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.explicit_config = Some(config);
        self
    }

    /// Load class declarations from a RON string
    pub fn load_str(&mut self, content: &str) -> Result<()> {
        let file = SchemaFile::parse(content)?;

        if let Some(config) = file.config {
            match &self.file_config {
                Some(existing) if *existing != config => {
                    return Err(Error::InvalidSchema(
                        "conflicting registry config between schema files".to_string(),
                    ));
                }
                Some(_) => {}
                None => self.file_config = Some(config),
            }
        }

        for decl in file.classes {
            if !self.names.insert(decl.name.clone()) {
                return Err(Error::DuplicateDefinition(decl.name.to_string()));
            }
            debug!(
                "Loaded class {} ({} properties)",
                decl.name,
                decl.properties.len()
            );
            self.decls.push(decl);
        }
        Ok(())
    }

    /// Load a single RON file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        self.load_str(&content)
            .map_err(|e| match e {
                Error::InvalidSchema(msg) => {
                    Error::InvalidSchema(format!("{}: {}", path.display(), msg))
                }
                other => other,
            })?;
        debug!("Loaded schema file {}", path.display());
        Ok(())
    }

    /// Load all RON files from a directory
    ///
    /// Subdirectories are loaded recursively; entries are visited in name
    /// order so duplicate reports are stable.
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {:?}", path),
            )));
        }

        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        for file_path in entries {
            if file_path.extension().map(|e| e == "ron").unwrap_or(false) {
                self.load_file(&file_path)?;
            } else if file_path.is_dir() {
                self.load_directory(&file_path)?;
            }
        }

        Ok(())
    }

    /// Declarations loaded so far, in load order
    pub fn decls(&self) -> &[ClassDecl] {
        &self.decls
    }

    /// Build the registry from everything loaded
    pub fn finish(self) -> Result<TypeRegistry> {
        let config = self
            .explicit_config
            .or(self.file_config)
            .unwrap_or_default();
        let mut registry = TypeRegistry::new(config);
        for decl in self.decls {
            registry.register(decl)?;
        }
        info!("Schema registry built with {} classes", registry.class_count());
        Ok(registry)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redkit_core::{Literal, RedClass, RedValue};
    use tempfile::TempDir;

    const TRANSFORMS: &str = r#"
    (
        classes: [
            (
                name: "Quaternion",
                properties: [
                    (name: "I", red_name: Some("i"), ordinal: 0, declared_type: "CFloat"),
                    (name: "J", red_name: Some("j"), ordinal: 1, declared_type: "CFloat"),
                    (name: "K", red_name: Some("k"), ordinal: 2, declared_type: "CFloat"),
                    (name: "R", red_name: Some("r"), ordinal: 3, declared_type: "CFloat"),
                ],
            ),
            (
                name: "WorldTransform",
                properties: [
                    (name: "Orientation", red_name: Some("orientation"), declared_type: "Quaternion"),
                ],
                defaults: [("orientation.r", Float(1.0))],
            ),
        ]
    )
    "#;

    const COMPONENTS: &str = r#"
    (
        classes: [
            (
                name: "entIComponent",
                properties: [
                    (name: "Name", red_name: Some("name"), declared_type: "CName"),
                ],
                defaults: [("name", String("Component"))],
            ),
            (
                name: "entIPlacedComponent",
                parent: Some("entIComponent"),
                properties: [
                    (name: "LocalTransform", red_name: Some("localTransform"), declared_type: "WorldTransform"),
                    (name: "Slots", red_name: Some("slots"), declared_type: "CStatic<CUInt8>", flags: [4]),
                ],
            ),
        ]
    )
    "#;

    #[test]
    fn test_load_str_and_finish() {
        let mut loader = Loader::new();
        loader.load_str(TRANSFORMS).unwrap();
        loader.load_str(COMPONENTS).unwrap();
        assert_eq!(loader.decls().len(), 4);
        assert_eq!(
            loader.decls()[1].defaults,
            vec![("orientation.r".to_string(), Literal::Float(1.0))]
        );

        let registry = loader.finish().unwrap();
        assert_eq!(registry.class_count(), 4);

        let info = registry.type_info(&TypeName::new("entIPlacedComponent"));
        let names: Vec<_> = info.properties().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["LocalTransform", "Slots", "Name"]);
    }

    #[test]
    fn test_loaded_registry_drives_construction() {
        let mut loader = Loader::new();
        loader.load_str(COMPONENTS).unwrap();
        loader.load_str(TRANSFORMS).unwrap();
        let registry = loader.finish().unwrap();

        let mut component = RedClass::construct(&registry, "entIPlacedComponent").unwrap();
        assert_eq!(component.get("name"), &RedValue::Name("Component".into()));
        assert_eq!(
            component.get("slots").as_array().unwrap().read().max_size(),
            Some(4)
        );

        let transform = component.get("localTransform").as_class().unwrap().clone();
        let orientation = transform.read().try_get("orientation").cloned().unwrap();
        let orientation = orientation.as_class().unwrap().read();
        assert_eq!(orientation.try_get("r"), Some(&RedValue::Float(1.0)));
        assert_eq!(orientation.try_get("i"), Some(&RedValue::Float(0.0)));
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let mut loader = Loader::new();
        loader.load_str(TRANSFORMS).unwrap();
        let err = loader.load_str(TRANSFORMS).unwrap_err();
        assert!(matches!(err, Error::DuplicateDefinition(name) if name == "Quaternion"));
    }

    #[test]
    fn test_invalid_ron() {
        let mut loader = Loader::new();
        let err = loader.load_str("(classes: [ (name: ").unwrap_err();
        assert!(matches!(err, Error::Ron(_)));
    }

    #[test]
    fn test_config_from_file() {
        let mut loader = Loader::new();
        loader
            .load_str("(config: Some((max_nesting_depth: 2)), classes: [])")
            .unwrap();
        loader
            .load_str("(config: Some((max_nesting_depth: 2)))")
            .unwrap();
        let registry = loader.finish().unwrap();
        assert_eq!(registry.config().max_nesting_depth(), 2);
        assert_eq!(registry.config().max_inheritance_depth(), 32);
    }

    #[test]
    fn test_conflicting_file_configs() {
        let mut loader = Loader::new();
        loader
            .load_str("(config: Some((max_nesting_depth: 2)))")
            .unwrap();
        let err = loader
            .load_str("(config: Some((max_nesting_depth: 3)))")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }

    #[test]
    fn test_explicit_config_wins() {
        let mut loader =
            Loader::new().with_config(RegistryConfig::default().with_max_nesting_depth(5));
        loader
            .load_str("(config: Some((max_nesting_depth: 2)))")
            .unwrap();
        let registry = loader.finish().unwrap();
        assert_eq!(registry.config().max_nesting_depth(), 5);
    }

    #[test]
    fn test_strict_names_surface_core_error() {
        let content = r#"
        (
            config: Some((strict_names: true)),
            classes: [
                (
                    name: "gameItem",
                    properties: [
                        (name: "A", red_name: Some("value"), declared_type: "CInt32"),
                        (name: "B", red_name: Some("value"), declared_type: "CInt32"),
                    ],
                ),
            ],
        )
        "#;
        let mut loader = Loader::new();
        loader.load_str(content).unwrap();
        let err = loader.finish().unwrap_err();
        assert!(matches!(
            err,
            Error::Core(redkit_core::Error::DuplicateExternalName { .. })
        ));
    }

    #[test]
    fn test_load_directory_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("transforms.ron"), TRANSFORMS).unwrap();
        fs::create_dir_all(dir.join("ent")).unwrap();
        fs::write(dir.join("ent").join("components.ron"), COMPONENTS).unwrap();
        fs::write(dir.join("notes.txt"), "not a schema").unwrap();

        let mut loader = Loader::new();
        loader.load_directory(dir).unwrap();
        let registry = loader.finish().unwrap();
        assert!(registry.contains_class(&TypeName::new("entIComponent")));
        assert!(registry.contains_class(&TypeName::new("Quaternion")));
    }

    #[test]
    fn test_load_directory_missing() {
        let temp_dir = TempDir::new().unwrap();
        let mut loader = Loader::new();
        let err = loader
            .load_directory(temp_dir.path().join("does-not-exist"))
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_load_file_names_the_file_in_schema_errors() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.ron");
        let second = temp_dir.path().join("second.ron");
        fs::write(&first, "(config: Some((max_nesting_depth: 2)))").unwrap();
        fs::write(&second, "(config: Some((max_nesting_depth: 3)))").unwrap();

        let mut loader = Loader::new();
        loader.load_file(&first).unwrap();
        let err = loader.load_file(&second).unwrap_err();
        assert!(matches!(&err, Error::InvalidSchema(msg) if msg.contains("second.ron")));
    }

    #[test]
    fn test_schema_file_export() {
        let mut loader = Loader::new();
        loader.load_str(TRANSFORMS).unwrap();
        let file = SchemaFile {
            config: None,
            classes: loader.decls().to_vec(),
        };
        let text = file.to_ron().unwrap();
        assert_eq!(SchemaFile::parse(&text).unwrap(), file);
    }
}
