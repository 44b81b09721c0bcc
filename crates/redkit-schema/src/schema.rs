//! On-disk layout of a schema file

use redkit_core::{ClassDecl, RegistryConfig};
use serde::{Deserialize, Serialize};

/// Contents of one `.ron` schema file
///
/// ```ron
/// (
///     config: Some((max_nesting_depth: 16)),
///     classes: [
///         (
///             name: "Quaternion",
///             properties: [
///                 (name: "I", red_name: Some("i"), ordinal: 0, declared_type: "CFloat"),
///                 (name: "R", red_name: Some("r"), ordinal: 3, declared_type: "CFloat"),
///             ],
///             defaults: [("r", Float(1.0))],
///         ),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaFile {
    /// Registry limits; at most one distinct value across loaded files
    #[serde(default)]
    pub config: Option<RegistryConfig>,
    #[serde(default)]
    pub classes: Vec<ClassDecl>,
}

impl SchemaFile {
    /// Parse a schema from RON text
    pub fn parse(content: &str) -> crate::Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Render the schema as pretty RON
    pub fn to_ron(&self) -> crate::Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| crate::Error::InvalidSchema(e.to_string()))
    }
}
