//! Target model and resolver configuration.
//!
//! ```toml
//! max_depth = 256
//!
//! [target]
//! size_type = "unsigned long"
//! type_info = "std::type_info"
//! ```

use std::fs;
use std::path::Path;

use cxxsema_core::{BasicKind, BasicModifiers, BasicType, CvQualifiers, SymbolTable, TyRef, Type};
use cxxsema_error::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::ResolverOption;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Deepest operand chain lowered from source or resolved. Deeper source
    /// expressions are skipped; deeper built trees get a problem type.
    pub max_depth: usize,
    pub target: TargetConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: ResolverOption::DEFAULT_MAX_DEPTH,
            target: TargetConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|err| {
            Error::config_invalid(err.message().to_string())
                .with_operation("config::parse")
                .set_source(err)
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            Error::from(err)
                .with_operation("config::load")
                .with_context("path", path.display().to_string())
        })?;
        Self::from_toml_str(&text).map_err(|err| err.with_context("path", path.display().to_string()))
    }

    pub fn option(&self) -> ResolverOption {
        ResolverOption::default().with_max_depth(self.max_depth)
    }

    fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::config_invalid("max_depth must be at least 1")
                .with_operation("config::validate"));
        }
        Ok(())
    }
}

/// Spellings of the types `sizeof` and `typeid` produce.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    pub size_type: String,
    pub type_info: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            size_type: "unsigned long".to_string(),
            type_info: "std::type_info".to_string(),
        }
    }
}

/// Result types of `sizeof` and `typeid` for one symbol table.
#[derive(Debug, Clone)]
pub struct TargetModel {
    size_type: TyRef,
    type_info: TyRef,
}

impl TargetModel {
    pub fn new(size_type: TyRef, type_info: TyRef) -> Self {
        Self {
            size_type,
            type_info,
        }
    }

    /// Default model: `unsigned long` and `const std::type_info`.
    pub fn standard(table: &mut SymbolTable) -> Self {
        let size_type = Type::from_basic(
            BasicType::new(BasicKind::Int)
                .with_modifiers(BasicModifiers::UNSIGNED | BasicModifiers::LONG),
        );
        let info = table.ensure_class_path("std::type_info");
        Self::new(size_type, Type::qualified(Type::class(info), CvQualifiers::CONST))
    }

    /// Build the model, declaring the type-info class in `table` if needed.
    pub fn from_config(config: &TargetConfig, table: &mut SymbolTable) -> Result<Self> {
        let size_type = BasicType::from_spelling(&config.size_type)
            .filter(|basic| matches!(basic.kind(), BasicKind::Int | BasicKind::Char))
            .ok_or_else(|| {
                Error::config_invalid(format!(
                    "size_type '{}' is not a builtin integer type",
                    config.size_type
                ))
                .with_operation("target::from_config")
            })?;

        let path = config.type_info.trim();
        let valid_path = !path.is_empty()
            && path
                .trim_start_matches("::")
                .split("::")
                .all(|segment| is_identifier(segment.trim()));
        if !valid_path {
            return Err(Error::config_invalid(format!(
                "type_info '{}' is not a class name",
                config.type_info
            ))
            .with_operation("target::from_config"));
        }
        let info = table.ensure_class_path(path);

        Ok(Self::new(
            Type::from_basic(size_type),
            Type::qualified(Type::class(info), CvQualifiers::CONST),
        ))
    }

    pub fn size_type(&self) -> TyRef {
        self.size_type.clone()
    }

    pub fn type_info(&self) -> TyRef {
        self.type_info.clone()
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxxsema_core::{InternPool, TypePrinter};
    use cxxsema_error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());

        let config = Config::from_toml_str("max_depth = 8\n[target]\nsize_type = \"unsigned int\"\n")
            .unwrap();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.target.size_type, "unsigned int");
        assert_eq!(config.target.type_info, "std::type_info");
        assert_eq!(config.option().max_depth, 8);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        for text in ["max_depth = 0", "unknown = 1", "max_depth = \"deep\""] {
            let err = Config::from_toml_str(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigInvalid, "{}", text);
        }
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert!(err.context_value("path").is_some());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cxxsema.toml");
        fs::write(&path, "[target]\ntype_info = \"rt::info\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.target.type_info, "rt::info");
    }

    #[test]
    fn target_model_builds_types() {
        let mut table = SymbolTable::new(InternPool::new());
        let model = TargetModel::from_config(&TargetConfig::default(), &mut table).unwrap();
        let printer = TypePrinter::new(&table);
        assert_eq!(printer.render(&model.size_type()), "unsigned long");
        assert_eq!(printer.render(&model.type_info()), "const std::type_info");

        let standard = TargetModel::standard(&mut table);
        assert_eq!(standard.type_info(), model.type_info());
    }

    #[test]
    fn target_model_rejects_bad_spellings() {
        let mut table = SymbolTable::new(InternPool::new());
        let bad_size = TargetConfig {
            size_type: "size_t".to_string(),
            ..TargetConfig::default()
        };
        assert!(TargetModel::from_config(&bad_size, &mut table).is_err());

        for spelling in ["double", "void", "bool", "long double"] {
            let not_integer = TargetConfig {
                size_type: spelling.to_string(),
                ..TargetConfig::default()
            };
            let err = TargetModel::from_config(&not_integer, &mut table).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigInvalid, "{}", spelling);
        }

        let narrow = TargetConfig {
            size_type: "unsigned char".to_string(),
            ..TargetConfig::default()
        };
        assert!(TargetModel::from_config(&narrow, &mut table).is_ok());

        let bad_info = TargetConfig {
            type_info: "std::".to_string(),
            ..TargetConfig::default()
        };
        assert!(TargetModel::from_config(&bad_info, &mut table).is_err());
    }
}
