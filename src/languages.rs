//! Language configuration for compilation and execution

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;

/// Supported submission languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cpp,
    Python,
    Javascript,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::C,
        Language::Cpp,
        Language::Python,
        Language::Javascript,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Python => "python",
            Language::Javascript => "javascript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ExecutionError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_lowercase().as_str() {
            "c" => Ok(Language::C),
            "cpp" | "c++" | "cxx" => Ok(Language::Cpp),
            "python" | "py" | "python3" => Ok(Language::Python),
            "javascript" | "js" | "node" => Ok(Language::Javascript),
            _ => Err(ExecutionError::UnsupportedLanguage(tag.to_string())),
        }
    }
}

/// Configuration for a supported programming language
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageConfig {
    /// Source file extension without the dot (e.g., "cpp")
    pub extension: String,
    /// Compile command template (None if not needed)
    pub compile_command: Option<Vec<String>>,
    /// Run command template
    pub run_command: Vec<String>,
}

impl LanguageConfig {
    pub fn is_compiled(&self) -> bool {
        self.compile_command.is_some()
    }
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    extension: String,
    compile_command: Option<String>,
    run_command: String,
}

/// Language configurations keyed by language
#[derive(Debug, Clone)]
pub struct LanguageTable {
    configs: HashMap<Language, LanguageConfig>,
}

impl LanguageTable {
    /// The built-in table shipped with the crate
    pub fn embedded() -> anyhow::Result<Self> {
        let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));
        Self::from_toml_str(content)
    }

    /// Load a table from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read language config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid language config {}", path.display()))
    }

    /// Load from `path` when given, otherwise use the embedded table
    pub fn load_or_embedded(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::embedded(),
        }
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let raw_configs: HashMap<String, RawLanguageConfig> = toml::from_str(content)?;

        let mut configs = HashMap::new();
        for (name, raw) in raw_configs {
            let language: Language = name
                .parse()
                .map_err(|_| anyhow::anyhow!("Unknown language section: [{}]", name))?;

            let run_command = into_command(&raw.run_command);
            if run_command.is_empty() {
                anyhow::bail!("Empty run_command for {}", name);
            }
            let compile_command = match raw.compile_command {
                Some(cmd) => {
                    let cmd = into_command(&cmd);
                    if cmd.is_empty() {
                        anyhow::bail!("Empty compile_command for {}", name);
                    }
                    Some(cmd)
                }
                None => None,
            };
            let extension = raw.extension.trim_start_matches('.').to_string();
            if extension.is_empty() {
                anyhow::bail!("Empty extension for {}", name);
            }

            configs.insert(
                language,
                LanguageConfig {
                    extension,
                    compile_command,
                    run_command,
                },
            );
        }

        Ok(Self { configs })
    }

    pub fn from_configs(configs: impl IntoIterator<Item = (Language, LanguageConfig)>) -> Self {
        Self {
            configs: configs.into_iter().collect(),
        }
    }

    pub fn get(&self, language: Language) -> Option<&LanguageConfig> {
        self.configs.get(&language)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Language, &LanguageConfig)> {
        self.configs.iter()
    }

    /// Configured language names, in declaration order
    pub fn supported_languages(&self) -> Vec<String> {
        Language::ALL
            .iter()
            .filter(|language| self.get(**language).is_some())
            .map(|language| language.to_string())
            .collect()
    }
}

fn into_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_tags_and_aliases() {
        assert_eq!("c".parse::<Language>().unwrap(), Language::C);
        assert_eq!("C++".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!(" Python3 ".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("js".parse::<Language>().unwrap(), Language::Javascript);
        assert!(matches!(
            "cobol".parse::<Language>(),
            Err(ExecutionError::UnsupportedLanguage(tag)) if tag == "cobol"
        ));
    }

    #[test]
    fn test_embedded_table_covers_all_languages() {
        let table = LanguageTable::embedded().unwrap();
        for language in Language::ALL {
            assert!(table.get(language).is_some(), "missing {}", language);
        }
        assert_eq!(
            table.supported_languages(),
            vec!["c", "cpp", "python", "javascript"]
        );
        assert!(table.get(Language::C).unwrap().is_compiled());
        assert!(table.get(Language::Cpp).unwrap().is_compiled());
        assert!(!table.get(Language::Python).unwrap().is_compiled());
        assert!(!table.get(Language::Javascript).unwrap().is_compiled());

        let cpp = table.get(Language::Cpp).unwrap();
        let compile = cpp.compile_command.as_ref().unwrap();
        assert_eq!(compile[0], "g++");
        assert!(compile.contains(&"-Wall".to_string()));
        assert!(compile.contains(&"-O2".to_string()));
        assert!(compile.contains(&"-std=c++17".to_string()));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[c]
extension = ".c"
compile_command = "clang -o {{binary}} {{source}}"
run_command = "{{binary}}"

[python]
extension = "py"
run_command = "pypy3 {{source}}"
"#
        )
        .unwrap();

        let table = LanguageTable::load(file.path()).unwrap();
        assert_eq!(table.supported_languages(), vec!["c", "python"]);
        assert_eq!(table.get(Language::C).unwrap().extension, "c");
        assert_eq!(
            table.get(Language::Python).unwrap().run_command,
            vec!["pypy3", "{source}"]
        );
        assert!(table.get(Language::Cpp).is_none());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = LanguageTable::from_toml_str(
            r#"
[fortran]
extension = "f90"
run_command = "./a.out"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("fortran"));
    }

    #[test]
    fn test_empty_run_command_rejected() {
        let result = LanguageTable::from_toml_str(
            r#"
[python]
extension = "py"
run_command = "   "
"#,
        );
        assert!(result.is_err());
    }
}
