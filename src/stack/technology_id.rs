//! Closed identifier enum for every supported technology.
//!
//! Adding a supported technology means adding a variant here plus a template
//! entry in [`crate::templates::TemplateRegistry`]; no engine logic changes.
//! `Custom` carries names supplied by the caller (`--force-type`, `--include`)
//! that the registry does not know; they fail later with a template error
//! rather than being silently ignored.

use serde::{Deserialize, Serialize};

/// The four candidate kinds, ordered the way the output document orders
/// service groups (primary app first, databases next, tools last).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TechKind {
    Language,
    Framework,
    Database,
    Tool,
}

macro_rules! technologies {
    (
        $(
            $variant:ident => $name:literal, $kind:ident $( | $alias:literal )*
        ;)*
    ) => {
        /// Identifier for one supported technology.
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum TechnologyId {
            $( $variant, )*
            /// A caller-supplied name the registry does not recognize.
            Custom(String),
        }

        impl TechnologyId {
            /// Canonical lowercase name, as used in CLI flags and output.
            pub fn name(&self) -> &str {
                match self {
                    $( Self::$variant => $name, )*
                    Self::Custom(name) => name,
                }
            }

            /// Parse a user-supplied name, accepting common aliases.
            /// Unknown names become `Custom` so the error surfaces at
            /// template lookup with the offending name intact.
            pub fn from_name(name: &str) -> Self {
                match name.to_lowercase().as_str() {
                    $( $name $( | $alias )* => Self::$variant, )*
                    other => Self::Custom(other.to_string()),
                }
            }

            pub fn kind(&self) -> TechKind {
                match self {
                    $( Self::$variant => TechKind::$kind, )*
                    // Unknown names are treated as optional tools until the
                    // template lookup rejects them.
                    Self::Custom(_) => TechKind::Tool,
                }
            }

            pub fn all_variants() -> &'static [Self] {
                &[ $( Self::$variant, )* ]
            }
        }

        impl Serialize for TechnologyId {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.name())
            }
        }

        impl<'de> Deserialize<'de> for TechnologyId {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(Self::from_name(&s))
            }
        }
    };
}

technologies! {
    Node => "node", Language | "nodejs" | "javascript" | "typescript" | "js" | "ts";
    Python => "python", Language | "python3" | "py";
    Php => "php", Language;
    Go => "go", Language | "golang";
    Cpp => "cpp", Language | "c++";
    Ruby => "ruby", Language;
    DotNet => "dotnet", Language | "csharp" | ".net" | "c#";
    Rust => "rust", Language;
    Scala => "scala", Language;
    Elixir => "elixir", Language;

    Spring => "spring", Framework | "spring-boot" | "java";
    Django => "django", Framework;
    Flask => "flask", Framework;
    FastApi => "fastapi", Framework;
    Laravel => "laravel", Framework;
    React => "react", Framework;
    Vue => "vue", Framework;
    Angular => "angular", Framework;

    Postgres => "postgres", Database | "postgresql" | "pg";
    Mysql => "mysql", Database;
    MariaDb => "mariadb", Database | "maria";
    MongoDb => "mongodb", Database | "mongo";
    Redis => "redis", Database;
    Elasticsearch => "elasticsearch", Database | "elastic";
    Cassandra => "cassandra", Database;

    Jupyter => "jupyter", Tool;
    Nginx => "nginx", Tool;
    Apache => "apache", Tool | "httpd";
}

impl TechnologyId {
    /// The language a framework's app service runs on, if any. Used by the
    /// composer to let a framework service stand in for the bare language
    /// service instead of emitting both.
    pub fn base_language(&self) -> Option<TechnologyId> {
        match self {
            Self::Django | Self::Flask | Self::FastApi => Some(Self::Python),
            Self::React | Self::Vue | Self::Angular => Some(Self::Node),
            Self::Laravel => Some(Self::Php),
            _ => None,
        }
    }
}

impl std::fmt::Display for TechnologyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_canonical() {
        assert_eq!(TechnologyId::from_name("python"), TechnologyId::Python);
        assert_eq!(TechnologyId::from_name("postgres"), TechnologyId::Postgres);
    }

    #[test]
    fn test_from_name_aliases() {
        assert_eq!(TechnologyId::from_name("nodejs"), TechnologyId::Node);
        assert_eq!(TechnologyId::from_name("PostgreSQL"), TechnologyId::Postgres);
        assert_eq!(TechnologyId::from_name("mongo"), TechnologyId::MongoDb);
    }

    #[test]
    fn test_from_name_unknown_is_custom() {
        let id = TechnologyId::from_name("fortran");
        assert_eq!(id, TechnologyId::Custom("fortran".to_string()));
        assert_eq!(id.name(), "fortran");
        assert_eq!(id.kind(), TechKind::Tool);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(TechnologyId::Python.kind(), TechKind::Language);
        assert_eq!(TechnologyId::Flask.kind(), TechKind::Framework);
        assert_eq!(TechnologyId::Redis.kind(), TechKind::Database);
        assert_eq!(TechnologyId::Nginx.kind(), TechKind::Tool);
    }

    #[test]
    fn test_base_language() {
        assert_eq!(
            TechnologyId::Flask.base_language(),
            Some(TechnologyId::Python)
        );
        assert_eq!(TechnologyId::React.base_language(), Some(TechnologyId::Node));
        assert_eq!(TechnologyId::Spring.base_language(), None);
        assert_eq!(TechnologyId::Redis.base_language(), None);
    }

    #[test]
    fn test_serde_roundtrip() {
        let json = serde_json::to_string(&TechnologyId::FastApi).unwrap();
        assert_eq!(json, "\"fastapi\"");
        let back: TechnologyId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TechnologyId::FastApi);
    }

    #[test]
    fn test_all_variants_have_distinct_names() {
        let mut seen = std::collections::HashSet::new();
        for id in TechnologyId::all_variants() {
            assert!(seen.insert(id.name()), "duplicate name {}", id.name());
        }
    }
}
