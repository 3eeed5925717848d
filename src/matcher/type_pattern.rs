use std::fmt;

use serde::{Deserialize, Serialize};

use crate::syntax::ast::{package_of, simple_name};

/// A pattern over fully qualified type names.
///
/// - `org.x.Service` matches exactly that type
/// - `org.x.*` matches any type directly in `org.x`
/// - `org.x..*` matches any type in `org.x` or a subpackage
/// - `*` matches everything
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TypePattern {
    Exact(String),
    Package(String),
    PackageTree(String),
    Any,
}

impl TypePattern {
    pub fn new(pattern: &str) -> Self {
        let pattern = pattern.trim();
        if pattern == "*" || pattern == "..*" {
            TypePattern::Any
        } else if let Some(pkg) = pattern.strip_suffix("..*") {
            TypePattern::PackageTree(pkg.to_string())
        } else if let Some(pkg) = pattern.strip_suffix(".*") {
            TypePattern::Package(pkg.to_string())
        } else {
            TypePattern::Exact(pattern.to_string())
        }
    }

    pub fn matches(&self, fqn: &str) -> bool {
        match self {
            TypePattern::Exact(name) => name == fqn,
            TypePattern::Package(pkg) => package_of(fqn) == pkg,
            TypePattern::PackageTree(pkg) => {
                let owner = package_of(fqn);
                owner == pkg || (owner.starts_with(pkg.as_str()) && owner[pkg.len()..].starts_with('.'))
            }
            TypePattern::Any => true,
        }
    }

    /// Whether a type written with simple name `simple` could match.
    pub fn could_match_simple(&self, simple: &str) -> bool {
        match self {
            TypePattern::Exact(name) => simple_name(name) == simple,
            _ => true,
        }
    }

    /// Whether some type of `package` could match.
    pub fn could_match_package(&self, package: &str) -> bool {
        match self {
            TypePattern::Exact(name) => package_of(name) == package,
            TypePattern::Package(pkg) => pkg == package,
            TypePattern::PackageTree(pkg) => {
                package == pkg || (package.starts_with(pkg.as_str()) && package[pkg.len()..].starts_with('.'))
            }
            TypePattern::Any => true,
        }
    }

    pub fn exact(&self) -> Option<&str> {
        match self {
            TypePattern::Exact(name) => Some(name),
            _ => None,
        }
    }
}

impl From<String> for TypePattern {
    fn from(value: String) -> Self {
        TypePattern::new(&value)
    }
}

impl From<&str> for TypePattern {
    fn from(value: &str) -> Self {
        TypePattern::new(value)
    }
}

impl From<TypePattern> for String {
    fn from(value: TypePattern) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypePattern::Exact(name) => write!(f, "{}", name),
            TypePattern::Package(pkg) => write!(f, "{}.*", pkg),
            TypePattern::PackageTree(pkg) => write!(f, "{}..*", pkg),
            TypePattern::Any => write!(f, "*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_patterns() {
        let direct = TypePattern::new("org.springframework.stereotype.*");
        assert!(direct.matches("org.springframework.stereotype.Service"));
        assert!(!direct.matches("org.springframework.stereotype.sub.Thing"));

        let tree = TypePattern::new("org.springframework..*");
        assert!(tree.matches("org.springframework.stereotype.Service"));
        assert!(tree.matches("org.springframework.Thing"));
        assert!(!tree.matches("org.springframeworkx.Thing"));
    }

    #[test]
    fn exact_pattern_and_simple_names() {
        let exact = TypePattern::new("jakarta.inject.Inject");
        assert!(exact.matches("jakarta.inject.Inject"));
        assert!(!exact.matches("com.google.inject.Inject"));
        assert!(exact.could_match_simple("Inject"));
        assert!(exact.could_match_package("jakarta.inject"));
        assert_eq!(exact.to_string(), "jakarta.inject.Inject");
    }
}
