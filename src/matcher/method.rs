//! Method signature patterns such as `org.x.Repo find*(String, ..)`.

use std::fmt;

use regex::Regex;

use super::scope::{ExprType, MatchScope};
use super::{Binding, Bindings, MatchOutcome, TypePattern};
use crate::syntax::ast::MethodCall;
use crate::syntax::SyntaxNode;
use crate::{err_msg, RecastError};

#[derive(Debug, Clone)]
enum ArgPattern {
    /// `*`: exactly one argument of any type
    Any,
    Type(TypePattern),
}

#[derive(Debug, Clone)]
enum ArgsPattern {
    /// `(..)`
    Anything,
    Exact(Vec<ArgPattern>),
    /// `(String, ..)`
    Prefix(Vec<ArgPattern>),
}

/// Matches method invocations by declaring type, name and argument types.
///
/// The declaring type is a [`TypePattern`]; the name may use `*` as a
/// wildcard; the argument list is either `(..)` or a comma separated list of
/// type names and `*`, optionally ending in `..`.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    source: String,
    declaring: TypePattern,
    name: Regex,
    args: ArgsPattern,
}

impl MethodMatcher {
    pub fn parse(signature: &str) -> Result<Self, RecastError> {
        let signature = signature.trim();
        let (declaring, rest) = signature
            .split_once(char::is_whitespace)
            .ok_or_else(|| err_msg!(Recipe, "method pattern '{}' has no method name", signature))?;
        let rest = rest.trim();
        let open = rest
            .find('(')
            .ok_or_else(|| err_msg!(Recipe, "method pattern '{}' has no argument list", signature))?;
        let inner = rest[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| err_msg!(Recipe, "method pattern '{}' is missing ')'", signature))?;

        let name_glob = rest[..open].trim();
        if name_glob.is_empty() {
            return Err(err_msg!(Recipe, "method pattern '{}' has an empty name", signature));
        }
        let name_regex = format!(
            "^{}$",
            name_glob
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*")
        );
        let name = Regex::new(&name_regex)
            .map_err(|e| err_msg!(Recipe, "invalid method name pattern '{}': {}", name_glob, e))?;

        Ok(MethodMatcher {
            source: signature.to_string(),
            declaring: TypePattern::new(declaring),
            name,
            args: parse_args(inner.trim()),
        })
    }

    pub fn declaring_type(&self) -> &TypePattern {
        &self.declaring
    }

    /// Matches a `MethodCall` node. `enclosing` is the FQN of the class the
    /// call appears in, used for unqualified calls.
    pub fn match_call(
        &self,
        node: &SyntaxNode,
        scope: &MatchScope<'_>,
        enclosing: Option<&str>,
    ) -> MatchOutcome {
        let Some(call) = MethodCall::cast(node) else {
            return MatchOutcome::NoMatch;
        };
        let name = call.name();
        if !self.name.is_match(&name) {
            return MatchOutcome::NoMatch;
        }

        let receiver = match call.select() {
            Some(select) => scope.receiver_type(select),
            None => match scope.names().static_import_owner(&name) {
                Some(owner) => ExprType::Known(owner.to_string()),
                None => match enclosing {
                    Some(class) => ExprType::Known(class.to_string()),
                    None => ExprType::Unknown(format!("no enclosing type for call to '{}'", name)),
                },
            },
        };
        match receiver {
            ExprType::Known(ty) if !self.declaring.matches(&ty) => return MatchOutcome::NoMatch,
            ExprType::Known(_) => {}
            ExprType::Unknown(_) | ExprType::Null if matches!(self.declaring, TypePattern::Any) => {}
            ExprType::Unknown(reason) => {
                return MatchOutcome::Ambiguous(format!(
                    "call to '{}' may target {}: {}",
                    name, self.declaring, reason
                ))
            }
            ExprType::Null => return MatchOutcome::NoMatch,
        }

        let args = call.args();
        let arg_patterns = match &self.args {
            ArgsPattern::Anything => None,
            ArgsPattern::Exact(patterns) if patterns.len() != args.len() => {
                return MatchOutcome::NoMatch
            }
            ArgsPattern::Prefix(patterns) if patterns.len() > args.len() => {
                return MatchOutcome::NoMatch
            }
            ArgsPattern::Exact(patterns) | ArgsPattern::Prefix(patterns) => Some(patterns),
        };
        if let Some(patterns) = arg_patterns {
            for (pattern, arg) in patterns.iter().zip(args.iter()) {
                let ArgPattern::Type(expected) = pattern else {
                    continue;
                };
                match scope.expression_type(arg) {
                    ExprType::Known(actual) if expected.matches(&actual) => {}
                    ExprType::Null if !is_primitive_pattern(expected) => {}
                    ExprType::Known(_) | ExprType::Null => return MatchOutcome::NoMatch,
                    ExprType::Unknown(reason) => {
                        return MatchOutcome::Ambiguous(format!(
                            "argument of '{}' may not be {}: {}",
                            name, expected, reason
                        ))
                    }
                }
            }
        }

        let mut bindings = Bindings::new();
        bindings.insert("name", Binding::Text(name));
        if let Some(select) = call.select() {
            bindings.insert("select", Binding::Node(select.clone()));
        }
        bindings.insert(
            "args",
            Binding::List(args.iter().map(|a| Binding::Node((*a).clone())).collect()),
        );
        MatchOutcome::Matched(bindings)
    }
}

impl fmt::Display for MethodMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_args(inner: &str) -> ArgsPattern {
    if inner == ".." {
        return ArgsPattern::Anything;
    }
    if inner.is_empty() {
        return ArgsPattern::Exact(Vec::new());
    }
    let mut parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    let open_ended = parts.last() == Some(&"..");
    if open_ended {
        parts.pop();
    }
    let patterns = parts
        .into_iter()
        .map(|p| match p {
            "*" => ArgPattern::Any,
            other => ArgPattern::Type(TypePattern::new(&qualify_builtin(other))),
        })
        .collect();
    if open_ended {
        ArgsPattern::Prefix(patterns)
    } else {
        ArgsPattern::Exact(patterns)
    }
}

/// `String` in a signature means `java.lang.String`.
fn qualify_builtin(name: &str) -> String {
    match name {
        "String" | "Object" | "Integer" | "Long" | "Boolean" | "Class" => format!("java.lang.{}", name),
        other => other.to_string(),
    }
}

fn is_primitive_pattern(pattern: &TypePattern) -> bool {
    matches!(
        pattern.exact(),
        Some("boolean" | "byte" | "char" | "short" | "int" | "long" | "float" | "double")
    )
}
