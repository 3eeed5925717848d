//! Java snippets written as source text and parsed into tree fragments.
//!
//! A [`Template`] is parsed inside a throwaway compilation unit that carries
//! the template's imports, so names in the snippet are attributed the same
//! way they would be in a real file. Snippets are written with four-space
//! indentation; [`Indentation::reindent_node`] maps that onto the target
//! file's style when the fragment is inserted.

use super::edit::qualified_name_node;
use crate::errors::to_error_source;
use crate::syntax::java::parse_java;
use crate::syntax::trivia::indentation;
use crate::syntax::{SyntaxKind, SyntaxNode};
use crate::types::{attribute, TypeTable};
use crate::{err_msg, RecastError};

const TEMPLATE_UNIT: usize = 4;
const HOLDER: &str = "__Recast";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    code: String,
    imports: Vec<String>,
}

impl Template {
    pub fn new(code: impl Into<String>) -> Self {
        Template {
            code: code.into(),
            imports: Vec::new(),
        }
    }

    /// Types the snippet refers to by simple name.
    pub fn with_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports.extend(imports.into_iter().map(Into::into));
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// The snippet as a single annotation, e.g. `@ConfigProperty(name = "x")`.
    pub fn annotation(&self) -> Result<SyntaxNode, RecastError> {
        let unit = self.parse(&format!("{}\nclass {} {{}}\n", self.code, HOLDER))?;
        let found = holder_class(&unit)
            .and_then(|class| class.child(SyntaxKind::Modifiers))
            .and_then(|modifiers| modifiers.child(SyntaxKind::Annotation))
            .cloned();
        self.single(found, "an annotation")
    }

    /// The snippet as one class member (field, method, nested type).
    pub fn member(&self) -> Result<SyntaxNode, RecastError> {
        let unit = self.parse(&format!("class {} {{\n{}\n}}\n", HOLDER, self.code))?;
        let body = holder_class(&unit).and_then(|class| class.child(SyntaxKind::ClassBody));
        let found = match body.map(|b| b.children()) {
            Some([_, member, _]) => Some(member.clone()),
            _ => None,
        };
        self.single(found, "exactly one class member")
    }

    /// The snippet as one statement of a method body.
    pub fn statement(&self) -> Result<SyntaxNode, RecastError> {
        let unit = self.parse(&format!(
            "class {} {{\nvoid __run() {{\n{}\n}}\n}}\n",
            HOLDER, self.code
        ))?;
        let block = holder_class(&unit)
            .and_then(|class| class.child(SyntaxKind::ClassBody))
            .and_then(|body| body.child(SyntaxKind::MethodDecl))
            .and_then(|method| method.child(SyntaxKind::Block));
        let found = match block.map(|b| b.children()) {
            Some([_, statement, _]) => Some(statement.clone()),
            _ => None,
        };
        self.single(found, "exactly one statement")
    }

    /// The snippet as an expression.
    pub fn expression(&self) -> Result<SyntaxNode, RecastError> {
        let unit = self.parse(&format!("class {} {{ Object __value = {}; }}\n", HOLDER, self.code))?;
        let found = holder_class(&unit)
            .and_then(|class| class.child(SyntaxKind::ClassBody))
            .and_then(|body| body.child(SyntaxKind::FieldDecl))
            .filter(|field| field.children_of(SyntaxKind::VarDeclarator).count() == 1)
            .and_then(|field| field.child(SyntaxKind::VarDeclarator))
            .and_then(|declarator| declarator.child(SyntaxKind::Expr))
            .cloned();
        self.single(found, "an expression")
    }

    fn parse(&self, body: &str) -> Result<SyntaxNode, RecastError> {
        let mut text = String::new();
        for import in &self.imports {
            text.push_str(&format!("import {};\n", import));
        }
        text.push_str(body);
        let source = to_error_source("<template>", &text);
        let unit = parse_java(&text, &source)
            .map_err(|e| err_msg!(Recipe, "template `{}` does not parse: {}", self.code, e.message()))?;
        Ok(attribute(unit, &TypeTable::new()))
    }

    fn single(&self, found: Option<SyntaxNode>, what: &str) -> Result<SyntaxNode, RecastError> {
        found
            .map(|node| node.with_leading_trivia(""))
            .ok_or_else(|| err_msg!(Recipe, "template `{}` is not {}", self.code, what))
    }
}

fn holder_class(unit: &SyntaxNode) -> Option<&SyntaxNode> {
    unit.children().iter().find(|child| {
        child.kind() == SyntaxKind::ClassDecl
            && child
                .children()
                .iter()
                .any(|c| c.kind() == SyntaxKind::Ident && c.token_text() == Some(HOLDER))
    })
}

/// `import fqn;` with no leading trivia, attributed to `fqn`.
pub fn import_decl(fqn: &str) -> SyntaxNode {
    SyntaxNode::composite(
        SyntaxKind::ImportDecl,
        vec![
            SyntaxNode::token(SyntaxKind::Keyword, "import"),
            qualified_name_node(fqn).with_leading_trivia(" "),
            SyntaxNode::token(SyntaxKind::Punct, ";"),
        ],
    )
    .with_ty(fqn)
}

// ============================================================================
// INDENTATION
// ============================================================================

/// One level of indentation as used by a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indentation {
    unit: String,
}

impl Default for Indentation {
    fn default() -> Self {
        Indentation::spaces(TEMPLATE_UNIT)
    }
}

impl Indentation {
    pub fn spaces(width: usize) -> Self {
        Indentation {
            unit: " ".repeat(width),
        }
    }

    pub fn tabs() -> Self {
        Indentation {
            unit: "\t".to_string(),
        }
    }

    /// Infers the unit from the indentation of lines in `root`: tabs if most
    /// indented lines use them, otherwise the greatest common divisor of the
    /// space widths, clamped to 2..=8.
    pub fn detect(root: &SyntaxNode) -> Self {
        let mut tab_lines = 0usize;
        let mut widths = Vec::new();
        for token in root.tokens() {
            match indentation(token.leading_trivia()) {
                Some(indent) if indent.starts_with('\t') => tab_lines += 1,
                Some(indent) if !indent.is_empty() => widths.push(indent.len()),
                _ => {}
            }
        }
        if tab_lines > widths.len() {
            return Indentation::tabs();
        }
        match widths.into_iter().reduce(gcd) {
            Some(width) => Indentation::spaces(width.clamp(2, 8)),
            None => Indentation::default(),
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Rewrites the line-leading indentation inside `node` from the template
    /// convention (four spaces per level) to `base` plus this unit per level,
    /// and its line breaks to `newline`. The first token's trivia is treated
    /// like every other token's.
    pub fn reindent_node(&self, node: SyntaxNode, base: &str, newline: &str) -> SyntaxNode {
        if node.is_token() {
            let trivia = self.reindent_trivia(node.leading_trivia(), base, newline);
            return node.with_leading_trivia(trivia);
        }
        let children = node
            .children()
            .iter()
            .cloned()
            .map(|child| self.reindent_node(child, base, newline))
            .collect();
        node.with_children(children)
    }

    fn reindent_trivia(&self, trivia: &str, base: &str, newline: &str) -> String {
        if !trivia.contains('\n') {
            return trivia.to_string();
        }
        let mut out = String::with_capacity(trivia.len() + base.len());
        for (i, line) in trivia.split('\n').enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if i == 0 {
                out.push_str(line);
                continue;
            }
            out.push_str(newline);
            let content = line.trim_start_matches([' ', '\t']);
            let leading = &line[..line.len() - content.len()];
            let (levels, rest) = if leading.starts_with('\t') {
                (leading.chars().take_while(|c| *c == '\t').count(), 0)
            } else {
                (leading.len() / TEMPLATE_UNIT, leading.len() % TEMPLATE_UNIT)
            };
            out.push_str(base);
            out.push_str(&self.unit.repeat(levels));
            out.push_str(&" ".repeat(rest));
            out.push_str(content);
        }
        out
    }
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::SourceTree;

    #[test]
    fn annotation_templates_are_attributed_through_their_imports() {
        let template = Template::new("@ConfigProperty(name = \"app.url\")")
            .with_imports(["org.eclipse.microprofile.config.inject.ConfigProperty"]);
        let annotation = template.annotation().expect("annotation");
        assert_eq!(annotation.print(), "@ConfigProperty(name = \"app.url\")");
        assert_eq!(
            annotation.ty(),
            Some("org.eclipse.microprofile.config.inject.ConfigProperty")
        );
        assert_eq!(template.imports().len(), 1);
    }

    #[test]
    fn member_and_statement_templates() {
        let member = Template::new("void start() {\n    run();\n}").member().expect("member");
        assert_eq!(member.kind(), SyntaxKind::MethodDecl);
        assert_eq!(member.print(), "void start() {\n    run();\n}");

        let statement = Template::new("return 1;").statement().expect("statement");
        assert_eq!(statement.print(), "return 1;");

        let expression = Template::new("a + b").expression().expect("expression");
        assert_eq!(expression.print(), "a + b");
    }

    #[test]
    fn malformed_or_wrong_shaped_templates_are_recipe_errors() {
        assert!(Template::new("@").annotation().is_err());
        assert!(Template::new("int a; int b;").member().is_err());
    }

    #[test]
    fn indentation_is_detected() {
        let two = SourceTree::parse("class A {\n  void f() {\n    x();\n  }\n}", "A.java").expect("parses");
        assert_eq!(Indentation::detect(two.root()).unit(), "  ");
        let tabs = SourceTree::parse("class A {\n\tint x;\n\tint y;\n}", "A.java").expect("parses");
        assert_eq!(Indentation::detect(tabs.root()).unit(), "\t");
        let flat = SourceTree::parse("class A {}", "A.java").expect("parses");
        assert_eq!(Indentation::detect(flat.root()), Indentation::default());
    }

    #[test]
    fn reindenting_maps_template_levels() {
        let member = Template::new("void f() {\n    run();\n}").member().expect("member");
        let indented = Indentation::tabs().reindent_node(member, "\t", "\r\n");
        assert_eq!(indented.print(), "void f() {\r\n\t\trun();\r\n\t}");
    }
}
