mod common;

use common::{after_text, assert_rewrite, catalog, catalog_from_yaml, rewrite_run, rewrite_run_with};
use recast::composer::{CancellationToken, Composer, ComposerOptions, FileOutcome, SourceInput};
use recast::diagnostics::DiagnosticKind;
use recast::recipe::Recipe;
use recast::recipes::spring;

const ORDER_SERVICE: &str = r#"package com.acme.shop;

import org.springframework.beans.factory.annotation.Autowired;
import org.springframework.stereotype.Service;

@Service
public class OrderService {

    @Autowired
    private OrderRepository repository;

    public int count(String customer) {
        // untouched
        return repository.countBy( customer );
    }
}
"#;

const ORDER_SERVICE_MIGRATED: &str = r#"package com.acme.shop;

import jakarta.enterprise.context.ApplicationScoped;
import jakarta.inject.Inject;

@ApplicationScoped
public class OrderService {

    private final OrderRepository repository;

    @Inject
    public OrderService(OrderRepository repository) {
        this.repository = repository;
    }

    public int count(String customer) {
        // untouched
        return repository.countBy( customer );
    }
}
"#;

const DEMO_APPLICATION: &str = "package com.example;\n\nimport org.springframework.boot.SpringApplication;\nimport org.springframework.boot.autoconfigure.SpringBootApplication;\n\n@SpringBootApplication\npublic class DemoApplication {\n    public static void main(String[] args) {\n        SpringApplication.run(DemoApplication.class, args);\n    }\n}\n";

const APPLICATION_PROPERTIES: &str = "# web\nserver.port=8081\nspring.application.name = shop\ncustom.flag=true\n";

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn component_with_field_injection_is_migrated() {
    assert_rewrite(
        catalog(&[spring::SPRING_BOOT_TO_QUARKUS]),
        "src/main/java/com/acme/shop/OrderService.java",
        ORDER_SERVICE,
        ORDER_SERVICE_MIGRATED,
    );
}

#[test]
fn application_class_and_properties_are_migrated_together() {
    let result = rewrite_run(
        catalog(&[spring::SPRING_BOOT_TO_QUARKUS]),
        &[
            ("DemoApplication.java", DEMO_APPLICATION),
            ("src/main/resources/application.properties", APPLICATION_PROPERTIES),
        ],
    );
    assert_eq!(
        after_text(&result.files[0], DEMO_APPLICATION),
        "package com.example;\n\npublic class DemoApplication {\n}\n"
    );
    assert_eq!(
        after_text(&result.files[1], APPLICATION_PROPERTIES),
        "# web\nquarkus.http.port=8081\nquarkus.application.name = shop\ncustom.flag=true\n"
    );
    assert!(result.files[1].recipes.iter().any(|r| r == spring::MIGRATE_APPLICATION_PROPERTIES));
}

#[test]
fn import_still_in_use_is_kept() {
    let text = "import java.util.List;\n\nclass A {\n    List<String> names;\n}\n";
    let catalog = catalog_from_yaml(
        "recipes:\n  - recast.java.RemoveImport:\n      type_name: java.util.List\n",
    );
    let result = rewrite_run(catalog, &[("A.java", text)]);
    assert!(result.files[0].outcome.is_unchanged());
    assert!(result.files[0].mutations.is_empty());
}

#[test]
fn disjoint_recipes_both_apply() {
    let text = "package p;\n\nimport com.acme.Repo;\nimport javax.inject.Named;\n\n@Named(\"shop\")\nclass Shop {\n    Repo repo;\n\n    void f() {\n        repo.findAll();\n    }\n}\n";
    let catalog = catalog_from_yaml(
        "recipes:\n  - recast.java.ChangeAnnotationType:\n      old_type: javax.inject.Named\n      new_type: jakarta.inject.Named\n  - recast.java.ChangeMethodName:\n      method_pattern: com.acme.Repo findAll(..)\n      new_name: listAll\n",
    );
    let result = rewrite_run(catalog, &[("Shop.java", text)]);
    let file = &result.files[0];
    let out = after_text(file, text);
    assert!(out.contains("import jakarta.inject.Named;"));
    assert!(!out.contains("javax"));
    assert!(out.contains("@Named(\"shop\")\nclass Shop {\n    Repo repo;\n"));
    assert!(out.contains("        repo.listAll();\n"));
    assert_eq!(
        file.recipes,
        vec!["recast.java.ChangeAnnotationType", "recast.java.ChangeMethodName"]
    );
}

// ============================================================================
// PROPERTIES OF A RUN
// ============================================================================

#[test]
fn files_without_matches_are_byte_identical() {
    let java = "\u{feff}package a;\r\n\r\nclass Plain {\r\n\tint x ;  // odd spacing\r\n}\r\n";
    let props = "! comment\nkey : value\\\n   continued\n";
    let result = rewrite_run(
        catalog(&[spring::SPRING_BOOT_TO_QUARKUS]),
        &[("Plain.java", java), ("messages.properties", props)],
    );
    assert!(result.files.iter().all(|f| f.outcome.is_unchanged()));
    assert!(result.files.iter().all(|f| f.recipes.is_empty()));
}

#[test]
fn second_run_over_the_output_changes_nothing() {
    let files = [
        ("OrderService.java", ORDER_SERVICE),
        ("DemoApplication.java", DEMO_APPLICATION),
        ("application.properties", APPLICATION_PROPERTIES),
    ];
    let first = rewrite_run(catalog(&[spring::SPRING_BOOT_TO_QUARKUS]), &files);
    let outputs: Vec<(&str, &str)> = files
        .iter()
        .zip(&first.files)
        .map(|((path, before), file)| (*path, after_text(file, before)))
        .collect();
    let second = rewrite_run(catalog(&[spring::SPRING_BOOT_TO_QUARKUS]), &outputs);
    assert!(second.files.iter().all(|f| f.outcome.is_unchanged()));
}

#[test]
fn runs_are_deterministic_across_thread_counts() {
    let files = [
        ("OrderService.java", ORDER_SERVICE),
        ("DemoApplication.java", DEMO_APPLICATION),
        ("application.properties", APPLICATION_PROPERTIES),
    ];
    let texts = |threads| {
        let result = rewrite_run_with(
            catalog(&[spring::SPRING_BOOT_TO_QUARKUS]),
            ComposerOptions {
                threads: Some(threads),
                ..ComposerOptions::default()
            },
            &files,
        );
        files
            .iter()
            .zip(&result.files)
            .map(|((_, before), file)| (after_text(file, before).to_string(), file.recipes.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(texts(1), texts(4));
}

#[test]
fn the_migration_converges_on_its_fixtures() {
    let result = rewrite_run(
        catalog(&[spring::SPRING_BOOT_TO_QUARKUS]),
        &[
            ("OrderService.java", ORDER_SERVICE),
            ("DemoApplication.java", DEMO_APPLICATION),
            ("application.properties", APPLICATION_PROPERTIES),
        ],
    );
    for file in &result.files {
        assert!(file.passes < ComposerOptions::default().max_iterations, "{:?}", file.path);
        assert!(file.diagnostics.iter().all(|d| d.kind != DiagnosticKind::NonConvergence));
    }
}

#[test]
fn mutations_are_attributed_to_catalog_recipes() {
    let result = rewrite_run(catalog(&[spring::SPRING_BOOT_TO_QUARKUS]), &[("OrderService.java", ORDER_SERVICE)]);
    let file = &result.files[0];
    assert!(!file.mutations.is_empty());
    let members: Vec<String> = spring::migration_recipes().iter().map(|r| r.name().to_string()).collect();
    for mutation in &file.mutations {
        assert!(members.contains(&mutation.recipe), "unexpected recipe {}", mutation.recipe);
    }
    assert!(file.recipes.iter().any(|r| r == spring::STEREOTYPE_TO_APPLICATION_SCOPED));
    assert!(file.recipes.iter().any(|r| r == spring::FIELD_INJECTION_TO_CONSTRUCTOR_INJECTION));
}

#[test]
fn a_file_that_does_not_parse_does_not_stop_the_others() {
    let inputs = vec![
        SourceInput::from_bytes("Broken.java", vec![b'c', 0xff, b'{']),
        SourceInput::new("OrderService.java", ORDER_SERVICE),
    ];
    let result = Composer::new(catalog(&[spring::SPRING_BOOT_TO_QUARKUS])).run(inputs);
    assert!(matches!(result.files[0].outcome, FileOutcome::ParseError(_)));
    assert_eq!(after_text(&result.files[1], ORDER_SERVICE), ORDER_SERVICE_MIGRATED);
}

#[test]
fn cancelled_runs_emit_no_changes() {
    let token = CancellationToken::new();
    token.cancel();
    let inputs = vec![SourceInput::new("OrderService.java", ORDER_SERVICE)];
    let result = Composer::new(catalog(&[spring::SPRING_BOOT_TO_QUARKUS])).run_with_cancellation(inputs, &token);
    assert!(matches!(result.files[0].outcome, FileOutcome::Cancelled));
    assert_eq!(result.changed().count(), 0);
}

#[test]
fn ambiguous_matches_are_reported_and_left_alone() {
    let text = "import org.springframework.beans.factory.annotation.Autowired;\n\nclass A {\n    @Autowired(required = false)\n    A(B b) {}\n}\n";
    let result = rewrite_run(catalog(&[spring::AUTOWIRED_TO_INJECT]), &[("A.java", text)]);
    let file = &result.files[0];
    assert!(file.outcome.is_unchanged());
    assert!(file.diagnostics.iter().any(|d| d.kind == DiagnosticKind::MatchAmbiguity));
}
