//! Spring Boot to Quarkus migration.
//!
//! Each concern is its own recipe so it can be run and tested alone;
//! `recast.spring.SpringBootToQuarkus` runs all of them in the order below.
//!
//! | Recipe | Rewrites |
//! |---|---|
//! | `StereotypeToApplicationScoped` | `@Service`, `@Component`, `@Repository`, `@Configuration` |
//! | `FieldInjectionToConstructorInjection` | `@Autowired` fields of a class without constructors |
//! | `AutowiredToInject` | remaining `@Autowired` |
//! | `ValueToConfigProperty` | `@Value("${key:default}")` |
//! | `ConfigurationPropertiesToConfigMapping` | `@ConfigurationProperties` |
//! | `EventListenerToObserves` | `@EventListener` methods |
//! | `BeanToProduces` | `@Bean` methods and their `@Scope` |
//! | `RemoveSpringBootApplication` | `@SpringBootApplication` and its `main` |
//! | `SpringApplicationRunToQuarkusRun` | other `SpringApplication.run(..)` calls |
//! | `RemoveEmptyMainMethod` | `main` methods left empty |
//! | `MigrateApplicationProperties` | keys of `application*.properties` |

use std::sync::Arc;

use crate::matcher::MatchScope;
use crate::recipe::{Recipe, RecipeBuilder, RecipeRegistry};
use crate::syntax::{NodeId, SyntaxKind, SyntaxNode};
use crate::types::Resolution;
use crate::visitor::edit::{self, AnnotationPosition};
use crate::visitor::{Template, VisitContext};

mod beans;
mod boot;
mod config;
mod events;
mod injection;
mod properties;
mod stereotypes;

pub use beans::{bean_to_produces, BEAN_TO_PRODUCES};
pub use boot::{
    remove_empty_main_method, remove_spring_boot_application, spring_application_run_to_quarkus_run,
    REMOVE_EMPTY_MAIN_METHOD, REMOVE_SPRING_BOOT_APPLICATION, SPRING_APPLICATION_RUN_TO_QUARKUS_RUN,
};
pub use config::{
    configuration_properties_to_config_mapping, value_to_config_property, CONFIGURATION_PROPERTIES_TO_CONFIG_MAPPING,
    VALUE_TO_CONFIG_PROPERTY,
};
pub use events::{event_listener_to_observes, EVENT_LISTENER_TO_OBSERVES};
pub use injection::{
    autowired_to_inject, field_injection_to_constructor_injection, AUTOWIRED_TO_INJECT,
    FIELD_INJECTION_TO_CONSTRUCTOR_INJECTION,
};
pub use properties::{migrate_application_properties, quarkus_key, MIGRATE_APPLICATION_PROPERTIES};
pub use stereotypes::{stereotype_to_application_scoped, STEREOTYPE_TO_APPLICATION_SCOPED};

pub const SPRING_BOOT_TO_QUARKUS: &str = "recast.spring.SpringBootToQuarkus";

// Spring
pub const AUTOWIRED: &str = "org.springframework.beans.factory.annotation.Autowired";
pub const VALUE: &str = "org.springframework.beans.factory.annotation.Value";
pub const SERVICE: &str = "org.springframework.stereotype.Service";
pub const COMPONENT: &str = "org.springframework.stereotype.Component";
pub const REPOSITORY: &str = "org.springframework.stereotype.Repository";
pub const CONFIGURATION: &str = "org.springframework.context.annotation.Configuration";
pub const BEAN: &str = "org.springframework.context.annotation.Bean";
pub const SCOPE: &str = "org.springframework.context.annotation.Scope";
pub const CONFIGURABLE_BEAN_FACTORY: &str = "org.springframework.beans.factory.config.ConfigurableBeanFactory";
pub const EVENT_LISTENER: &str = "org.springframework.context.event.EventListener";
pub const CONFIGURATION_PROPERTIES: &str = "org.springframework.boot.context.properties.ConfigurationProperties";
pub const SPRING_BOOT_APPLICATION: &str = "org.springframework.boot.autoconfigure.SpringBootApplication";
pub const SPRING_APPLICATION: &str = "org.springframework.boot.SpringApplication";

// Quarkus, CDI and MicroProfile
pub const APPLICATION_SCOPED: &str = "jakarta.enterprise.context.ApplicationScoped";
pub const DEPENDENT: &str = "jakarta.enterprise.context.Dependent";
pub const INJECT: &str = "jakarta.inject.Inject";
pub const NAMED: &str = "jakarta.inject.Named";
pub const PRODUCES: &str = "jakarta.enterprise.inject.Produces";
pub const OBSERVES: &str = "jakarta.enterprise.event.Observes";
pub const CONFIG_PROPERTY: &str = "org.eclipse.microprofile.config.inject.ConfigProperty";
pub const CONFIG_MAPPING: &str = "io.smallrye.config.ConfigMapping";
pub const QUARKUS: &str = "io.quarkus.runtime.Quarkus";

const STEREOTYPES: &[&str] = &[SERVICE, COMPONENT, REPOSITORY, CONFIGURATION];

/// Bean-defining CDI scope annotations.
const CDI_SCOPES: &[&str] = &[
    APPLICATION_SCOPED,
    DEPENDENT,
    "jakarta.enterprise.context.RequestScoped",
    "jakarta.enterprise.context.SessionScoped",
    "jakarta.inject.Singleton",
];

/// The member recipes of the migration, in the order they run.
pub fn migration_recipes() -> Vec<Arc<dyn Recipe>> {
    vec![
        stereotype_to_application_scoped().into_arc(),
        field_injection_to_constructor_injection().into_arc(),
        autowired_to_inject().into_arc(),
        value_to_config_property().into_arc(),
        configuration_properties_to_config_mapping().into_arc(),
        event_listener_to_observes().into_arc(),
        bean_to_produces().into_arc(),
        remove_spring_boot_application().into_arc(),
        spring_application_run_to_quarkus_run().into_arc(),
        remove_empty_main_method().into_arc(),
        migrate_application_properties().into_arc(),
    ]
}

pub fn register(registry: &mut RecipeRegistry) {
    let members = migration_recipes();
    let mut composite = RecipeBuilder::new(SPRING_BOOT_TO_QUARKUS)
        .description("Migrates a Spring Boot application to Quarkus: beans, injection, configuration, events and the application class.");
    for recipe in members {
        composite = composite.recipe(recipe.clone());
        registry.register(recipe);
    }
    registry.register(composite.build().into_arc());
}

// ============================================================================
// SHARED EDITS
// ============================================================================

/// Every annotation of `decl` with its resolved type.
pub(crate) fn annotations_of(decl: &SyntaxNode, scope: &MatchScope<'_>) -> Vec<(SyntaxNode, Option<String>)> {
    decl.child(SyntaxKind::Modifiers)
        .map(|modifiers| {
            modifiers
                .children_of(SyntaxKind::Annotation)
                .map(|annotation| {
                    let fqn = match scope.type_of(annotation) {
                        Resolution::Resolved(fqn) => Some(fqn),
                        _ => None,
                    };
                    (annotation.clone(), fqn)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Swaps the annotation with id `id` among the modifiers of `decl`.
pub(crate) fn replace_annotation(decl: &SyntaxNode, id: NodeId, annotation: SyntaxNode) -> SyntaxNode {
    edit::map_child(decl, SyntaxKind::Modifiers, |modifiers| {
        match modifiers.children().iter().position(|c| c.id() == id) {
            Some(index) => edit::replace_child(modifiers, index, annotation),
            None => modifiers.clone(),
        }
    })
}

/// Adds the annotation written as `code` (referring to `fqn` by simple name)
/// to `decl` and requests its import.
pub(crate) fn add_annotation(
    decl: &SyntaxNode,
    code: &str,
    fqn: &str,
    position: AnnotationPosition,
    ctx: &mut VisitContext<'_>,
) -> SyntaxNode {
    let template = Template::new(code).with_imports([fqn]);
    match template.annotation() {
        Ok(annotation) => {
            ctx.add_template_imports(&template);
            edit::insert_annotation(decl, annotation, position)
        }
        Err(e) => {
            tracing::warn!(recipe = %ctx.recipe(), error = %e.message(), "annotation template failed");
            decl.clone()
        }
    }
}
