//! The `recast` binary.
//!
//! ## Usage
//! ```bash
//! recast diff path/to/project
//! recast run --apply -r recast.spring.SpringBootToQuarkus path/to/project
//! recast list-recipes
//! ```

fn main() {
    recast::cli::run();
}
