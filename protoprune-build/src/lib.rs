//! `protoprune-build` loads `.proto` schemas at build time, prunes them down to
//! the types a build actually needs, and hands the result to code generators.
//!
//! # Example
//!
//! ```rust,no_run
//! // In build.rs
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     protoprune_build::Config::new()
//!         .proto_path("proto")
//!         .proto_file("shop/order.proto")
//!         .include("shop.Order")
//!         .file_descriptor_set_path("target/shop.bin")
//!         .compile()?;
//!     Ok(())
//! }
//! ```
//!
//! # Pruning Rules
//!
//! Rules name a fully-qualified type (`shop.Order`, `shop.Order.Line`) or a
//! package wildcard (`shop.*`, which also covers `shop.v1.Cart` but not
//! `shopping.Cart`).
//!
//! - **Includes** are roots: they are kept together with every type they
//!   reference, transitively. With no includes, every top-level type is a root.
//! - **Excludes** are removed even when an include matches them too. Excluding
//!   a type that a kept type still references is an error rather than a
//!   silently broken schema.
//!
//! Rules that matched nothing are logged as warnings and listed in the
//! returned [`Report`].
//!
//! # Generating Code
//!
//! Code generation is left to an [`Emitter`], called once per top-level type of
//! each requested file after pruning:
//!
//! ```rust,no_run
//! use protoprune_build::{Config, Error, Generated, GenerationOptions, Schema, TypeNode};
//!
//! fn main() -> Result<(), Error> {
//!     let emitter = |_: &Schema, node: &TypeNode, _: &GenerationOptions| -> Result<Generated, Error> {
//!         Ok(Generated {
//!             target: node.name().to_string(),
//!             path: format!("{}.txt", node.name()).into(),
//!             contents: format!("{} {}\n", node.kind().label(), node.name()),
//!         })
//!     };
//!     Config::new()
//!         .proto_file("shop/order.proto")
//!         .exclude("shop.internal.*")
//!         .compile_with_emitter(&emitter)?;
//!     Ok(())
//! }
//! ```

mod config;
pub mod descriptor;
mod emit;
mod error;
mod load;
mod pipeline;
mod protoc;
mod prune;
mod rules;
mod schema;

pub use config::{Config, GenerationOptions};
pub use emit::{Emitter, Generated};
pub use error::{DecodeError, Error};
pub use load::{DescriptorSetLoader, Loader, ProtocLoader};
pub use pipeline::{run, Report};
pub use prune::{prune, UsageTracker};
pub use rules::{Identifier, RuleSet, RuleSetBuilder};
pub use schema::{ProtoFile, Reachable, Schema, TypeKind, TypeNode};

use std::path::Path;

/// Load `protos` from `proto_paths`, prune with `includes` and `excludes`, and
/// write the pruned FileDescriptorSet to `out`.
///
/// ```rust,no_run
/// fn main() -> Result<(), protoprune_build::Error> {
///     protoprune_build::prune_protos(
///         &["shop/order.proto"],
///         &["proto/"],
///         &["shop.Order"],
///         &[] as &[&str],
///         "target/shop.bin",
///     )?;
///     Ok(())
/// }
/// ```
pub fn prune_protos(
    protos: &[impl AsRef<str>],
    proto_paths: &[impl AsRef<Path>],
    includes: &[impl AsRef<str>],
    excludes: &[impl AsRef<str>],
    out: impl AsRef<Path>,
) -> Result<Report, Error> {
    let mut config = Config::new();
    for proto in protos {
        config.proto_file(proto.as_ref());
    }
    for path in proto_paths {
        config.proto_path(path);
    }
    for include in includes {
        config.include(include.as_ref());
    }
    for exclude in excludes {
        config.exclude(exclude.as_ref());
    }
    config.file_descriptor_set_path(out).compile()
}
