//! # pgmodel-macro
//!
//! Procedural macros for `pgmodel`. The only derive is `Model`, which reads
//! `#[orm(...)]` attributes and generates the reflection hooks the runtime
//! crate uses to map rows onto struct fields.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod derive_model;
mod types;

/// Derives `pgmodel::Model` for a struct with named fields.
///
/// Struct attributes:
/// * `#[orm(table = "name")]` - explicit table name.
///
/// Field attributes:
/// * `#[orm(column = "name")]` - column the field is read from.
/// * `#[orm(primary_key)]`
/// * `#[orm(foreign_key = "table::column")]`
/// * `#[orm(skip)]` - the field is never populated from a row.
#[proc_macro_derive(Model, attributes(orm))]
pub fn model_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    derive_model::expand(ast).unwrap_or_else(syn::Error::into_compile_error).into()
}
