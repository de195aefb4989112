//! # Cask ORM Procedural Macros
//!
//! Derives used by `cask-orm`:
//!
//! - `Model`: conventions, column metadata and attribute conversions of a
//!   model struct.
//! - `FromAttributes`: typed projections of query results.
//! - `CaskEnum`: fieldless enums stored as text.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod derive_attributes;
mod derive_enum;
mod derive_model;
mod types;

/// Derives `cask_orm::Model`, `IntoAttributes` and `FromAttributes`.
///
/// Struct attributes: `#[orm(table = "...", connection = "...",
/// incrementing = false, timestamps = false, soft_deletes, boot = "path")]`.
///
/// Field attributes: `primary_key`, `column = "..."`, `create_time`,
/// `update_time`, `delete_time`, `hidden`, `visible`.
#[proc_macro_derive(Model, attributes(orm))]
pub fn model_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    derive_model::expand(ast).unwrap_or_else(syn::Error::into_compile_error).into()
}

/// Derives `cask_orm::FromAttributes`.
#[proc_macro_derive(FromAttributes, attributes(orm))]
pub fn from_attributes_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    derive_attributes::expand(ast).unwrap_or_else(syn::Error::into_compile_error).into()
}

/// Derives `Display`, `FromStr` and the `cask_orm::Value` conversions for a
/// fieldless enum.
#[proc_macro_derive(CaskEnum, attributes(orm))]
pub fn cask_enum_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    derive_enum::expand(ast).unwrap_or_else(syn::Error::into_compile_error).into()
}
