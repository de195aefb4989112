//! # Derive FromAttributes Module
//!
//! Conversion between a struct and `cask_orm::Attributes`. Every field is
//! read with `Attributes::get_as`, so `Option<T>` fields accept missing and
//! `NULL` columns while other fields report a conversion error.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Ident};

use crate::types::{OrmField, named_fields};

/// Expands `#[derive(FromAttributes)]`, used for projections that are not
/// models (joins, aggregates, partial selects).
pub fn expand(ast: DeriveInput) -> syn::Result<TokenStream> {
    let fields = named_fields(&ast)?;
    Ok(from_attributes_impl(&ast.ident, &fields))
}

pub fn from_attributes_impl(name: &Ident, fields: &[OrmField]) -> TokenStream {
    let reads = fields.iter().map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let column = &f.column;
        quote! {
            #ident: attributes.get_as::<#ty>(#column)?,
        }
    });

    quote! {
        impl cask_orm::FromAttributes for #name {
            fn from_attributes(attributes: &cask_orm::Attributes) -> cask_orm::Result<Self> {
                Ok(Self {
                    #(#reads)*
                })
            }
        }
    }
}

pub fn into_attributes_impl(name: &Ident, fields: &[OrmField]) -> TokenStream {
    let inserts = fields.iter().map(|f| {
        let ident = &f.ident;
        let column = &f.column;
        quote! {
            attributes.insert(#column, self.#ident);
        }
    });

    quote! {
        impl cask_orm::IntoAttributes for #name {
            fn into_attributes(self) -> cask_orm::Attributes {
                let mut attributes = cask_orm::Attributes::new();
                #(#inserts)*
                attributes
            }
        }
    }
}
