//! # Enum Derive Macro Implementation
//!
//! `#[derive(CaskEnum)]` stores a fieldless enum as text. It generates
//! `Display` and `FromStr` plus the `Value` conversions, so the enum can be
//! a model field.
//!
//! Variant names are used as is unless the enum carries
//! `#[orm(rename_all = "snake_case")]` (also `"lowercase"`,
//! `"SCREAMING_SNAKE_CASE"`, `"kebab-case"`).

use heck::{ToKebabCase, ToShoutySnakeCase, ToSnakeCase};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr};

fn rename_rule(ast: &DeriveInput) -> syn::Result<Option<String>> {
    let mut rule = None;
    for attr in &ast.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                let value: LitStr = meta.value()?.parse()?;
                match value.value().as_str() {
                    "snake_case" | "lowercase" | "SCREAMING_SNAKE_CASE" | "kebab-case" => rule = Some(value.value()),
                    _ => return Err(syn::Error::new_spanned(value, "unsupported rename_all rule")),
                }
                Ok(())
            } else {
                Err(meta.error("unknown orm enum attribute"))
            }
        })?;
    }
    Ok(rule)
}

fn rename(variant: &str, rule: Option<&str>) -> String {
    match rule {
        Some("snake_case") => variant.to_snake_case(),
        Some("lowercase") => variant.to_lowercase(),
        Some("SCREAMING_SNAKE_CASE") => variant.to_shouty_snake_case(),
        Some("kebab-case") => variant.to_kebab_case(),
        _ => variant.to_string(),
    }
}

/// Expands the `#[derive(CaskEnum)]` macro.
pub fn expand(ast: DeriveInput) -> syn::Result<TokenStream> {
    let name = &ast.ident;

    let variants = match &ast.data {
        Data::Enum(data_enum) => &data_enum.variants,
        _ => return Err(syn::Error::new_spanned(name, "CaskEnum can only be derived for enums")),
    };
    if let Some(variant) = variants.iter().find(|v| !matches!(v.fields, Fields::Unit)) {
        return Err(syn::Error::new_spanned(variant, "CaskEnum variants cannot carry data"));
    }

    let rule = rename_rule(&ast)?;
    let labels: Vec<String> = variants.iter().map(|v| rename(&v.ident.to_string(), rule.as_deref())).collect();
    let idents: Vec<_> = variants.iter().map(|v| &v.ident).collect();

    Ok(quote! {
        impl std::fmt::Display for #name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    #(Self::#idents => f.write_str(#labels),)*
                }
            }
        }

        impl std::str::FromStr for #name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    #(#labels => Ok(Self::#idents),)*
                    _ => Err(format!("Unknown variant: {}", s)),
                }
            }
        }

        impl From<#name> for cask_orm::Value {
            fn from(value: #name) -> Self {
                cask_orm::Value::Text(value.to_string())
            }
        }

        impl cask_orm::FromValue for #name {
            fn from_value(value: &cask_orm::Value) -> Option<Self> {
                value.as_str().and_then(|s| s.parse().ok())
            }
        }
    })
}
