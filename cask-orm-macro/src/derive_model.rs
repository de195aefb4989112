use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitBool, LitStr, Path};

use crate::{
    derive_attributes::{from_attributes_impl, into_attributes_impl},
    types::{OrmField, named_fields},
};

/// Struct level `#[orm(...)]` options.
#[derive(Default)]
struct ModelOptions {
    table: Option<String>,
    connection: Option<String>,
    incrementing: Option<bool>,
    timestamps: Option<bool>,
    soft_deletes: bool,
    boot: Option<Path>,
}

impl ModelOptions {
    fn parse(ast: &DeriveInput) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in &ast.attrs {
            if !attr.path().is_ident("orm") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let value: LitStr = meta.value()?.parse()?;
                    options.table = Some(value.value());
                } else if meta.path.is_ident("connection") {
                    let value: LitStr = meta.value()?.parse()?;
                    options.connection = Some(value.value());
                } else if meta.path.is_ident("incrementing") {
                    let value: LitBool = meta.value()?.parse()?;
                    options.incrementing = Some(value.value);
                } else if meta.path.is_ident("timestamps") {
                    let value: LitBool = meta.value()?.parse()?;
                    options.timestamps = Some(value.value);
                } else if meta.path.is_ident("soft_deletes") {
                    options.soft_deletes = true;
                } else if meta.path.is_ident("boot") {
                    let value: LitStr = meta.value()?.parse()?;
                    options.boot = Some(value.parse()?);
                } else {
                    return Err(meta.error("unknown orm model attribute"));
                }
                Ok(())
            })?;
        }
        Ok(options)
    }
}

/// Picks the column flagged with `flag`, else a field named `fallback`.
fn timestamp_column(fields: &[OrmField], flag: fn(&OrmField) -> bool, fallback: &str) -> Option<String> {
    fields
        .iter()
        .find(|f| flag(f))
        .or_else(|| fields.iter().find(|f| f.column == fallback))
        .map(|f| f.column.clone())
}

fn optional_str(value: Option<String>) -> TokenStream {
    match value {
        Some(s) => quote! { Some(#s) },
        None => quote! { None },
    }
}

/// Expands the `#[derive(Model)]` macro.
///
/// Generates the `Model` implementation (conventions and column metadata)
/// plus `IntoAttributes` and `FromAttributes`, so the struct can seed an
/// `Instance` and be read back from one.
///
/// Timestamps default to the `created_at`/`updated_at` fields when the
/// struct has them; `#[orm(create_time)]`, `#[orm(update_time)]` and
/// `#[orm(delete_time)]` pick other columns.
pub fn expand(ast: DeriveInput) -> syn::Result<TokenStream> {
    let struct_name = &ast.ident;
    let options = ModelOptions::parse(&ast)?;
    let fields = named_fields(&ast)?;

    let primary_keys: Vec<&OrmField> = fields.iter().filter(|f| f.primary_key).collect();
    if primary_keys.len() > 1 {
        return Err(syn::Error::new_spanned(&primary_keys[1].ident, "only one field can be the primary key"));
    }
    let primary_key = primary_keys.first().map(|f| f.column.clone()).unwrap_or_else(|| "id".to_string());

    let timestamps = options.timestamps.unwrap_or(true);
    let created_at = timestamp_column(&fields, |f| f.create_time, "created_at").filter(|_| timestamps);
    let updated_at = timestamp_column(&fields, |f| f.update_time, "updated_at").filter(|_| timestamps);
    let deleted_at = match fields.iter().find(|f| f.delete_time) {
        Some(field) => Some(field.column.clone()),
        None if options.soft_deletes => Some("deleted_at".to_string()),
        None => None,
    };

    let created_at = optional_str(created_at);
    let updated_at = optional_str(updated_at);
    let deleted_at = optional_str(deleted_at);

    let table = options.table.map(|table| quote! { .with_table(#table) });
    let connection = options.connection.map(|name| quote! { .with_connection(#name) });
    let incrementing = options.incrementing.map(|value| quote! { .with_incrementing(#value) });

    let hidden: Vec<&str> = fields.iter().filter(|f| f.hidden).map(|f| f.column.as_str()).collect();
    let visible: Vec<&str> = fields.iter().filter(|f| f.visible).map(|f| f.column.as_str()).collect();
    if !hidden.is_empty() && !visible.is_empty() {
        return Err(syn::Error::new_spanned(struct_name, "use either hidden or visible fields, not both"));
    }
    let projection = if !visible.is_empty() {
        Some(quote! { .with_visible(&[#(#visible),*]) })
    } else if !hidden.is_empty() {
        Some(quote! { .with_hidden(&[#(#hidden),*]) })
    } else {
        None
    };

    let boot = options.boot.map(|path| {
        quote! {
            fn boot(scopes: &mut cask_orm::ScopeSet) {
                #path(scopes)
            }
        }
    });

    let column_defs = fields.iter().map(|f| {
        let name = &f.column;
        let is_primary_key = f.column == primary_key;
        quote! {
            cask_orm::ColumnInfo {
                name: #name,
                is_primary_key: #is_primary_key,
            }
        }
    });

    let into_attributes = into_attributes_impl(struct_name, &fields);
    let from_attributes = from_attributes_impl(struct_name, &fields);

    Ok(quote! {
        impl cask_orm::Model for #struct_name {
            fn config() -> cask_orm::ModelConfig {
                cask_orm::ModelConfig::for_model(stringify!(#struct_name))
                    #table
                    .with_primary_key(#primary_key)
                    #incrementing
                    #connection
                    .with_created_at(#created_at)
                    .with_updated_at(#updated_at)
                    .with_deleted_at(#deleted_at)
                    #projection
            }

            fn columns() -> Vec<cask_orm::ColumnInfo> {
                vec![#(#column_defs),*]
            }

            #boot
        }

        #into_attributes

        #from_attributes
    })
}
