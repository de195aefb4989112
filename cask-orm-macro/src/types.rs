//! Field parsing shared by the derives.

use syn::{Data, DeriveInput, Fields, Ident, LitStr, Type, ext::IdentExt};

/// A named struct field and its `#[orm(...)]` options.
pub struct OrmField {
    pub ident: Ident,
    pub ty: Type,
    /// Column name: the field name without `r#`, or `#[orm(column = "...")]`.
    pub column: String,
    pub primary_key: bool,
    pub create_time: bool,
    pub update_time: bool,
    pub delete_time: bool,
    pub hidden: bool,
    pub visible: bool,
}

impl OrmField {
    fn parse(field: &syn::Field) -> syn::Result<Self> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let mut parsed = Self {
            column: ident.unraw().to_string(),
            ident,
            ty: field.ty.clone(),
            primary_key: false,
            create_time: false,
            update_time: false,
            delete_time: false,
            hidden: false,
            visible: false,
        };

        for attr in &field.attrs {
            if !attr.path().is_ident("orm") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("primary_key") {
                    parsed.primary_key = true;
                } else if meta.path.is_ident("create_time") {
                    parsed.create_time = true;
                } else if meta.path.is_ident("update_time") {
                    parsed.update_time = true;
                } else if meta.path.is_ident("delete_time") {
                    parsed.delete_time = true;
                } else if meta.path.is_ident("hidden") {
                    parsed.hidden = true;
                } else if meta.path.is_ident("visible") {
                    parsed.visible = true;
                } else if meta.path.is_ident("column") {
                    let value: LitStr = meta.value()?.parse()?;
                    parsed.column = value.value();
                } else {
                    return Err(meta.error("unknown orm field attribute"));
                }
                Ok(())
            })?;
        }

        if parsed.hidden && parsed.visible {
            return Err(syn::Error::new_spanned(&parsed.ident, "a field cannot be both hidden and visible"));
        }
        Ok(parsed)
    }
}

/// Parses the named fields of a struct.
pub fn named_fields(ast: &DeriveInput) -> syn::Result<Vec<OrmField>> {
    let fields = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => return Err(syn::Error::new_spanned(&ast.ident, "expected a struct with named fields")),
        },
        _ => return Err(syn::Error::new_spanned(&ast.ident, "expected a struct")),
    };
    fields.iter().map(OrmField::parse).collect()
}

