use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr};

use crate::types::is_nullable;

/// Expands the `#[derive(Model)]` macro.
///
/// This function parses the struct and its `#[orm(...)]` attributes to generate:
/// 1. `PropertyInfo` metadata for every mapped field.
/// 2. The `impl Model` block with `type_name`, `table_annotation`, `properties`
///    and the `set_property` dispatcher used when hydrating rows.
pub fn expand(ast: DeriveInput) -> syn::Result<TokenStream> {
    let struct_name = &ast.ident;
    let struct_name_str = struct_name.to_string();

    let fields = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => return Err(syn::Error::new_spanned(struct_name, "Model must have named fields")),
        },
        _ => return Err(syn::Error::new_spanned(struct_name, "Model must be a struct")),
    };

    // Struct level: #[orm(table = "...")]
    let mut table: Option<String> = None;
    for attr in &ast.attrs {
        if attr.path().is_ident("orm") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let value: LitStr = meta.value()?.parse()?;
                    table = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported model attribute, expected `table = \"...\"`"))
                }
            })?;
        }
    }
    let table_tokens = match &table {
        Some(name) => quote! { Some(#name) },
        None => quote! { None },
    };

    let mut property_defs = Vec::new();
    let mut set_arms = Vec::new();

    for field in fields {
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let field_type = &field.ty;
        let raw_name = field_ident.to_string();
        let property = raw_name.strip_prefix("r#").unwrap_or(&raw_name).to_string();

        let mut column: Option<String> = None;
        let mut is_primary_key = false;
        let mut skip = false;
        let mut foreign_table_tokens = quote! { None };
        let mut foreign_key_tokens = quote! { None };

        for attr in &field.attrs {
            if !attr.path().is_ident("orm") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("column") {
                    let value: LitStr = meta.value()?.parse()?;
                    column = Some(value.value());
                } else if meta.path.is_ident("primary_key") {
                    is_primary_key = true;
                } else if meta.path.is_ident("skip") {
                    skip = true;
                } else if meta.path.is_ident("foreign_key") {
                    let value: LitStr = meta.value()?.parse()?;
                    let fk_string = value.value();
                    let parts: Vec<&str> = fk_string.split("::").collect();

                    if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
                        let table = parts[0];
                        let col = parts[1];
                        foreign_table_tokens = quote! { Some(#table) };
                        foreign_key_tokens = quote! { Some(#col) };
                    } else {
                        return Err(meta.error("Invalid format for foreign_key. Use 'table::column'"));
                    }
                } else {
                    return Err(meta.error("unsupported field attribute"));
                }
                Ok(())
            })?;
        }

        if skip {
            continue;
        }

        let column_tokens = match &column {
            Some(name) => quote! { Some(#name) },
            None => quote! { None },
        };
        let nullable = is_nullable(field_type);

        property_defs.push(quote! {
            pgmodel::PropertyInfo {
                name: #property,
                column: #column_tokens,
                is_primary_key: #is_primary_key,
                is_nullable: #nullable,
                foreign_table: #foreign_table_tokens,
                foreign_key: #foreign_key_tokens,
            }
        });

        set_arms.push(quote! {
            #property => {
                self.#field_ident = pgmodel::model::decode_property::<#field_type>(#struct_name_str, property, value)?;
                Ok(())
            }
        });
    }

    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics pgmodel::Model for #struct_name #ty_generics #where_clause {
            fn type_name() -> &'static str {
                #struct_name_str
            }

            fn table_annotation() -> Option<&'static str> {
                #table_tokens
            }

            fn properties() -> Vec<pgmodel::PropertyInfo> {
                vec![#(#property_defs),*]
            }

            #[allow(unused_variables)]
            fn set_property(&mut self, property: &str, value: &pgmodel::Value) -> Result<(), pgmodel::Error> {
                match property {
                    #(#set_arms)*
                    _ => Err(pgmodel::Error::MissingProperty {
                        model: #struct_name_str.to_string(),
                        name: property.to_string(),
                    }),
                }
            }
        }
    })
}
