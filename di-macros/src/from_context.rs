//! Implementation of #[derive(FromContext)].

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

use crate::fields::named_fields;

pub fn derive_from_context_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> Result<proc_macro2::TokenStream, syn::Error> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let context_type = parse_context_type(input)?;

    let mut field_inits = Vec::new();
    for field in named_fields(input, "FromContext")? {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let field_type = &field.ty;

        field_inits.push(quote! {
            #field_name: <#field_type as crate::FromRef<#context_type>>::from_ref(ctx)
        });
    }

    Ok(quote! {
        impl #impl_generics crate::FromRef<#context_type> for #name #ty_generics #where_clause {
            fn from_ref(ctx: &#context_type) -> Self {
                Self {
                    #(#field_inits),*
                }
            }
        }
    })
}

/// The `#[from_context(Context = "...")]` type, `AppContext` otherwise.
fn parse_context_type(input: &DeriveInput) -> Result<proc_macro2::TokenStream, syn::Error> {
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("from_context")) {
        let mut context_ty: Option<syn::Type> = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("Context") {
                let value: syn::LitStr = meta.value()?.parse()?;
                context_ty = Some(value.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `Context = \"Type\"`"))
            }
        })?;

        if let Some(ty) = context_ty {
            return Ok(quote! { #ty });
        }
    }

    Ok(quote! { AppContext })
}
