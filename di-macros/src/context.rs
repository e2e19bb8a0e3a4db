//! Implementation of #[derive(Context)].

use std::collections::HashMap;

use proc_macro::TokenStream;
use quote::{quote, ToTokens};
use syn::{parse_macro_input, DeriveInput};

use crate::fields::named_fields;

pub fn derive_context_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> Result<proc_macro2::TokenStream, syn::Error> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Two fields of one type would give two conflicting impls.
    let mut seen: HashMap<String, &syn::Ident> = HashMap::new();
    let mut impls = Vec::new();

    for field in named_fields(input, "Context")? {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let field_type = &field.ty;

        let key = field_type.to_token_stream().to_string();
        if let Some(previous) = seen.insert(key, field_name) {
            return Err(syn::Error::new_spanned(
                field_type,
                format!(
                    "`{}` has the same type as `{}`; wrap one in a distinct type",
                    field_name, previous
                ),
            ));
        }

        impls.push(quote! {
            impl #impl_generics crate::FromRef<#name #ty_generics> for #field_type #where_clause {
                fn from_ref(ctx: &#name #ty_generics) -> Self {
                    ctx.#field_name.clone()
                }
            }
        });
    }

    Ok(quote! { #(#impls)* })
}
