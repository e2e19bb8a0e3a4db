//! Field extraction shared by both derives.

use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{Data, DeriveInput, Field, Fields};

/// Named fields of a struct, or an error naming the derive.
pub fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> Result<&'a Punctuated<Field, Comma>, syn::Error> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                input,
                format!("{} can only be derived for structs with named fields", derive),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            input,
            format!("{} can only be derived for structs", derive),
        )),
    }
}
