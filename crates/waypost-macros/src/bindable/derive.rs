//! Implementation of the `#[derive(Bindable)]` macro.
//!
//! Structs with named fields become complex models with one property per
//! field. Enums with unit variants become simple enum types matched by
//! variant name.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    parse_quote, spanned::Spanned, Data, DataEnum, DeriveInput, Error, Fields, FieldsNamed,
    Result,
};

use super::attrs::{
    apply_rename_all, parse_bind_attrs, parse_bindable_attrs, parse_serde_names, BindableAttr,
    Rule, SerdeNames,
};

/// Main implementation of the Bindable derive macro.
pub fn bindable_derive_impl(mut input: DeriveInput) -> Result<TokenStream> {
    let container = parse_bindable_attrs(&input.attrs)?;
    let serde_names = parse_serde_names(&input.attrs)?;

    let type_params: Vec<_> = input.generics.type_params().map(|p| p.ident.clone()).collect();
    if !type_params.is_empty() {
        let where_clause = input.generics.make_where_clause();
        for param in type_params {
            where_clause
                .predicates
                .push(parse_quote!(#param: ::waypost_binding::Bindable));
        }
    }

    let body = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => struct_metadata(named, &container, &serde_names)?,
            _ => {
                return Err(Error::new(
                    input.span(),
                    "Bindable can only be derived for structs with named fields",
                ))
            }
        },
        Data::Enum(data) => enum_metadata(data, &container, &serde_names)?,
        Data::Union(_) => {
            return Err(Error::new(
                input.span(),
                "Bindable can only be derived for structs and enums",
            ))
        }
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::waypost_binding::Bindable for #name #ty_generics #where_clause {
            fn model_metadata() -> ::waypost_binding::ModelMetadata {
                #body
            }
        }
    })
}

fn struct_metadata(
    fields: &FieldsNamed,
    container: &BindableAttr,
    serde_names: &SerdeNames,
) -> Result<TokenStream> {
    let mut properties = Vec::new();

    for field in &fields.named {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new(field.span(), "expected named field"))?;
        let bind = parse_bind_attrs(&field.attrs)?;
        let field_serde = parse_serde_names(&field.attrs)?;
        if bind.skip || field_serde.skip {
            continue;
        }

        let raw_name = ident.to_string();
        let raw_name = raw_name.trim_start_matches("r#");
        let key = match (&field_serde.rename, &serde_names.rename_all) {
            (Some(rename), _) => rename.clone(),
            (None, Some(rule)) => apply_rename_all(rule, raw_name, ident.span())?,
            (None, None) => raw_name.to_string(),
        };
        let binding_name = bind.rename.clone().unwrap_or_else(|| key.clone());

        let ty = &field.ty;
        let mut property = quote! {
            ::waypost_binding::PropertyMetadata::new(
                #binding_name,
                <#ty as ::waypost_binding::Bindable>::model_metadata,
            )
        };
        if binding_name != key {
            property = quote! { #property.field(#key) };
        }
        if bind.read_only {
            property = quote! { #property.read_only() };
        }
        if bind.keep_empty {
            property = quote! { #property.keep_empty_strings() };
        }
        if let Some(display) = &bind.display {
            property = quote! { #property.display_name(#display) };
        }
        for rule in &bind.rules {
            let validator = validator_tokens(rule, &raw_name.to_string());
            property = quote! { #property.validator(#validator) };
        }
        if let Some(setter) = &bind.setter {
            property = quote! { #property.setter(#setter) };
        }
        properties.push(property);
    }

    let mut metadata = quote! {
        ::waypost_binding::ModelMetadata::complex::<Self>(::std::vec![#(#properties),*])
    };
    if container.include.is_some() || container.exclude.is_some() {
        let include = container.include.clone().unwrap_or_default();
        let exclude = container.exclude.clone().unwrap_or_default();
        metadata = quote! {
            #metadata.with_bind_filter(::waypost_binding::BindFilter::from_lists(#include, #exclude))
        };
    }
    if let Some(display) = &container.display {
        metadata = quote! { #metadata.with_display_name(#display) };
    }
    if container.default {
        metadata = quote! {
            #metadata.with_create_model(|| {
                ::waypost_binding::__private::serde_json::to_value(
                    <Self as ::std::default::Default>::default(),
                )
                .unwrap_or(::waypost_binding::__private::serde_json::Value::Null)
            })
        };
    }
    Ok(metadata)
}

fn validator_tokens(rule: &Rule, field: &str) -> TokenStream {
    let with_message = |validator: TokenStream, message: &Option<String>| match message {
        Some(m) => quote! { #validator.with_message(#m) },
        None => validator,
    };

    match rule {
        Rule::Required { message } => {
            with_message(quote! { ::waypost_binding::Validator::required() }, message)
        }
        Rule::Length { min, max, message } => {
            let max = *max as usize;
            let mut validator = quote! { ::waypost_binding::Validator::string_length(#max) };
            if let Some(min) = min {
                let min = *min as usize;
                validator = quote! { #validator.with_min_length(#min) };
            }
            with_message(validator, message)
        }
        Rule::Range { min, max, message } => with_message(
            quote! { ::waypost_binding::Validator::range(#min, #max) },
            message,
        ),
        // Checked at expansion time in `parse_pattern`, so the error arm
        // only fires if the two regex versions disagree.
        Rule::Pattern(pattern) => {
            let panic_message = format!("invalid #[bind(pattern)] on field `{}`: {{}}", field);
            quote! {
                match ::waypost_binding::Validator::pattern(#pattern) {
                    ::std::result::Result::Ok(v) => v,
                    ::std::result::Result::Err(e) => ::std::panic!(#panic_message, e),
                }
            }
        }
        Rule::Custom(path) => quote! { ::waypost_binding::Validator::custom(#path) },
    }
}

fn enum_metadata(
    data: &DataEnum,
    container: &BindableAttr,
    serde_names: &SerdeNames,
) -> Result<TokenStream> {
    let mut names = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(Error::new(
                variant.span(),
                "Bindable enums may only have unit variants",
            ));
        }
        let variant_serde = parse_serde_names(&variant.attrs)?;
        if variant_serde.skip {
            continue;
        }
        let raw = variant.ident.to_string();
        let name = match (&variant_serde.rename, &serde_names.rename_all) {
            (Some(rename), _) => rename.clone(),
            (None, Some(rule)) => apply_rename_all(rule, &raw, variant.ident.span())?,
            (None, None) => raw,
        };
        names.push(name);
    }

    let mut metadata = quote! {
        ::waypost_binding::ModelMetadata::simple::<Self>(
            ::waypost_binding::SimpleType::Enum(&[#(#names),*])
        )
    };
    if let Some(display) = &container.display {
        metadata = quote! { #metadata.with_display_name(#display) };
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(src: &str) -> Result<String> {
        let input: DeriveInput = syn::parse_str(src)?;
        bindable_derive_impl(input).map(|t| t.to_string())
    }

    #[test]
    fn test_struct_expansion() {
        let out = expand(
            r#"
            #[serde(rename_all = "camelCase")]
            struct Signup {
                #[bind(required, display = "E-mail")]
                email_address: String,
                #[serde(skip)]
                token: String,
                #[bind(rename = "Age")]
                age: u8,
            }
            "#,
        )
        .unwrap();
        assert!(out.contains("\"emailAddress\""));
        assert!(out.contains("Validator :: required ()"));
        assert!(out.contains("display_name (\"E-mail\")"));
        assert!(!out.contains("token"));
        assert!(out.contains(". field (\"age\")"));
    }

    #[test]
    fn test_enum_expansion() {
        let out = expand(
            r#"
            enum Color { Red, #[serde(rename = "verde")] Green }
            "#,
        )
        .unwrap();
        assert!(out.contains("SimpleType :: Enum (& [\"Red\" , \"verde\"])"));
    }

    #[test]
    fn test_rejects_tuple_structs_and_data_enums() {
        assert!(expand("struct Pair(u8, u8);").is_err());
        let err = expand("enum E { A(u8) }").unwrap_err();
        assert!(err.to_string().contains("unit variants"));
    }

    #[test]
    fn test_generic_bounds() {
        let out = expand("struct Page<T> { items: Vec<T> }").unwrap();
        assert!(out.contains("T : :: waypost_binding :: Bindable"));
    }

    #[test]
    fn test_container_options() {
        let out = expand(
            r#"
            #[bindable(default, exclude = "id")]
            struct Item { id: u32, name: String }
            "#,
        )
        .unwrap();
        assert!(out.contains("BindFilter :: from_lists (\"\" , \"id\")"));
        assert!(out.contains("with_create_model"));
    }
}
