//! Handler-related macros.
//!
//! This module contains:
//! - `#[handler]` - Attribute macro turning a function into a `Handler`

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Attribute, FnArg, Ident, ItemFn, Lit, LitStr, Pat, PatType, Token, parse::Parse,
    parse_macro_input,
};

/// Arguments for the `#[handler]` macro.
pub(crate) struct HandlerArgs {
    pub name: Option<String>,
}

impl Parse for HandlerArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut name = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "name" => {
                    let lit: LitStr = input.parse()?;
                    name = Some(lit.value());
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(HandlerArgs { name })
    }
}

/// Descriptor entry for one parameter: its bound name plus an optional default.
fn describe_param(pat_type: &PatType) -> syn::Result<String> {
    let name = match &*pat_type.pat {
        Pat::Ident(pat_ident) => pat_ident.ident.to_string(),
        other => {
            return Err(syn::Error::new_spanned(
                other,
                "handler parameters must be plain identifiers; the name is what gets bound",
            ));
        }
    };
    let name = name.trim_start_matches('_');
    if name.is_empty() {
        return Err(syn::Error::new_spanned(
            &pat_type.pat,
            "handler parameter name must not be only underscores",
        ));
    }

    match default_attr(&pat_type.attrs)? {
        Some(default) => Ok(format!("{name} = {default}")),
        None => Ok(name.to_owned()),
    }
}

fn default_attr(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let Some(attr) = attrs.iter().find(|attr| attr.path().is_ident("default")) else {
        return Ok(None);
    };
    let lit: Lit = attr.parse_args()?;
    let rendered = match &lit {
        Lit::Str(s) => format!("'{}'", s.value().replace('\\', "\\\\").replace('\'', "\\'")),
        Lit::Int(i) => i.base10_digits().to_owned(),
        Lit::Float(f) => f.base10_digits().to_owned(),
        Lit::Bool(b) => b.value.to_string(),
        other => {
            return Err(syn::Error::new_spanned(
                other,
                "defaults must be string, integer, float, or bool literals",
            ));
        }
    };
    Ok(Some(rendered))
}

/// Implementation of the `#[handler]` macro.
pub fn handler_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as HandlerArgs);
    let mut input = parse_macro_input!(item as ItemFn);

    let fn_name = input.sig.ident.clone();
    let fn_vis = &input.vis;
    let fn_block = &input.block;
    let asyncness = &input.sig.asyncness;
    let output = &input.sig.output;

    if !input.sig.generics.params.is_empty() {
        return syn::Error::new_spanned(&input.sig.generics, "Handler function cannot be generic")
            .to_compile_error()
            .into();
    }

    let struct_name = if let Some(ref custom_name) = args.name {
        Ident::new(custom_name, fn_name.span())
    } else {
        fn_name.clone()
    };

    let mut entries = Vec::new();
    let mut params = Vec::new();
    let mut extractions = Vec::new();
    let mut bindings = Vec::new();

    for (i, arg) in input.sig.inputs.iter_mut().enumerate() {
        let pat_type = match arg {
            FnArg::Typed(pat_type) => pat_type,
            FnArg::Receiver(receiver) => {
                return syn::Error::new_spanned(receiver, "Handler cannot have self parameter")
                    .to_compile_error()
                    .into();
            }
        };

        match describe_param(pat_type) {
            Ok(entry) => entries.push(entry),
            Err(err) => return err.to_compile_error().into(),
        }
        pat_type.attrs.retain(|attr| !attr.path().is_ident("default"));

        let pat = &pat_type.pat;
        let ty = &pat_type.ty;
        let binding = format_ident!("__arg_{}", i);

        params.push(quote! { #pat: #ty });
        extractions.push(quote! {
            let #binding: #ty = match __args.extract::<#ty>(#i) {
                ::core::result::Result::Ok(v) => v,
                ::core::result::Result::Err(e) => {
                    return ::core::result::Result::Err(
                        ::std::boxed::Box::new(e) as ::switchyard::BoxError
                    );
                }
            };
        });
        bindings.push(binding);
    }

    let descriptor = entries.join(", ");
    let args_binding = if bindings.is_empty() {
        quote! { _args }
    } else {
        quote! { mut __args }
    };
    let invoke = if asyncness.is_some() {
        quote! { Self::__call(#(#bindings),*).await }
    } else {
        quote! { Self::__call(#(#bindings),*) }
    };

    let expanded = quote! {
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Default)]
        #[doc = concat!("Auto-generated Handler from `#[switchyard::handler]` on `", stringify!(#fn_name), "`")]
        #fn_vis struct #struct_name;

        impl #struct_name {
            #asyncness fn __call(#(#params),*) #output #fn_block
        }

        impl ::switchyard::Handler for #struct_name {
            fn descriptor(&self) -> &str {
                #descriptor
            }

            async fn call(
                &self,
                #args_binding: ::switchyard::Args,
            ) -> ::core::result::Result<(), ::switchyard::BoxError> {
                #(#extractions)*
                ::switchyard::IntoHandlerResult::into_handler_result(#invoke)
            }
        }
    };

    TokenStream::from(expanded)
}
