//! Derives generating the per-type glue of `bindery-core`.
//!
//! ```ignore
//! #[derive(Message, Default, Clone)]
//! #[message(name = "demo/msg/Ping")]
//! struct Ping { seq: u32 }
//!
//! #[derive(Service)]
//! #[service(name = "demo/srv/Ping", request = Ping, response = Ping, event)]
//! struct PingService;
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, LitStr, Path, Type, parse_macro_input, parse_quote};

/// Implements `bindery_core::Message`.
///
/// `#[message(name = "...")]` sets `TYPE_NAME` (default: the type's ident).
/// `#[message(crate = "...")]` overrides the path to `bindery_core`.
#[proc_macro_derive(Message, attributes(message))]
pub fn derive_message(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_message(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implements `bindery_core::ServiceType` and emits the service's static
/// descriptor with its request, response and event operation bundles.
///
/// Keys of `#[service(...)]`:
/// * `name = "pkg/srv/Type"` (required)
/// * `request = Type`, `response = Type` (required)
/// * `event`: the service supports event messages; without it the event
///   bundle is `UnsupportedEventOps`
/// * `crate = "path"`: path to `bindery_core`
#[proc_macro_derive(Service, attributes(service))]
pub fn derive_service(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_service(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn default_crate_path() -> Path {
    parse_quote!(::bindery_core)
}

fn expand_message(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let mut name: Option<LitStr> = None;
    let mut krate = default_crate_path();

    for attr in &input.attrs {
        if !attr.path().is_ident("message") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("crate") {
                let path: LitStr = meta.value()?.parse()?;
                krate = path.parse()?;
                Ok(())
            } else {
                Err(meta.error("unsupported message attribute"))
            }
        })?;
    }

    let ident = &input.ident;
    let name = name.unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #krate::Message for #ident #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #name;
        }
    })
}

struct ServiceArgs {
    name: LitStr,
    request: Type,
    response: Type,
    event: bool,
    krate: Path,
}

fn parse_service_args(input: &DeriveInput) -> syn::Result<ServiceArgs> {
    let mut name: Option<LitStr> = None;
    let mut request: Option<Type> = None;
    let mut response: Option<Type> = None;
    let mut event = false;
    let mut krate = default_crate_path();

    for attr in &input.attrs {
        if !attr.path().is_ident("service") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("request") {
                request = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("response") {
                response = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("event") {
                event = true;
            } else if meta.path.is_ident("crate") {
                let path: LitStr = meta.value()?.parse()?;
                krate = path.parse()?;
            } else {
                return Err(meta.error("unsupported service attribute"));
            }
            Ok(())
        })?;
    }

    let missing = |key: &str| {
        syn::Error::new_spanned(
            &input.ident,
            format!("missing `#[service({key} = ...)]`"),
        )
    };

    Ok(ServiceArgs {
        name: name.ok_or_else(|| missing("name"))?,
        request: request.ok_or_else(|| missing("request"))?,
        response: response.ok_or_else(|| missing("response"))?,
        event,
        krate,
    })
}

fn expand_service(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "service types cannot be generic: each one owns a static descriptor",
        ));
    }

    let ServiceArgs {
        name,
        request,
        response,
        event,
        krate,
    } = parse_service_args(input)?;
    let ident = &input.ident;

    let (event_ty, event_init) = if event {
        (
            quote!(#krate::TypedEventOps<#ident>),
            quote!(#krate::TypedEventOps::new()),
        )
    } else {
        (
            quote!(#krate::UnsupportedEventOps),
            quote!(#krate::UnsupportedEventOps),
        )
    };

    Ok(quote! {
        impl #krate::ServiceType for #ident {
            type Request = #request;
            type Response = #response;

            const NAME: &'static str = #name;

            fn type_support() -> &'static #krate::ServiceTypeSupport {
                static REQUEST: #krate::TypedMessageOps<#request> =
                    #krate::TypedMessageOps::request();
                static RESPONSE: #krate::TypedMessageOps<#response> =
                    #krate::TypedMessageOps::response();
                static EVENT: #event_ty = #event_init;
                static TYPE_SUPPORT: #krate::ServiceTypeSupport =
                    #krate::ServiceTypeSupport::new::<#ident>(&REQUEST, &RESPONSE, &EVENT);
                &TYPE_SUPPORT
            }
        }
    })
}
