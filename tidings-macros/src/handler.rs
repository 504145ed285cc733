//! Handler-related macros.
//!
//! This module contains:
//! - `#[handler]` on a free function - generates a unit struct implementing `Handler`
//! - the argument parser shared with `#[listener]`, which reads `#[handler]` on methods

use crate::event::{grouped, with_static_bound};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Expr, FnArg, Ident, ItemFn, LitStr, Token, Type, parse::Parse, parse_macro_input};

/// Arguments for the `#[handler]` attribute.
#[derive(Default)]
pub(crate) struct HandlerArgs {
    pub name: Option<LitStr>,
    pub priority: Option<Expr>,
}

impl Parse for HandlerArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut name = None;
        let mut priority = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "name" => {
                    name = Some(input.parse::<LitStr>()?);
                }
                "priority" => {
                    // An expression, so that `-1` and constants work.
                    let expr: Expr = input.parse()?;
                    priority = Some(expr);
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

        Ok(HandlerArgs { name, priority })
    }
}

/// The `T` of a `&mut T` parameter.
pub(crate) fn event_type(ty: &Type) -> Option<&Type> {
    match ty {
        Type::Reference(reference) if reference.mutability.is_some() => Some(&reference.elem),
        _ => None,
    }
}

fn expand(args: HandlerArgs, input: ItemFn) -> syn::Result<TokenStream2> {
    let fn_name = &input.sig.ident;
    let fn_vis = &input.vis;
    let fn_block = &input.block;
    let output = &input.sig.output;

    if let Some(asyncness) = &input.sig.asyncness {
        return Err(syn::Error::new_spanned(asyncness, "Handler functions cannot be async"));
    }

    let inputs = &input.sig.inputs;
    let (event_pat, event_ty) = match inputs.first() {
        Some(FnArg::Typed(pat_type)) if inputs.len() == 1 => match event_type(&pat_type.ty) {
            Some(ty) => (&pat_type.pat, ty),
            None => {
                return Err(syn::Error::new_spanned(
                    &pat_type.ty,
                    "Handler event argument must be a mutable reference (&mut Event)",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                inputs,
                "Handler function must take exactly one argument: fn(event: &mut Event)",
            ));
        }
    };

    let struct_name = match &args.name {
        Some(custom_name) => syn::parse_str::<Ident>(&custom_name.value()).map_err(|_| {
            syn::Error::new_spanned(custom_name, "`name` must be a valid type name")
        })?,
        None => fn_name.clone(),
    };
    let event_ty = with_static_bound(event_ty);
    let event_ref = grouped(&event_ty);
    let priority = match &args.priority {
        Some(expr) => quote! { #expr },
        None => quote! { 0 },
    };

    Ok(quote! {
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Default)]
        #[doc = concat!("Auto-generated Handler from `#[tidings::handler]` on `", stringify!(#fn_name), "`")]
        #fn_vis struct #struct_name;

        impl #struct_name {
            /// The priority of this handler. Lower values run first.
            pub const PRIORITY: i32 = #priority;
        }

        impl ::tidings::Handler<#event_ty> for #struct_name {
            fn handle(
                &self,
                __event: &mut #event_ref,
            ) -> ::core::result::Result<(), ::tidings::BoxError> {
                fn __handle(#event_pat: &mut #event_ref) #output #fn_block
                ::tidings::IntoHandlerResult::into_handler_result(__handle(__event))
            }

            fn priority(&self) -> i32 {
                Self::PRIORITY
            }

            fn name(&self) -> ::std::borrow::Cow<'static, str> {
                ::std::borrow::Cow::Borrowed(stringify!(#fn_name))
            }
        }
    })
}

/// Implementation of the `#[handler]` attribute on free functions.
pub fn handler_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as HandlerArgs);
    let input = parse_macro_input!(item as ItemFn);
    match expand(args, input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => err.to_compile_error().into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn args(tokens: TokenStream2) -> HandlerArgs {
        syn::parse2(tokens).unwrap()
    }

    #[test]
    fn custom_name_becomes_the_struct() {
        let input: ItemFn = parse_quote! {
            fn reject(event: &mut Data) {}
        };
        let expanded = expand(args(quote! { name = "Reject", priority = -1 }), input).unwrap();
        assert!(expanded.to_string().contains("struct Reject"));
    }

    #[test]
    fn invalid_name_is_an_error_not_a_panic() {
        let input: ItemFn = parse_quote! {
            fn reject(event: &mut Data) {}
        };
        let err = expand(args(quote! { name = "not a name" }), input).err().unwrap();
        assert!(err.to_string().contains("valid type name"));
    }

    #[test]
    fn event_must_be_a_mutable_reference() {
        let input: ItemFn = parse_quote! {
            fn reject(event: &Data) {}
        };
        assert!(expand(HandlerArgs::default(), input).is_err());
    }
}
