//! `#[listener]` on an inherent `impl` block.
//!
//! Methods marked `#[handler]` (optionally `#[handler(priority = N)]`) become
//! handler declarations, in source order. A method must take `&self`, then
//! the event as `&mut T`, then any number of extra parameters typed
//! `Option<P>`, which are resolved per dispatch.
//!
//! A marked method with no event parameter still produces a declaration; the
//! dispatcher reports it as malformed when the listener is registered.

use crate::event::{grouped, with_static_bound};
use crate::handler::{HandlerArgs, event_type};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, FnArg, GenericArgument, ImplItem, ImplItemFn, ItemImpl, PathArguments, Type,
    parse_macro_input,
};

/// The `P` of an `Option<P>` parameter.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

/// Whether `attr` is `#[handler]` under any path, such as `#[tidings::handler]`.
fn is_handler_attr(attr: &Attribute) -> bool {
    attr.path()
        .segments
        .last()
        .is_some_and(|segment| segment.ident == "handler")
}

/// Removes `#[handler]` from `method`, returning its parsed arguments if it was present.
fn take_handler_attr(method: &mut ImplItemFn) -> syn::Result<Option<HandlerArgs>> {
    let Some(position) = method.attrs.iter().position(is_handler_attr) else {
        return Ok(None);
    };
    let attr = method.attrs.remove(position);
    let args = match &attr.meta {
        syn::Meta::Path(_) => HandlerArgs::default(),
        _ => attr.parse_args::<HandlerArgs>()?,
    };
    Ok(Some(args))
}

fn declaration(method: &ImplItemFn, args: HandlerArgs) -> syn::Result<TokenStream2> {
    let ident = &method.sig.ident;
    let name = args
        .name
        .map(|name| name.value())
        .unwrap_or_else(|| ident.to_string());
    let priority = match &args.priority {
        Some(expr) => quote! { #expr },
        None => quote! { 0 },
    };

    let mut inputs = method.sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                &method.sig,
                "listener handler methods must take `&self`",
            ));
        }
    }

    let Some(event) = inputs.next() else {
        return Ok(quote! {
            handlers.handler(#name).priority(#priority);
        });
    };
    let event_ty = match event {
        FnArg::Typed(pat_type) => event_type(&pat_type.ty).ok_or_else(|| {
            syn::Error::new_spanned(&pat_type.ty, "the event parameter must be `&mut Event`")
        })?,
        FnArg::Receiver(receiver) => {
            return Err(syn::Error::new_spanned(receiver, "unexpected receiver"));
        }
    };
    let event_ty = with_static_bound(event_ty);

    let mut extras = Vec::new();
    for input in inputs {
        let FnArg::Typed(pat_type) = input else {
            return Err(syn::Error::new_spanned(input, "unexpected receiver"));
        };
        let inner = option_inner(&pat_type.ty).ok_or_else(|| {
            syn::Error::new_spanned(&pat_type.ty, "extra parameters must be `Option<T>`")
        })?;
        extras.push(inner.clone());
    }
    let takes = extras.iter().enumerate().map(|(index, ty)| {
        quote! { __extras.take::<#ty>(#index) }
    });
    let event_ref = grouped(&event_ty);

    Ok(quote! {
        handlers
            .handler(#name)
            .priority(#priority)
            .event::<#event_ty>()
            #(.extra::<#extras>())*
            .invoke(|__listener: &Self, __event: &mut #event_ref, __extras: &mut ::tidings::Extras| {
                __listener.#ident(__event, #(#takes),*)
            });
    })
}

fn expand(mut item: ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "`#[listener]` goes on an inherent impl block",
        ));
    }

    let mut declarations = Vec::new();
    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        if let Some(args) = take_handler_attr(method)? {
            declarations.push(declaration(method, args)?);
        }
    }

    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    Ok(quote! {
        #item

        impl #impl_generics ::tidings::Listener for #self_ty #where_clause {
            fn describe(handlers: &mut ::tidings::HandlerSet<Self>) {
                #(#declarations)*
            }
        }
    })
}

/// Implementation of the `#[listener]` attribute.
pub fn listener_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "`#[listener]` takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    let item = parse_macro_input!(item as ItemImpl);
    match expand(item) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => err.to_compile_error().into(),
    }
}
