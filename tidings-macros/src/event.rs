//! `#[derive(Event)]`.
//!
//! Container attributes:
//! - `#[event(cancellable)]` implements `Cancellable` over a `cancelled: bool`
//!   field (or the field marked `#[event(cancelled)]`) and declares
//!   `dyn Cancellable` as an ancestor
//! - `#[event(extends(dyn Audited, dyn Named))]` declares trait-object ancestors;
//!   the event type must implement those traits
//!
//! Field attributes:
//! - `#[event(parent)]` declares the field's type as an ancestor, reached
//!   through the field
//! - `#[event(cancelled)]` names the cancellation flag

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, Lifetime, Member, Token, Type, TypeParamBound,
    parenthesized, parse_macro_input, punctuated::Punctuated, spanned::Spanned,
};

#[derive(Default)]
struct ContainerArgs {
    cancellable: bool,
    extends: Vec<Type>,
}

struct FieldRoles {
    parents: Vec<(Member, Type)>,
    cancelled: Option<Member>,
}

/// Gives a bare trait object type an explicit `'static` bound.
pub(crate) fn with_static_bound(ty: &Type) -> Type {
    let mut ty = ty.clone();
    if let Type::TraitObject(object) = &mut ty {
        let bounded = object
            .bounds
            .iter()
            .any(|bound| matches!(bound, TypeParamBound::Lifetime(_)));
        if !bounded {
            object.bounds.push(TypeParamBound::Lifetime(Lifetime::new(
                "'static",
                object.span(),
            )));
        }
    }
    ty
}

/// Tokens for `ty` that are safe to place after `&mut`.
pub(crate) fn grouped(ty: &Type) -> TokenStream2 {
    match ty {
        Type::TraitObject(_) => quote! { (#ty) },
        _ => quote! { #ty },
    }
}

fn parse_container(input: &DeriveInput) -> syn::Result<ContainerArgs> {
    let mut args = ContainerArgs::default();
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("event")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("cancellable") {
                args.cancellable = true;
                Ok(())
            } else if meta.path.is_ident("extends") {
                let content;
                parenthesized!(content in meta.input);
                let types = Punctuated::<Type, Token![,]>::parse_terminated(&content)?;
                args.extends.extend(types);
                Ok(())
            } else {
                Err(meta.error("unknown event attribute, expected `cancellable` or `extends(..)`"))
            }
        })?;
    }
    Ok(args)
}

fn parse_fields(input: &DeriveInput) -> syn::Result<FieldRoles> {
    let mut roles = FieldRoles {
        parents: Vec::new(),
        cancelled: None,
    };
    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => return Ok(roles),
    };

    for (index, field) in fields.iter().enumerate() {
        let member = match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(index.into()),
        };
        if field.ident.as_ref().is_some_and(|ident| ident == "cancelled") && roles.cancelled.is_none() {
            roles.cancelled = Some(member.clone());
        }
        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("event")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("parent") {
                    roles.parents.push((member.clone(), field.ty.clone()));
                    Ok(())
                } else if meta.path.is_ident("cancelled") {
                    roles.cancelled = Some(member.clone());
                    Ok(())
                } else {
                    Err(meta.error("unknown event field attribute, expected `parent` or `cancelled`"))
                }
            })?;
        }
    }
    Ok(roles)
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let args = parse_container(input)?;
    let roles = parse_fields(input)?;

    let mut ancestors = Vec::new();
    let mut impls = Vec::new();

    if args.cancellable {
        let Some(flag) = &roles.cancelled else {
            return Err(syn::Error::new_spanned(
                name,
                "`#[event(cancellable)]` needs a `cancelled: bool` field or a field marked `#[event(cancelled)]`",
            ));
        };
        ancestors.push(quote! { ancestors.extends::<dyn ::tidings::Cancellable>(); });
        impls.push(quote! {
            impl #impl_generics ::tidings::Cancellable for #name #ty_generics #where_clause {
                fn is_cancelled(&self) -> bool {
                    self.#flag
                }

                fn set_cancelled(&mut self, cancelled: bool) {
                    self.#flag = cancelled;
                }
            }

            impl #impl_generics ::tidings::Extends<dyn ::tidings::Cancellable> for #name #ty_generics #where_clause {
                fn upcast(&mut self) -> &mut (dyn ::tidings::Cancellable + 'static) {
                    self
                }
            }
        });
    }

    for ty in &args.extends {
        let ty = with_static_bound(ty);
        let target = grouped(&ty);
        ancestors.push(quote! { ancestors.extends::<#ty>(); });
        impls.push(quote! {
            impl #impl_generics ::tidings::Extends<#ty> for #name #ty_generics #where_clause {
                fn upcast(&mut self) -> &mut #target {
                    self
                }
            }
        });
    }

    for (member, ty) in &roles.parents {
        ancestors.push(quote! { ancestors.extends::<#ty>(); });
        impls.push(quote! {
            impl #impl_generics ::tidings::Extends<#ty> for #name #ty_generics #where_clause {
                fn upcast(&mut self) -> &mut #ty {
                    &mut self.#member
                }
            }
        });
    }

    let ancestors_fn = (!ancestors.is_empty()).then(|| {
        quote! {
            fn ancestors(ancestors: &mut ::tidings::Ancestors<Self>) {
                #(#ancestors)*
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::tidings::Event for #name #ty_generics #where_clause {
            #ancestors_fn
        }

        #(#impls)*
    })
}

/// Implementation of `#[derive(Event)]`.
pub fn derive_event_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => err.to_compile_error().into(),
    }
}
