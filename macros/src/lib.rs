//! Derive macros for the vending machine workspace
//!
//! Action enums mix operator and customer requests with machine-internal
//! events, and reducers care which side a variant came from. Deriving
//! `Action` keeps that classification next to the enum itself instead of
//! in a hand-maintained method.
//!
//! # Example
//!
//! ```ignore
//! use vending_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum VendingAction {
//!     #[command]
//!     InsertCoin { coin: Coin },
//!
//!     #[event]
//!     DisplayTimerElapsed,
//! }
//!
//! let insert = VendingAction::InsertCoin { coin: Coin::Quarter };
//! assert!(insert.is_command());
//! assert_eq!(insert.label(), "InsertCoin");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Variant};

/// Classify the variants of an action enum
///
/// Mark each variant `#[command]` (a request from outside: customer or
/// operator) or `#[event]` (a fact the system produced itself, such as an
/// expired timer fed back by an effect). Unmarked variants are allowed and
/// answer false to both predicates.
///
/// Three methods are generated on the enum:
/// - `is_command()` for variants marked `#[command]`
/// - `is_event()` for variants marked `#[event]`
/// - `label()` returning the variant name, for log fields
///
/// Deriving on anything but an enum, or marking one variant with both
/// attributes, is rejected at compile time.
#[proc_macro_derive(Action, attributes(command, event))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_action(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_action(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "#[derive(Action)] requires an enum",
        ));
    };

    let mut command_arms = Vec::new();
    let mut event_arms = Vec::new();
    let mut label_arms = Vec::new();

    for variant in &data.variants {
        let pattern = variant_pattern(variant);
        let text = variant.ident.to_string();
        label_arms.push(quote! { #pattern => #text, });

        match variant_role(variant)? {
            Some(Role::Command) => command_arms.push(quote! { #pattern => true, }),
            Some(Role::Event) => event_arms.push(quote! { #pattern => true, }),
            None => {},
        }
    }

    let name = &input.ident;
    Ok(quote! {
        impl #name {
            /// Whether this variant was marked `#[command]`.
            #[must_use]
            pub const fn is_command(&self) -> bool {
                match self {
                    #(#command_arms)*
                    _ => false,
                }
            }

            /// Whether this variant was marked `#[event]`.
            #[must_use]
            pub const fn is_event(&self) -> bool {
                match self {
                    #(#event_arms)*
                    _ => false,
                }
            }

            /// The variant name, suitable as a log field.
            #[must_use]
            pub const fn label(&self) -> &'static str {
                match self {
                    #(#label_arms)*
                }
            }
        }
    })
}

enum Role {
    Command,
    Event,
}

fn variant_role(variant: &Variant) -> syn::Result<Option<Role>> {
    let command = marked(variant, "command");
    let event = marked(variant, "event");
    match (command, event) {
        (true, true) => Err(syn::Error::new_spanned(
            variant,
            "a variant is either #[command] or #[event], not both",
        )),
        (true, false) => Ok(Some(Role::Command)),
        (false, true) => Ok(Some(Role::Event)),
        (false, false) => Ok(None),
    }
}

fn marked(variant: &Variant, attribute: &str) -> bool {
    variant
        .attrs
        .iter()
        .any(|attr| attr.path().is_ident(attribute))
}

/// Pattern that matches the variant regardless of its payload shape.
fn variant_pattern(variant: &Variant) -> TokenStream2 {
    let ident = &variant.ident;
    match &variant.fields {
        Fields::Named(_) => quote! { Self::#ident { .. } },
        Fields::Unnamed(_) => quote! { Self::#ident(..) },
        Fields::Unit => quote! { Self::#ident },
    }
}
