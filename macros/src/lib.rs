//! # Macros
//!
//! Procedural derive macros shared across the Confluence workspace.
//!
//! ## Exchange serde
//!
//! A venue marker type carries its identity in a `const ID: &'static
//! str`, not a struct field. `DeExchange`/`SerExchange` turn that into
//! a `Deserialize`/`Serialize` pair that round-trips through the id
//! string and rejects any other value, instead of hand-writing the
//! same match arm per venue:
//!
//! ```rust,ignore
//! use confluence_macros::{DeExchange, SerExchange};
//!
//! #[derive(DeExchange, SerExchange)]
//! struct B3Exchange;
//!
//! impl B3Exchange {
//!     const ID: &'static str = "B3";
//! }
//! ```
//!
//! ## Newtype ids
//!
//! `NewtypeId` derives `Display` and `From<String>` for a single-field
//! tuple struct wrapping a string-like inner type, so a new id type
//! doesn't need the same two impls copied in by hand.

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

/// Generates a `Deserialize` impl that accepts only the string equal
/// to the type's `ID` constant, failing with a descriptive error
/// otherwise.
///
/// Requires the type to define `const ID: &'static str`.
#[proc_macro_derive(DeExchange)]
pub fn de_exchange_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = syn::parse(input).expect("DeExchange: failed to parse derive input");
    let exchange = &ast.ident;

    let generated = quote! {
        impl<'de> serde::Deserialize<'de> for #exchange {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::de::Deserializer<'de>,
            {
                let input = <String as serde::Deserialize>::deserialize(deserializer)?;
                if input == Self::ID {
                    Ok(Self)
                } else {
                    Err(serde::de::Error::invalid_value(
                        serde::de::Unexpected::Str(&input),
                        &Self::ID,
                    ))
                }
            }
        }
    };

    TokenStream::from(generated)
}

/// Generates a `Serialize` impl that writes out the type's `ID`
/// constant.
///
/// Requires the type to define `const ID: &'static str`.
#[proc_macro_derive(SerExchange)]
pub fn ser_exchange_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = syn::parse(input).expect("SerExchange: failed to parse derive input");
    let exchange = &ast.ident;

    let generated = quote! {
        impl serde::Serialize for #exchange {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::ser::Serializer,
            {
                serializer.serialize_str(Self::ID)
            }
        }
    };

    TokenStream::from(generated)
}

/// Generates `Display` and `From<String>` for a single-field tuple
/// struct wrapping a string-like inner type, e.g. `struct
/// RequestId(String);`.
#[proc_macro_derive(NewtypeId)]
pub fn newtype_id_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = syn::parse(input).expect("NewtypeId: failed to parse derive input");
    let ident = &ast.ident;

    let Data::Struct(data) = &ast.data else {
        panic!("NewtypeId can only be derived for a single-field tuple struct");
    };
    let Fields::Unnamed(fields) = &data.fields else {
        panic!("NewtypeId requires a tuple struct, e.g. `struct Foo(String);`");
    };
    if fields.unnamed.len() != 1 {
        panic!("NewtypeId requires exactly one field");
    }

    let generated = quote! {
        impl std::fmt::Display for #ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<String> for #ident {
            fn from(value: String) -> Self {
                Self(value.into())
            }
        }
    };

    TokenStream::from(generated)
}
