// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Attribute macro wrapping tests in a [`xa_test_utils::TestLoggerGuard`].
//!
//! Every wrapped test gets its own log file under `target/test-logs`, and a
//! `logger` binding in scope for writing diagnostics into it.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{ItemFn, ReturnType, Type, parse_macro_input, spanned::Spanned};

/// Attribute macro for synchronous tests.
///
/// ```rust,ignore
/// use xa_test_utils::logged_test;
///
/// #[logged_test]
/// fn decodes_minimal_header() {
///     logger.log("decoding").unwrap();
/// }
/// ```
#[proc_macro_attribute]
pub fn logged_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            Span::call_site(),
            "#[logged_test] does not accept arguments",
        )
        .to_compile_error()
        .into();
    }

    let input = parse_macro_input!(item as ItemFn);

    if let Some(async_token) = &input.sig.asyncness {
        return syn::Error::new(
            async_token.span(),
            "#[logged_test] cannot be applied to async functions",
        )
        .to_compile_error()
        .into();
    }

    expand(input).into()
}

fn expand(mut input: ItemFn) -> TokenStream2 {
    input.attrs.retain(|attr| !is_logged_attr(attr));

    let fn_ident = &input.sig.ident;
    let fn_name = fn_ident.to_string();
    let visibility = &input.vis;
    let generics = &input.sig.generics;

    if !input.sig.inputs.is_empty() {
        return syn::Error::new(
            fn_ident.span(),
            "#[logged_test] can only be applied to functions without parameters",
        )
        .to_compile_error();
    }

    let (returns_result, return_tokens) = classify_return(&input.sig.output);
    let finish = finish_body(returns_result);
    let block = &input.block;
    let other_attrs = &input.attrs;

    quote! {
        #[::core::prelude::v1::test]
        #(#other_attrs)*
        #visibility fn #fn_ident #generics () #return_tokens {
            let mut __guard = ::xa_test_utils::TestLoggerGuard::new(#fn_name)
                .expect("failed to create TestLogger");
            let logger = __guard.logger();
            let _ = &*logger;

            let inner_result = { #block };
            #finish
        }
    }
}

fn classify_return(output: &ReturnType) -> (bool, TokenStream2) {
    match output {
        ReturnType::Default => (false, quote! {}),
        ReturnType::Type(arrow, ty) => (is_result_type(ty), quote! { #arrow #ty }),
    }
}

fn is_result_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Result";
        }
    }
    false
}

fn finish_body(returns_result: bool) -> TokenStream2 {
    if returns_result {
        quote! {
            match inner_result {
                ::std::result::Result::Ok(value) => {
                    if let Err(e) = __guard.finish_success() {
                        panic!("failed to finalize TestLogger: {}", e);
                    }
                    ::std::result::Result::Ok(value)
                }
                ::std::result::Result::Err(err) => {
                    let __err_msg = format!("{}", err);
                    if let Err(e) = __guard.finish_failure(&__err_msg) {
                        eprintln!("failed to finalize TestLogger after error: {}", e);
                    }
                    ::std::result::Result::Err(err)
                }
            }
        }
    } else {
        quote! {
            if let Err(e) = __guard.finish_success() {
                panic!("failed to finalize TestLogger: {}", e);
            }
            inner_result
        }
    }
}

fn is_logged_attr(attr: &syn::Attribute) -> bool {
    attr.path().get_ident().is_some_and(|ident| ident == "logged_test")
}
